//! Non-blocking I2C transport
//!
//! The sequencer starts a transfer and then polls for its outcome, the way
//! interrupt driven I2C masters work. Outgoing bytes are copied by the
//! transport when the transfer starts.

use embedded_hal::blocking::i2c::{Read, Write, WriteRead};

use crate::constants::*;


/// How a transfer ends
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Start, transfer, stop
    Complete,
    /// Start, transfer, no stop; a repeated start follows
    NoStop,
    /// Repeated start, transfer, stop
    RepeatStart,
}

/// Finished transfer kind
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    Write,
    Read,
}


/// Interrupt driven (or otherwise asynchronous) I2C master
pub trait Transport {
    type Error;

    /// Start writing `bytes` to `address`
    fn start_write(&mut self, address: u8, bytes: &[u8], mode: Mode) -> Result<(), Self::Error>;

    /// Start reading `len` bytes from `address`
    fn start_read(&mut self, address: u8, len: usize, mode: Mode) -> Result<(), Self::Error>;

    /// Outcome of the transfer in flight, `WouldBlock` until it finishes
    fn status(&mut self) -> nb::Result<Completion, Self::Error>;

    /// Copy out the bytes of the last completed read, returns the count
    fn read_data(&mut self, buf: &mut [u8]) -> usize;
}


/// [`Transport`] on top of a blocking `embedded-hal` I2C bus.
///
/// Every transfer runs to completion inside `start_*` and its outcome is
/// reported by the next `status`. A `NoStop` write is held back and sent
/// together with the following `RepeatStart` read as one `write_read`.
pub struct BlockingI2c<I2C, E> {
    i2c: I2C,
    pointer: [u8; 8],
    pointer_len: usize,
    rx: [u8; REGISTER_BYTES],
    rx_len: usize,
    outcome: Option<Result<Completion, E>>,
}

impl<I2C, E> BlockingI2c<I2C, E>
where I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        BlockingI2c {
            i2c,
            pointer: [0; 8],
            pointer_len: 0,
            rx: [0; REGISTER_BYTES],
            rx_len: 0,
            outcome: None,
        }
    }

    /// Give the bus back
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> Transport for BlockingI2c<I2C, E>
where I2C: Write<Error = E> + Read<Error = E> + WriteRead<Error = E>,
{
    type Error = E;

    fn start_write(&mut self, address: u8, bytes: &[u8], mode: Mode) -> Result<(), E> {
        if mode == Mode::NoStop && bytes.len() <= self.pointer.len() {
            self.pointer[..bytes.len()].copy_from_slice(bytes);
            self.pointer_len = bytes.len();
            self.outcome = Some(Ok(Completion::Write));
            return Ok(());
        }

        self.pointer_len = 0;
        self.outcome = Some(self.i2c.write(address, bytes).map(|_| Completion::Write));
        Ok(())
    }

    fn start_read(&mut self, address: u8, len: usize, mode: Mode) -> Result<(), E> {
        let len = len.min(self.rx.len());
        let res = if mode == Mode::RepeatStart && self.pointer_len > 0 {
            self.i2c.write_read(address, &self.pointer[..self.pointer_len], &mut self.rx[..len])
        } else {
            self.i2c.read(address, &mut self.rx[..len])
        };
        // keep the pointer after a failure, the retried read sends it again
        if res.is_ok() {
            self.pointer_len = 0;
        }
        self.rx_len = if res.is_ok() { len } else { 0 };
        self.outcome = Some(res.map(|_| Completion::Read));
        Ok(())
    }

    fn status(&mut self) -> nb::Result<Completion, E> {
        match self.outcome.take() {
            Some(Ok(c)) => Ok(c),
            Some(Err(e)) => Err(nb::Error::Other(e)),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn read_data(&mut self, buf: &mut [u8]) -> usize {
        let n = self.rx_len.min(buf.len());
        buf[..n].copy_from_slice(&self.rx[..n]);
        n
    }
}


/// Scripted transport for unit tests
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use super::*;

    #[derive(Debug,Copy,Clone,PartialEq,Eq)]
    pub struct BusFault;

    /// Answer to one `status` poll
    #[derive(Debug,Copy,Clone,PartialEq,Eq)]
    pub enum Step {
        /// Transfer still running
        Busy,
        /// Transfer failed
        Fail,
        /// Transfer finished
        Done,
        /// The other kind of transfer finished
        Mismatch,
    }

    /// Records transfers; `status` replays `script`, then completes
    /// every transfer on its first poll.
    #[derive(Default)]
    pub struct ScriptedBus {
        pub writes: Vec<(u8, Vec<u8>, Mode)>,
        pub reads: Vec<(u8, usize, Mode)>,
        pub script: VecDeque<Step>,
        pub rx: [u8; 6],
        pub refuse_starts: usize,
        /// Reads left that return fewer bytes than asked for
        pub short_reads: usize,
        pub polls: usize,
        pending: Option<Completion>,
    }

    impl ScriptedBus {
        pub fn new(rx: [u8; 6]) -> Self {
            ScriptedBus { rx, ..Default::default() }
        }

        pub fn with_script(rx: [u8; 6], script: &[Step]) -> Self {
            ScriptedBus { rx, script: script.iter().copied().collect(), ..Default::default() }
        }

        /// Bytes of every write to `register`, in order
        pub fn writes_to(&self, register: u8) -> Vec<Vec<u8>> {
            self.writes.iter()
                .filter(|(_, b, _)| b.first() == Some(&register))
                .map(|(_, b, _)| b.clone())
                .collect()
        }
    }

    impl Transport for ScriptedBus {
        type Error = BusFault;

        fn start_write(&mut self, address: u8, bytes: &[u8], mode: Mode) -> Result<(), BusFault> {
            if self.refuse_starts > 0 {
                self.refuse_starts -= 1;
                return Err(BusFault);
            }
            self.writes.push((address, bytes.to_vec(), mode));
            self.pending = Some(Completion::Write);
            Ok(())
        }

        fn start_read(&mut self, address: u8, len: usize, mode: Mode) -> Result<(), BusFault> {
            if self.refuse_starts > 0 {
                self.refuse_starts -= 1;
                return Err(BusFault);
            }
            self.reads.push((address, len, mode));
            self.pending = Some(Completion::Read);
            Ok(())
        }

        fn status(&mut self) -> nb::Result<Completion, BusFault> {
            self.polls += 1;
            match self.script.pop_front().unwrap_or(Step::Done) {
                Step::Busy => Err(nb::Error::WouldBlock),
                Step::Fail => {
                    self.pending = None;
                    Err(nb::Error::Other(BusFault))
                }
                Step::Done => self.pending.take().ok_or(nb::Error::WouldBlock),
                Step::Mismatch => match self.pending.take() {
                    Some(Completion::Write) => Ok(Completion::Read),
                    Some(Completion::Read) => Ok(Completion::Write),
                    None => Err(nb::Error::WouldBlock),
                },
            }
        }

        fn read_data(&mut self, buf: &mut [u8]) -> usize {
            let mut n = self.rx.len().min(buf.len());
            if self.short_reads > 0 {
                self.short_reads -= 1;
                n /= 2;
            }
            buf[..n].copy_from_slice(&self.rx[..n]);
            n
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::*, errors::*, sequencer::*};

    const FACTORY: [u8; 6] = [0x60, 0xC7, 0x88, 0, 0, 0];

    /// Blocking bus double modelling the chip register pointer
    struct FakeI2c {
        mem: [u8; 256],
        pointer: usize,
        writes: Vec<Vec<u8>>,
        plain_reads: usize,
        fail: bool,
        /// `write_read` calls left to fail, each one leaves the pointer at 13
        fail_write_reads: usize,
    }

    impl FakeI2c {
        fn read_at_pointer(&mut self, buffer: &mut [u8]) {
            for b in buffer.iter_mut() {
                *b = self.mem[self.pointer];
                self.pointer = (self.pointer + 1) % self.mem.len();
            }
        }
    }

    impl Write for FakeI2c {
        type Error = ();
        fn write(&mut self, _address: u8, bytes: &[u8]) -> Result<(), ()> {
            if self.fail { return Err(()); }
            self.writes.push(bytes.to_vec());
            self.pointer = bytes[0] as usize;
            Ok(())
        }
    }

    impl Read for FakeI2c {
        type Error = ();
        fn read(&mut self, _address: u8, buffer: &mut [u8]) -> Result<(), ()> {
            self.plain_reads += 1;
            self.read_at_pointer(buffer);
            Ok(())
        }
    }

    impl WriteRead for FakeI2c {
        type Error = ();
        fn write_read(&mut self, _address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), ()> {
            if self.fail { return Err(()); }
            if self.fail_write_reads > 0 {
                self.fail_write_reads -= 1;
                self.pointer = 13;
                return Err(());
            }
            self.pointer = bytes[0] as usize;
            self.read_at_pointer(buffer);
            Ok(())
        }
    }

    fn fake() -> FakeI2c {
        let mut mem = [0xAA; 256];
        mem[REG_DIVIDERS as usize..REG_DIVIDERS as usize + 6].copy_from_slice(&FACTORY);
        FakeI2c { mem, pointer: 0, writes: Vec::new(), plain_reads: 0, fail: false, fail_write_reads: 0 }
    }

    fn readback(bus: &mut BlockingI2c<FakeI2c, ()>) -> (Result<(), Error>, Option<[u8; 6]>) {
        let mut seq = Sequencer::new(&Config::new());
        seq.begin_readback().unwrap();
        let res = nb::block!(seq.poll(bus));
        (res, seq.working())
    }

    #[test]
    fn pointer_write_merges_with_read() {
        let mut bus = BlockingI2c::new(fake());
        bus.start_write(I2C_ADDRESS, &[REG_DIVIDERS], Mode::NoStop).unwrap();
        assert_eq!(bus.status(), Ok(Completion::Write));
        bus.start_read(I2C_ADDRESS, 6, Mode::RepeatStart).unwrap();
        assert_eq!(bus.status(), Ok(Completion::Read));
        assert_eq!(bus.status(), Err(nb::Error::WouldBlock));

        let mut buf = [0u8; 6];
        assert_eq!(bus.read_data(&mut buf), 6);
        assert_eq!(buf, FACTORY);
        let i2c = bus.release();
        assert!(i2c.writes.is_empty());
        assert_eq!(i2c.plain_reads, 0);
    }

    #[test]
    fn complete_write_goes_out_at_once() {
        let mut bus = BlockingI2c::new(fake());
        bus.start_write(I2C_ADDRESS, &[REG_CONTROL, CTRL_FREEZE_M], Mode::Complete).unwrap();
        assert_eq!(bus.status(), Ok(Completion::Write));
        assert_eq!(bus.release().writes, vec![vec![REG_CONTROL, CTRL_FREEZE_M]]);
    }

    #[test]
    fn errors_are_reported_by_status() {
        let mut i2c = fake();
        i2c.fail = true;
        let mut bus = BlockingI2c::new(i2c);
        bus.start_write(I2C_ADDRESS, &[REG_CONTROL, CTRL_RECALL], Mode::Complete).unwrap();
        assert_eq!(bus.status(), Err(nb::Error::Other(())));
    }

    #[test]
    fn failed_read_keeps_the_pointer() {
        let mut i2c = fake();
        i2c.fail_write_reads = 1;
        let mut bus = BlockingI2c::new(i2c);
        bus.start_write(I2C_ADDRESS, &[REG_DIVIDERS], Mode::NoStop).unwrap();
        assert_eq!(bus.status(), Ok(Completion::Write));
        bus.start_read(I2C_ADDRESS, 6, Mode::RepeatStart).unwrap();
        assert_eq!(bus.status(), Err(nb::Error::Other(())));

        bus.start_read(I2C_ADDRESS, 6, Mode::RepeatStart).unwrap();
        assert_eq!(bus.status(), Ok(Completion::Read));
        let mut buf = [0u8; 6];
        assert_eq!(bus.read_data(&mut buf), 6);
        assert_eq!(buf, FACTORY);
        assert_eq!(bus.release().plain_reads, 0);
    }

    #[test]
    fn readback_through_blocking_bus() {
        let mut bus = BlockingI2c::new(fake());
        assert_eq!(readback(&mut bus), (Ok(()), Some(FACTORY)));
        let i2c = bus.release();
        assert_eq!(i2c.writes, vec![vec![REG_CONTROL, CTRL_RECALL]]);
        assert_eq!(i2c.plain_reads, 0);
    }

    #[test]
    fn readback_retry_resends_the_pointer() {
        let mut i2c = fake();
        i2c.fail_write_reads = 2;
        let mut bus = BlockingI2c::new(i2c);
        assert_eq!(readback(&mut bus), (Ok(()), Some(FACTORY)));
        assert_eq!(bus.release().plain_reads, 0);
    }

    #[test]
    fn readback_gives_up_on_a_dead_bus() {
        let mut i2c = fake();
        i2c.fail_write_reads = 100;
        let mut bus = BlockingI2c::new(i2c);
        assert_eq!(readback(&mut bus), (Err(Error::RetriesExhausted), Some([0; 6])));
    }
}
