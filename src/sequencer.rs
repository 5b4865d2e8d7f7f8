//! Bus transaction sequencer
//!
//! Drives the multi-step Si570 bus protocols one step per poll:
//!
//! * read-back: RECALL, set register pointer to 7 (no stop),
//!   read 6 bytes (repeated start)
//! * reprogram: freeze M, write registers 7..=12, release M
//!   (with NewFreq if the dividers changed)
//!
//! A poll starts at most one transfer or checks the status once. A failed
//! transfer steps back to the step that started it; every failure uses up
//! one retry from a budget shared by the whole sequence.

use crate::{bus::*, config::*, constants::*, errors::*, register::*};


/// Sequencer state
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Idle,
    // read-back
    WriteCommand,
    AwaitWrite,
    WriteReadRequest,
    AwaitWrite2,
    ReadData,
    AwaitRead,
    // reprogram
    Freeze,
    AwaitFreeze,
    WriteRegisters,
    AwaitWriteRegisters,
    Unfreeze,
    AwaitUnfreeze,
    Done,
}

impl State {
    /// State after a successful step
    fn next(self) -> State {
        match self {
            State::WriteCommand => State::AwaitWrite,
            State::AwaitWrite => State::WriteReadRequest,
            State::WriteReadRequest => State::AwaitWrite2,
            State::AwaitWrite2 => State::ReadData,
            State::ReadData => State::AwaitRead,
            State::AwaitRead => State::Done,
            State::Freeze => State::AwaitFreeze,
            State::AwaitFreeze => State::WriteRegisters,
            State::WriteRegisters => State::AwaitWriteRegisters,
            State::AwaitWriteRegisters => State::Unfreeze,
            State::Unfreeze => State::AwaitUnfreeze,
            State::AwaitUnfreeze => State::Done,
            s => s,
        }
    }

    /// State that started the transfer being awaited
    fn back(self) -> State {
        match self {
            State::AwaitWrite => State::WriteCommand,
            State::AwaitWrite2 => State::WriteReadRequest,
            State::AwaitRead => State::ReadData,
            State::AwaitFreeze => State::Freeze,
            State::AwaitWriteRegisters => State::WriteRegisters,
            State::AwaitUnfreeze => State::Unfreeze,
            s => s,
        }
    }

    /// Idle or finished, a new sequence may begin
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == State::Idle || self == State::Done
    }
}


/// Non-blocking Si570 bus protocol engine.
///
/// Owns the working register buffer: the read-back lands in it and the
/// reprogram sequence sends it.
#[derive(Debug)]
pub struct Sequencer {
    address: u8,
    max_retries: u8,
    timeout_polls: u32,
    state: State,
    retries: u8,
    polls: u32,
    unfreeze: u8,
    working: [u8; REGISTER_BYTES],
}

impl Sequencer {

    pub fn new(config: &Config) -> Self {
        Sequencer {
            address: config.address,
            max_retries: config.max_retries,
            timeout_polls: config.timeout_polls,
            state: State::Idle,
            retries: 0,
            polls: 0,
            unfreeze: CTRL_NEW_FREQ,
            working: [0; REGISTER_BYTES],
        }
    }

    #[inline]
    pub fn state(self: &Self) -> State {
        self.state
    }

    /// A sequence is in flight
    #[inline]
    pub fn is_busy(self: &Self) -> bool {
        !self.state.is_terminal()
    }

    /// Working register buffer, not available while a sequence runs
    pub fn working(self: &Self) -> Option<[u8; REGISTER_BYTES]> {
        if self.is_busy() { None } else { Some(self.working) }
    }

    /// Overwrite the working buffer without touching the device
    pub fn restore(self: &mut Self, regs: [u8; REGISTER_BYTES]) -> Result<(), Error> {
        (if self.is_busy() { Err(Error::Busy) } else { Ok(()) })?;
        self.working = regs;
        Ok(())
    }

    /// Start the factory register read-back.
    /// Result lands in the working buffer.
    pub fn begin_readback(self: &mut Self) -> Result<(), Error> {
        self.begin(State::WriteCommand)
    }

    /// Start writing `regs` with the DSPLL frozen, then release it with
    /// `unfreeze` written to register 135.
    pub fn begin_reprogram(self: &mut Self, regs: &Registers, unfreeze: u8) -> Result<(), Error> {
        self.begin(State::Freeze)?;
        self.working = regs.to_bytes();
        self.unfreeze = unfreeze;
        Ok(())
    }

    fn begin(self: &mut Self, first: State) -> Result<(), Error> {
        (if self.is_busy() { Err(Error::Busy) } else { Ok(()) })?;
        self.state = first;
        self.retries = 0;
        self.polls = 0;
        Ok(())
    }

    /// Advance the sequence by one step.
    ///
    /// `WouldBlock` while running, `Ok` once the last transfer completed,
    /// `RetriesExhausted` when the retry budget ran out. Polling an idle
    /// sequencer returns `Ok`.
    pub fn poll<T: Transport>(self: &mut Self, bus: &mut T) -> nb::Result<(), Error> {
        let started = match self.state {
            State::Idle | State::Done => return Ok(()),

            State::WriteCommand =>
                bus.start_write(self.address, &[REG_CONTROL, CTRL_RECALL], Mode::Complete),
            State::WriteReadRequest =>
                bus.start_write(self.address, &[REG_DIVIDERS], Mode::NoStop),
            State::ReadData =>
                bus.start_read(self.address, REGISTER_BYTES, Mode::RepeatStart),
            State::Freeze =>
                bus.start_write(self.address, &[REG_CONTROL, CTRL_FREEZE_M], Mode::Complete),
            State::WriteRegisters => {
                let mut block = [0u8; REGISTER_BYTES + 1];
                block[0] = REG_DIVIDERS;
                block[1..].copy_from_slice(&self.working);
                bus.start_write(self.address, &block, Mode::Complete)
            }
            State::Unfreeze =>
                bus.start_write(self.address, &[REG_CONTROL, self.unfreeze], Mode::Complete),

            State::AwaitWrite | State::AwaitWrite2 | State::AwaitFreeze
                | State::AwaitWriteRegisters | State::AwaitUnfreeze =>
                return self.await_completion(bus, Completion::Write),
            State::AwaitRead =>
                return self.await_completion(bus, Completion::Read),
        };

        match started {
            Ok(()) => {
                self.advance();
                Err(nb::Error::WouldBlock)
            }
            Err(_) => {
                debug!("si570: transfer start failed in {:?}", self.state);
                self.failed(Error::Bus)
            }
        }
    }

    fn await_completion<T: Transport>(self: &mut Self, bus: &mut T, expect: Completion) -> nb::Result<(), Error> {
        match bus.status() {
            Ok(c) if c == expect => {
                if self.state == State::AwaitRead {
                    let mut rx = [0u8; REGISTER_BYTES];
                    if bus.read_data(&mut rx) < REGISTER_BYTES {
                        debug!("si570: short read in {:?}", self.state);
                        self.state = self.state.back();
                        return self.failed(Error::Bus);
                    }
                    self.working = rx;
                }
                self.advance();
                if self.state == State::Done { Ok(()) } else { Err(nb::Error::WouldBlock) }
            }
            Ok(c) => {
                debug!("si570: unexpected {:?} completion in {:?}", c, self.state);
                self.state = self.state.back();
                self.failed(Error::Bus)
            }
            Err(nb::Error::Other(_)) => {
                debug!("si570: transfer error in {:?}", self.state);
                self.state = self.state.back();
                self.failed(Error::Bus)
            }
            Err(nb::Error::WouldBlock) => {
                self.polls += 1;
                if self.polls < self.timeout_polls {
                    return Err(nb::Error::WouldBlock);
                }
                debug!("si570: transfer timed out in {:?}", self.state);
                self.state = self.state.back();
                self.failed(Error::Timeout)
            }
        }
    }

    fn advance(self: &mut Self) {
        self.state = self.state.next();
        self.polls = 0;
    }

    /// Count a failure, the current state is retried on the next poll
    fn failed(self: &mut Self, cause: Error) -> nb::Result<(), Error> {
        self.polls = 0;
        self.retries += 1;
        if self.retries <= self.max_retries {
            return Err(nb::Error::WouldBlock);
        }
        warn!("si570: giving up in {:?} after {} failures, last {:?}", self.state, self.retries, cause);
        self.state = State::Idle;
        Err(nb::Error::Other(Error::RetriesExhausted))
    }
}
