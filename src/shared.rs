//! Requests from other execution contexts.
//!
//! The host command handler (usually an interrupt or another task) writes
//! the LO request, the crystal calibration and legacy register images here;
//! the driver tick picks them up. LO and crystal are read together in one
//! critical section so the tick never combines a new LO with a stale
//! calibration or the other way around.
//!
//! ```ignore
//! static REQUESTS: SharedState = SharedState::new();
//!
//! // USB control request handler
//! REQUESTS.set_lo(LoWord::from_wire(payload));
//! ```

use core::cell::Cell;

use critical_section::Mutex;

use crate::{constants::*, frequency::*};


/// LO request and crystal calibration, read as one value
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
    pub lo: LoWord,
    pub xtal: XtalWord,
}

impl Snapshot {
    /// Power-on request: startup LO, no calibration
    pub const STARTUP: Snapshot = Snapshot { lo: LoWord(STARTUP_LO), xtal: XtalWord(0) };
}


/// State shared between the host context and the driver
pub struct SharedState {
    freq: Mutex<Cell<Snapshot>>,
    legacy: Mutex<Cell<Option<[u8; 6]>>>,
}

impl SharedState {

    /// Startup LO request, no calibration, no legacy request
    pub const fn new() -> Self {
        SharedState {
            freq: Mutex::new(Cell::new(Snapshot::STARTUP)),
            legacy: Mutex::new(Cell::new(None)),
        }
    }

    /// Request a new LO frequency
    pub fn set_lo(self: &Self, lo: LoWord) {
        critical_section::with(|cs| {
            let c = self.freq.borrow(cs);
            c.set(Snapshot { lo, ..c.get() });
        })
    }

    /// Current LO request
    pub fn lo(self: &Self) -> LoWord {
        self.snapshot().lo
    }

    /// Override the crystal calibration, e.g. with a value from EEPROM.
    /// Setting it before `init` prevents the automatic calibration.
    pub fn set_xtal(self: &Self, xtal: XtalWord) {
        critical_section::with(|cs| {
            let c = self.freq.borrow(cs);
            c.set(Snapshot { xtal, ..c.get() });
        })
    }

    /// Current crystal calibration
    pub fn xtal(self: &Self) -> XtalWord {
        self.snapshot().xtal
    }

    /// LO request and calibration as one consistent pair
    pub fn snapshot(self: &Self) -> Snapshot {
        critical_section::with(|cs| self.freq.borrow(cs).get())
    }

    /// Request a frequency as a raw register image
    pub fn request_legacy(self: &Self, regs: [u8; 6]) {
        critical_section::with(|cs| self.legacy.borrow(cs).set(Some(regs)))
    }

    /// Take the pending register image, leaving the slot empty
    pub fn take_legacy(self: &Self) -> Option<[u8; 6]> {
        critical_section::with(|cs| self.legacy.borrow(cs).take())
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    static REQUESTS: SharedState = SharedState::new();

    #[test]
    fn starts_at_startup_lo() {
        let s = SharedState::new();
        assert_eq!(s.snapshot(), Snapshot::STARTUP);
        assert!(!s.xtal().is_calibrated());
    }

    #[test]
    fn lo_and_xtal_are_independent() {
        let s = SharedState::new();
        s.set_xtal(XtalWord::from_mhz(114.285));
        s.set_lo(LoWord::from_mhz(7.1));
        assert_eq!(s.snapshot(), Snapshot { lo: LoWord::from_mhz(7.1), xtal: XtalWord::from_mhz(114.285) });
        s.set_lo(LoWord::from_mhz(14.2));
        assert_eq!(s.xtal(), XtalWord::from_mhz(114.285));
        assert_eq!(s.lo(), LoWord::from_mhz(14.2));
    }

    #[test]
    fn legacy_slot_is_consumed_once() {
        REQUESTS.request_legacy([1, 2, 3, 4, 5, 6]);
        assert_eq!(REQUESTS.take_legacy(), Some([1, 2, 3, 4, 5, 6]));
        assert_eq!(REQUESTS.take_legacy(), None);
    }
}
