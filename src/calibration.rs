///! Crystal calibration
///!
///! The part leaves the factory programmed for STARTUP_FREQ. Reading the
///! registers back right after a recall gives the actual crystal frequency:
///! f XTAL = f STARTUP × HS_DIV × N1 / RFREQ

use crate::{errors::*, frequency::*, register::*};


/// Factory register snapshot, as read after the recall
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct Calibration {
    factory: [u8; 6],
}

impl Calibration {

    /// Keep the factory registers verbatim
    pub fn new(factory: [u8; 6]) -> Self {
        Calibration { factory }
    }

    /// Crystal frequency implied by the factory registers, MHz
    pub fn xtal_mhz(self: &Self, startup_mhz: f64) -> Result<f64, Error> {
        let s = Registers::from_bytes(self.factory).decode();
        (if s.rfreq > 0.0 { Ok(()) } else { Err(Error::NotCalibrated) })?;

        Ok(startup_mhz * (s.hsdiv as f64) * (s.n1 as f64) / s.rfreq)
    }

    /// Crystal frequency in the host calibration format
    pub fn xtal_word(self: &Self, startup_mhz: f64) -> Result<XtalWord, Error> {
        self.xtal_mhz(startup_mhz).map(XtalWord::from_mhz)
    }

    /// Factory registers
    #[inline]
    pub fn factory(self: &Self) -> [u8; 6] {
        self.factory
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn xtal_from_factory_registers() {
        let regs = Registers::encode(&Settings { hsdiv: 7, n1: 4, rfreq: 120.5 }).to_bytes();
        let c = Calibration::new(regs);
        let expected = 56.32 * 7.0 * 4.0 / 120.5;
        let xtal = c.xtal_mhz(STARTUP_FREQ_MHZ).unwrap();
        assert!(((xtal - expected) / expected).abs() < 1e-6);
        let word = c.xtal_word(STARTUP_FREQ_MHZ).unwrap();
        assert!(((word.mhz() - expected) / expected).abs() < 1e-6);
        assert_eq!(c.factory(), regs);
    }

    #[test]
    fn typical_part() {
        // 56.32 MHz CMOS part: HS_DIV 4, N1 22, RFREQ ~43.37
        let rfreq = 56.32 * 88.0 / 114.285;
        let regs = Registers::encode(&Settings { hsdiv: 4, n1: 22, rfreq }).to_bytes();
        let xtal = Calibration::new(regs).xtal_mhz(STARTUP_FREQ_MHZ).unwrap();
        assert!((xtal - 114.285).abs() < 1e-6);
    }

    #[test]
    fn zero_rfreq_is_rejected() {
        assert_eq!(Calibration::new([0; 6]).xtal_mhz(STARTUP_FREQ_MHZ), Err(Error::NotCalibrated));
    }
}
