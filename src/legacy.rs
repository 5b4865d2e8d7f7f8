//! Frequency requests given as raw register images.
//!
//! Older host software programs the Si570 registers itself and assumes a
//! nominal crystal frequency. The image is turned back into a plain LO
//! request so that it goes through the normal tuning path.

use crate::{frequency::*, register::*};

/// LO request equivalent to a register image, using the nominal crystal
pub fn lo_from_registers(nominal_xtal_mhz: f64, regs: [u8; 6]) -> LoWord {
    LoWord::from_mhz(f_out_mhz(nominal_xtal_mhz, &Registers::from_bytes(regs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn nominal_crystal_is_used() {
        let regs = [0x60, 0xC7, 0x88, 0x00, 0x00, 0x00]; // 7, 4, 120.5
        let lo = lo_from_registers(NOMINAL_XTAL_MHZ, regs);
        let expected = 114.285 * 120.5 / 28.0;
        assert!((lo.mhz() - expected).abs() < 1.0 / (1u32 << 21) as f64);
        assert_eq!(lo, LoWord::from_mhz(expected));
    }

    #[test]
    fn hf_request() {
        // 14.08 MHz: HS_DIV 6, N1 62
        let rfreq = 14.08 * 6.0 * 62.0 / NOMINAL_XTAL_MHZ;
        let regs = Registers::encode(&Settings { hsdiv: 6, n1: 62, rfreq }).to_bytes();
        let lo = lo_from_registers(NOMINAL_XTAL_MHZ, regs);
        assert!((lo.mhz() - 14.08).abs() < 1e-6);
    }
}
