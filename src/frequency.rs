///! Frequency words exchanged with the host
///!
///! Host software sends frequencies as little-endian fixed point numbers,
///! the firmware sees them as byte reversed 32bit words. Both layouts
///! are kept bit exact.

use crate::{constants::*, register::*};


/// Generate a byte reversed fixed point frequency word
macro_rules! gen_frequency_word {
    ($(#[$meta:meta])*, $n:ident, $frac_bits:expr) => {
        $(#[$meta])*
        #[derive(Debug,Copy,Clone,Default,PartialEq,Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub struct $n(pub u32);

        impl $n {
            /// Encode a frequency in MHz, truncating toward zero
            #[inline]
            pub fn from_mhz(mhz: f64) -> Self {
                $n(((mhz * (1u32 << $frac_bits) as f64) as u32).swap_bytes())
            }

            /// Frequency in MHz
            #[inline]
            pub fn mhz(self: &Self) -> f64 {
                self.0.swap_bytes() as f64 / (1u32 << $frac_bits) as f64
            }

            /// Word from the four bytes as they arrive from the host
            #[inline]
            pub fn from_wire(b: [u8; 4]) -> Self {
                $n(u32::from_be_bytes(b))
            }

            /// Four bytes as they are sent to the host
            #[inline]
            pub fn to_wire(self: &Self) -> [u8; 4] {
                self.0.to_be_bytes()
            }
        }
    };
}

gen_frequency_word!(
    /// LO frequency, unsigned 11.21 fixed point MHz, byte reversed
    , LoWord, LO_FRAC_BITS
);

gen_frequency_word!(
    /// Crystal calibration, unsigned 8.24 fixed point MHz, byte reversed.
    /// Zero means "not calibrated".
    , XtalWord, XTAL_FRAC_BITS
);


impl XtalWord {
    /// True if the word holds a calibration value
    #[inline]
    pub fn is_calibrated(self: &Self) -> bool {
        self.0 != 0
    }
}


/// Limit a requested LO frequency to the range the part can produce
#[inline]
pub fn clamp_lo(mhz: f64, min: f64, max: f64) -> f64 {
    if mhz < min {
        min
    } else if mhz > max {
        max
    } else {
        mhz
    }
}


/// Output frequency for a register image and crystal frequency.
/// f OUT = f XTAL × RFREQ / (HS_DIV × N1)
pub fn f_out_mhz(xtal_mhz: f64, rs: &Registers) -> f64 {
    let s = rs.decode();
    xtal_mhz * s.rfreq / ((s.hsdiv as f64) * (s.n1 as f64))
}
