//! Si570 HS_DIV / N1 / RFREQ registers (7..=12)
//!
//! The six registers are handled as one 48-bit big-endian word:
//!
//! ```text
//! 47    45 44      38 37          28 27                    0
//! [HS_DIV] [  N1   ] [ RFREQ int  ] [     RFREQ fraction    ]
//! ```

use libm::floor;

use crate::constants::*;


/// Register image, bits 47..0 of the register block
#[derive(Debug,Copy,Clone,Default,PartialEq,Eq)]
pub struct Registers {
    /// Register block word, register 7 in the top byte
    pub w: u64,
}

/// Bit operations on the 48bit word
pub trait BitField {
    /// Number of bits in the bit field
    fn num_bits() -> u8;

    /// Offset from 0
    fn offset() -> u8;

    #[inline]
    fn mask() -> u64 {
        !(0xFFFF_FFFF_FFFF_FFFFu64 << Self::num_bits())
    }
}

/// Generate BitField implementation
macro_rules! gen_bitfield_impl {
    ($n:ident, $nb:tt, $off:tt) => {
        impl BitField for $n {
            #[inline] fn num_bits() -> u8 { $nb }
            #[inline] fn offset() -> u8 { $off }
        }
    }
}

/// Small bitfield-encoded numbers boilerplate
macro_rules! gen_bitfield_struct {
    ($(#[$meta:meta])*, $n:ident, $v:ty, $nb:tt, $off:tt) => {
        $(#[$meta])*
        #[derive(Debug,Copy,Clone,PartialEq,Eq)]
        pub struct $n(pub $v);

        gen_bitfield_impl!($n, $nb, $off);

        impl From<u64> for $n { #[inline] fn from(x: u64) -> Self { $n(x as $v) } }
        impl From<$n> for u64 { #[inline] fn from(x: $n) -> u64 { x.0 as u64 } }
    };
}


gen_bitfield_struct!(
    /// High speed divider, raw field value.
    /// 000 = 4, 001 = 5, 010 = 6, 011 = 7, 101 = 9, 111 = 11.
    /// 100 and 110 are not used.
    , HsDiv, u8, 3, 45
);

gen_bitfield_struct!(
    /// CLKOUT output divider, raw field value: N1 = value + 1.
    /// Illegal odd divider values are rounded up by the part.
    , N1, u8, 7, 38
);

gen_bitfield_struct!(
    /// Integer part of the DCO reference frequency multiplier
    , RfreqInt, u16, 10, 28
);

gen_bitfield_struct!(
    /// Fractional part of RFREQ, in units of 2^-28
    , RfreqFrac, u32, 28, 0
);


/// Largest value of the RFREQ fraction field
pub const RFREQ_FRAC_MAX: u32 = (1 << RFREQ_FRAC_BITS) - 1;

const RFREQ_SCALE: f64 = (1u32 << RFREQ_FRAC_BITS) as f64;

/// Largest value of the RFREQ integer field
pub const RFREQ_INT_MAX: u16 = 0x3FF;

/// Largest RFREQ the registers can hold
pub const RFREQ_MAX: f64 = RFREQ_INT_MAX as f64 + RFREQ_FRAC_MAX as f64 / RFREQ_SCALE;


/// Decoded divider and multiplier settings
#[derive(Debug,Copy,Clone,PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// High speed divider, 4..=11
    pub hsdiv: u8,
    /// Output divider, 1..=128
    pub n1: u8,
    /// DCO frequency over crystal frequency
    pub rfreq: f64,
}


impl Registers {

    /// Register image from bytes as read from registers 7..=12
    #[inline]
    pub fn from_bytes(b: [u8; REGISTER_BYTES]) -> Self {
        let w = b.iter().fold(0u64, |w, x| (w << 8) | (*x as u64));
        Registers { w }
    }

    /// Register values in device format, register 7 first
    #[inline]
    pub fn to_bytes(self: &Self) -> [u8; REGISTER_BYTES] {
        let mut b = [0u8; REGISTER_BYTES];
        for (i, x) in b.iter_mut().enumerate() {
            *x = (self.w >> (8 * (REGISTER_BYTES - 1 - i))) as u8;
        }
        b
    }

    /// Get register bitfield value
    #[inline]
    pub fn get<F>(self: &Self) -> F
    where F: Sized + BitField + From<u64>
    {
        F::from(
            (self.w >> F::offset()) & F::mask()
        )
    }

    /// Update register bitfield
    #[inline]
    pub fn set<F>(mut self: Self, f: F) -> Self
    where F: Sized + BitField + Into<u64>
    {
        let fbits = (f.into() & F::mask()) << F::offset();
        let rbits = self.w & (! ( F::mask() << F::offset() ));
        self.w = rbits | fbits;
        self
    }

    /// Decode HS_DIV, N1 and RFREQ
    pub fn decode(self: &Self) -> Settings {
        let hsdiv : HsDiv = self.get();
        let n1 : N1 = self.get();
        let int : RfreqInt = self.get();
        let frac : RfreqFrac = self.get();

        Settings {
            hsdiv: hsdiv.0 + 4,
            n1: n1.0 + 1,
            rfreq: int.0 as f64 + (frac.0 as f64) / RFREQ_SCALE,
        }
    }

    /// Encode settings into a register image.
    ///
    /// The RFREQ fraction saturates at its field width, a rounding error
    /// must not carry into the integer part. RFREQ above [`RFREQ_MAX`]
    /// saturates to it.
    pub fn encode(s: &Settings) -> Self {
        let rfreq = if s.rfreq > RFREQ_MAX { RFREQ_MAX } else { s.rfreq };
        let int = floor(rfreq);
        let frac = (rfreq - int) * RFREQ_SCALE;
        let frac = if frac > RFREQ_FRAC_MAX as f64 { RFREQ_FRAC_MAX } else { frac as u32 };

        Registers::default()
            .set(HsDiv(s.hsdiv.wrapping_sub(4)))
            .set(N1(s.n1.wrapping_sub(1)))
            .set(RfreqInt(int as u16))
            .set(RfreqFrac(frac))
    }
}


impl From<[u8; REGISTER_BYTES]> for Registers {
    #[inline]
    fn from(b: [u8; REGISTER_BYTES]) -> Self { Registers::from_bytes(b) }
}
