//! Smooth tuning
//!
//! Small changes of the DCO frequency can be applied by rewriting RFREQ
//! only, the output keeps running. Anything else needs new dividers and a
//! NewFreq strobe, which interrupts the output.

use libm::fabs;

use crate::{constants::*, dividers::*};


/// How a new frequency gets applied
#[derive(Debug,Copy,Clone,PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Path {
    /// Keep the dividers, move the DCO to the given tuning
    Smooth(Tuning),
    /// Search for new dividers, starting from DCO_MAX
    Full,
}

impl Path {
    /// Register 135 value that releases the frozen DSPLL
    #[inline]
    pub fn unfreeze(self: &Self) -> u8 {
        match self {
            Path::Smooth(_) => CTRL_UNFREEZE_SMOOTH,
            Path::Full => CTRL_NEW_FREQ,
        }
    }
}


/// Pick the path for `fout` given the tuning currently in the part.
pub fn evaluate(current: Option<&Tuning>, fout: f64) -> Path {
    let current = match current {
        Some(t) => t,
        None => return Path::Full,
    };

    let limit = current.dco * SMOOTH_PPM / 1_000_000.0;
    let dco = fout * current.dividers.ratio();

    if dco > DCO_MIN && dco < DCO_MAX && fabs(dco - current.dco) < limit {
        Path::Smooth(Tuning { dividers: current.dividers, dco })
    } else {
        Path::Full
    }
}
