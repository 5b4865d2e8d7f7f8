//! HS_DIV / N1 selection
//!
//! f DCO = f OUT × HS_DIV × N1 must stay within DCO_MIN .. DCO_MAX.
//! One HS_DIV candidate is tried per step so that a periodic caller never
//! spends more than a few float operations at a time.

use libm::round;

use crate::{constants::*, errors::*};


/// Output divider pair
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dividers {
    pub hsdiv: u8,
    pub n1: u8,
}

impl Dividers {
    /// Total division ratio between DCO and output
    #[inline]
    pub fn ratio(self: &Self) -> f64 {
        (self.hsdiv as f64) * (self.n1 as f64)
    }
}


/// Dividers together with the DCO frequency they produce, MHz
#[derive(Debug,Copy,Clone,PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tuning {
    pub dividers: Dividers,
    pub dco: f64,
}


/// Incremental divider search for one output frequency.
///
/// Candidates are scanned from the smallest HS_DIV up. A candidate is
/// taken only when its DCO frequency is lower than the best one so far,
/// which starts at DCO_MAX, so among equal DCO frequencies the first one
/// scanned wins.
#[derive(Debug,Copy,Clone)]
pub struct DividerSearch {
    fout: f64,
    next: usize,
    dco: f64,
    best: Option<Dividers>,
}

impl DividerSearch {

    /// Start a search for `fout` MHz
    pub fn new(fout: f64) -> Self {
        DividerSearch { fout, next: 0, dco: DCO_MAX, best: None }
    }

    /// Try the next HS_DIV candidate.
    ///
    /// Returns `WouldBlock` while candidates remain, then the best tuning
    /// found, or `NoDividers` if none put the DCO in range.
    pub fn step(self: &mut Self) -> nb::Result<Tuning, Error> {
        if let Some(&hsdiv) = HSDIV_VALUES.get(self.next) {
            self.next += 1;
            self.try_candidate(hsdiv);
        }

        if self.next < HSDIV_VALUES.len() {
            return Err(nb::Error::WouldBlock);
        }

        match self.best {
            Some(dividers) => Ok(Tuning { dividers, dco: self.dco }),
            None => Err(nb::Error::Other(Error::NoDividers)),
        }
    }

    fn try_candidate(self: &mut Self, hsdiv: u8) {
        let n1 = round(DCO_CENTER / (self.fout * hsdiv as f64));
        if n1 > N1_MAX as f64 {
            return;
        }

        let mut n1 = n1 as u8;
        if n1 > 1 && n1 & 1 == 1 {
            n1 += 1;
        }

        let dco = self.fout * (hsdiv as f64) * (n1 as f64);
        if dco > DCO_MIN && dco < self.dco {
            self.dco = dco;
            self.best = Some(Dividers { hsdiv, n1 });
        }
    }
}


/// Run a divider search to completion
pub fn search(fout: f64) -> Result<Tuning, Error> {
    let mut s = DividerSearch::new(fout);
    nb::block!(s.step())
}
