///! Driver configuration

use crate::constants::*;


/// Board and bus specific settings
#[derive(Debug,Copy,Clone,PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// 7-bit I2C address
    pub address: u8,
    /// Factory programmed output frequency of the fitted part, MHz
    pub startup_mhz: f64,
    /// Lowest LO frequency, requests below are clamped, MHz
    pub lo_min_mhz: f64,
    /// Highest LO frequency, requests above are clamped, MHz
    pub lo_max_mhz: f64,
    /// Crystal frequency assumed for raw register requests, MHz
    pub nominal_xtal_mhz: f64,
    /// Failed transfers tolerated within one bus sequence
    pub max_retries: u8,
    /// Status polls before a transfer counts as failed
    pub timeout_polls: u32,
}

impl Config {

    /// Defaults for the 56.32 MHz CMOS part at address 0x55
    pub const fn new() -> Self {
        Config {
            address: I2C_ADDRESS,
            startup_mhz: STARTUP_FREQ_MHZ,
            lo_min_mhz: LO_MIN_MHZ,
            lo_max_mhz: LO_MAX_MHZ,
            nominal_xtal_mhz: NOMINAL_XTAL_MHZ,
            max_retries: MAX_RETRIES,
            timeout_polls: TIMEOUT_POLLS,
        }
    }

    pub const fn with_address(self, address: u8) -> Self {
        Config { address, ..self }
    }

    /// Power-on output frequency from the part's ordering code
    pub const fn with_startup_mhz(self, startup_mhz: f64) -> Self {
        Config { startup_mhz, ..self }
    }

    pub const fn with_lo_range(self, lo_min_mhz: f64, lo_max_mhz: f64) -> Self {
        Config { lo_min_mhz, lo_max_mhz, ..self }
    }

    pub const fn with_nominal_xtal_mhz(self, nominal_xtal_mhz: f64) -> Self {
        Config { nominal_xtal_mhz, ..self }
    }

    pub const fn with_max_retries(self, max_retries: u8) -> Self {
        Config { max_retries, ..self }
    }

    pub const fn with_timeout_polls(self, timeout_polls: u32) -> Self {
        Config { timeout_polls, ..self }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
