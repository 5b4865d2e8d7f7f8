//! Constants

/// 7-bit I2C address of the Si570
pub const I2C_ADDRESS: u8 = 0x55;

/// Register 135: reset / freeze M / recall control
pub const REG_CONTROL: u8 = 135;

/// Base address of the HS_DIV / N1 / RFREQ block (registers 7..=12)
pub const REG_DIVIDERS: u8 = 7;

/// Number of bytes in the HS_DIV / N1 / RFREQ block
pub const REGISTER_BYTES: usize = 6;

/// Register 135 bit 0: reload NVM factory values into RAM
pub const CTRL_RECALL: u8 = 0x01;

/// Register 135 bit 5: freeze M, RFREQ changes are held until released
pub const CTRL_FREEZE_M: u8 = 0x20;

/// Register 135 release value when only RFREQ changed (smooth tuning)
pub const CTRL_UNFREEZE_SMOOTH: u8 = 0x00;

/// Register 135 bit 6: NewFreq, required after dividers change
pub const CTRL_NEW_FREQ: u8 = 0x40;

/// DCO must run above this frequency, MHz
pub const DCO_MIN: f64 = 4850.0;

/// DCO must run below this frequency, MHz
pub const DCO_MAX: f64 = 5670.0;

/// Middle of the DCO range, MHz
pub const DCO_CENTER: f64 = (DCO_MIN + DCO_MAX) / 2.0;

/// Largest change of the DCO frequency that can be applied without
/// interrupting the output, parts per million.
pub const SMOOTH_PPM: f64 = 3500.0;

/// Valid HS_DIV values, in search order. 8 and 10 are not implemented
/// by the part.
pub const HSDIV_VALUES: [u8; 6] = [4, 5, 6, 7, 9, 11];

/// Largest N1 divider value
pub const N1_MAX: u8 = 128;

/// Output frequency the part powers up with, MHz.
/// Depends on the ordering code, 56.32 MHz for the CMOS part on the board.
pub const STARTUP_FREQ_MHZ: f64 = 56.32;

/// Lowest LO frequency accepted, MHz
pub const LO_MIN_MHZ: f64 = 4.0;

/// Highest LO frequency accepted, MHz (CMOS output variant)
pub const LO_MAX_MHZ: f64 = 160.0;

/// Crystal frequency assumed by host software that programs the
/// registers directly. It does not know the calibrated value.
pub const NOMINAL_XTAL_MHZ: f64 = 114.285;

/// Startup LO request, 56.32 MHz in the byte reversed 11.21 format
pub const STARTUP_LO: u32 = 0x713D_0A07;

/// Fractional bits of the LO word
pub const LO_FRAC_BITS: u32 = 21;

/// Fractional bits of the crystal calibration word
pub const XTAL_FRAC_BITS: u32 = 24;

/// Fractional bits of RFREQ
pub const RFREQ_FRAC_BITS: u32 = 28;

/// Transfer errors tolerated within one bus sequence
pub const MAX_RETRIES: u8 = 8;

/// Status polls an await step may take before it is treated as failed
pub const TIMEOUT_POLLS: u32 = 10_000;
