#![cfg_attr(not(test), no_std)]

///! (Si570)[https://www.skyworksinc.com/en/Products/Timing/Programmable-Oscillators/Si570]
///! local oscillator driver.
///!
///! Frequency requests come in through [`shared::SharedState`], the
///! periodic [`device::Si570::tick`] retunes the part over a non-blocking
///! [`bus::Transport`], using smooth tuning when the change is small enough.

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod constants;
pub mod register;
pub mod errors;
pub mod config;
pub mod frequency;
pub mod calibration;
pub mod dividers;
pub mod smooth;
pub mod legacy;
pub mod bus;
pub mod shared;
pub mod sequencer;
pub mod device;

pub use device::Si570;
