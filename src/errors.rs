//! Driver errors

/// Errors reported by the driver.
///
/// Transport errors are not carried through: the bus is retried in place
/// and only the final outcome is reported.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Transfer could not be started or reported a bus error
    Bus,
    /// No completion within the configured number of polls
    Timeout,
    /// Too many failed transfers within one sequence
    RetriesExhausted,
    /// Startup read-back of the factory registers failed
    InitFailed,
    /// A bus sequence is already in flight
    Busy,
    /// `init` has not completed yet
    NotInitialized,
    /// Crystal calibration word is zero
    NotCalibrated,
    /// No HS_DIV / N1 combination puts the DCO in range
    NoDividers,
}
