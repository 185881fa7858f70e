//! Logging macros
//!
//! Every level forwards to `defmt` when the `defmt` feature is enabled and
//! expands to nothing otherwise, so log points cost nothing in ISR paths of
//! builds without a logger.

#[doc(hidden)]
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! __owlog {
    (trace, $($arg:tt)*) => { defmt::trace!($($arg)*) };
    (debug, $($arg:tt)*) => { defmt::debug!($($arg)*) };
    (info, $($arg:tt)*) => { defmt::info!($($arg)*) };
    (warn, $($arg:tt)*) => { defmt::warn!($($arg)*) };
    (error, $($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[doc(hidden)]
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! __owlog {
    ($level:ident, $($arg:tt)*) => {};
}

/// Trace message (per-tick and per-alarm detail)
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__owlog!(trace, $($arg)*) };
}

/// Debug message
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__owlog!(debug, $($arg)*) };
}

/// Info message
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__owlog!(info, $($arg)*) };
}

/// Warning message
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__owlog!(warn, $($arg)*) };
}

/// Error message
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__owlog!(error, $($arg)*) };
}
