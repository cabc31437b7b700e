//! Logging interface, contingent on the `defmt-03` feature
//!
//! Only enable `defmt-03` when your defmt transport isn't riding on the
//! same USB peripheral this device is served by!

macro_rules! debug {
    ($($args:tt)*) => {
        #[cfg(feature = "defmt-03")]
        ::defmt_03::debug!($($args)*)
    };
}

macro_rules! warn {
    ($($args:tt)*) => {
        #[cfg(feature = "defmt-03")]
        ::defmt_03::warn!($($args)*)
    };
}
