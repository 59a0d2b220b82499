//! Logging macros.
//!
//! With the `defmt` feature these forward to the matching `defmt` macro. Without it the
//! arguments are only borrowed, so call sites compile the same way in both configurations
//! and host builds need no global logger.

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::trace!($s $(, $x)*);
            $(
                #[cfg(not(feature = "defmt"))]
                let _ = &$x;
            )*
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::debug!($s $(, $x)*);
            $(
                #[cfg(not(feature = "defmt"))]
                let _ = &$x;
            )*
        }
    };
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::info!($s $(, $x)*);
            $(
                #[cfg(not(feature = "defmt"))]
                let _ = &$x;
            )*
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s $(, $x)*);
            $(
                #[cfg(not(feature = "defmt"))]
                let _ = &$x;
            )*
        }
    };
}
