#![cfg_attr(not(test), no_std)]

// This must go first so the logging macros are visible to the other modules
mod fmt;

pub mod gpio;
pub mod prelude;
