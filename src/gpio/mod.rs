//! # GPIO module
//!
//! Port-level abstraction of the GPIO banks. Each of the up to seven ports
//! has 16 pads, configured through per-pad slots in the MODER, OTYPER,
//! OSPEEDR, PUPDR and AFRL/AFRH registers, and driven through the output
//! latch and the set/reset register.
//!
//! The API is split into the following parts:
//!
//! - [`mode`]: The value-level [`PadMode`] and its packed [`ModeWord`] form,
//!   together with the named modes like [`PUSH_PULL_OUTPUT`]
//! - [`reg`]: The [`PortRegisters`] trait every register access goes through,
//!   implemented by [`MmioPort`] for the hardware and [`SimulatedPort`] for
//!   host tests
//! - [`port`]: [`Port`], which owns one register handle and provides masked
//!   reads, writes and mode changes
//! - [`config`]: The start-up table [`GlobalPortConfig`] and [`init`]
//! - [`pad`]: Single-pad handles implementing the embedded HAL traits
//!
//! ## Examples
//!
//! - Blinky example: `demos/blinky.rs`
pub mod config;
pub use config::*;

pub mod mode;
pub use mode::*;

pub mod pad;
pub use pad::*;

pub mod port;
pub use port::*;

pub mod reg;
pub use reg::*;
