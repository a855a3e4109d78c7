#![no_std]
#![doc = include_str!("../README.md")]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod bus;
pub mod quirks;
pub mod regs;
pub mod scc;

pub use bus::{MmioBus, SdhiBus};
pub use scc::{Config, DriftEvent, Error, Scc, TapBitmap, TapTiming, Timing};
