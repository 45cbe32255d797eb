//! Binary image contracts.
//!
//! Every object produced by a frameparse engine can describe its own wire
//! representation:
//! - [`BinaryImage`] reports a length and serializes to / parses from a slice
//! - [`FrameImage`] initializes an output from a frame body once its common
//!   header has been extracted
//! - [`Identified`] attaches a compile-time type identifier to an output type
//!
//! This is the lowest layer of frameparse. Registries, parsers and the engine
//! all build on the traits defined here.

pub mod error;
pub mod traits;

pub use error::{ImageError, Result};
pub use traits::{BinaryImage, CommonHeader, FrameImage, Identified};
