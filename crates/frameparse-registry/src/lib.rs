//! Type registry for frame output types.
//!
//! Maps a protocol-level type identifier, discovered at runtime from a frame
//! header, to a plain constructor for the matching output type. The candidate
//! list is declared at compile time (see [`output_types!`]) and built once
//! when an engine starts.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod registry;

pub use config::{DuplicatePolicy, RegistryConfig};
pub use descriptor::{DuplicateType, OutputType};
pub use error::{RegistryError, Result};
pub use registry::TypeRegistry;

/// Build a candidate list of [`OutputType`] descriptors from output types.
///
/// Every listed type must implement
/// [`Identified`](frameparse_image::Identified), `Default` and `Into<O>` for
/// the registry's output family `O`.
///
/// ```ignore
/// let candidates: Vec<OutputType<u8, Telemetry>> = output_types![Voltage, Current];
/// ```
#[macro_export]
macro_rules! output_types {
    ($($ty:ty),* $(,)?) => {
        ::std::vec![$($crate::OutputType::of::<$ty>()),*]
    };
}
