//! Test vector loading infrastructure for sensormesh.
//!
//! Each module corresponds to a single JSON file under `.test-vectors/` and
//! provides typed structs matching its schema plus a `load()` function that
//! deserializes the embedded JSON via `include_str!`.
//!
//! # Usage
//!
//! ```rust
//! let vectors = sensormesh_test_vectors::signing::load();
//! for v in &vectors.sha256_single_block {
//!     assert_eq!(v.digest.len(), 64);
//!     // ... hash v.input and compare against v.digest
//! }
//! ```

#[cfg(feature = "helpers")]
pub mod helpers;

pub mod frames;
pub mod signing;

pub use frames::FramesVectors;
pub use signing::SigningVectors;
