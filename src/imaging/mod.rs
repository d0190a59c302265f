//! Image inspection for staging.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff** | `image::guess_format` (magic bytes) |
//! | **Identify** | `image::ImageReader::into_dimensions` (header only) |
//!
//! Posts are uploaded as-is: nothing here re-encodes or resizes. Responsive
//! variants are produced at request time by the image CDN in front of the
//! bucket.

mod probe;

pub use probe::{ImageInfo, ProbeError, SniffedFormat, probe, sniff};
