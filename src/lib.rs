//! Purpose: Bootstrap the TinyB native libraries without a configured library path.
//! Exports: `api` (loader, registry, extraction, errors) and `load_library`.
//! Role: Library crate behind the `tinyb-loader` diagnostic binary and the bindings that embed it.
//! Invariants: Platform detection and extraction happen once per loader, before any load.
//! Invariants: Core modules prefer explicit inputs/outputs; the process-wide loader is opt-in.
pub mod api;
pub mod core;

pub use api::load_library;
