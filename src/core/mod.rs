// Core modules: platform detection, extraction, loading, and error modeling.
pub mod config;
pub mod error;
pub mod extract;
pub mod loader;
pub mod platform;
pub mod registry;
pub mod resource;
