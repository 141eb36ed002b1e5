//! Request handler module
//!
//! Routes requests to the save/load endpoints or the asset pipeline.

pub mod assets;
pub mod router;
pub mod save;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
