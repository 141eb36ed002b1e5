//! HTTP protocol layer module
//!
//! Response builders and Content-Type detection, decoupled from the routing policy.

pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_400_response, build_404_response, build_413_response, build_500_response,
    build_file_response, build_ok_response, build_text_response,
};
