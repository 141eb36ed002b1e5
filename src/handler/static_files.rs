//! Static file serving module
//!
//! Turns a path chosen by the router into a response. Which file to serve is
//! decided elsewhere; this module only knows how to send one.

use crate::http::{self, mime};
use crate::logger;
use crate::resolve::is_missing;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::Path;
use tokio::fs;

/// Serve a file with a Content-Type inferred from its extension
pub async fn serve_file(file_path: &Path, is_head: bool) -> Response<Full<Bytes>> {
    match fs::read(file_path).await {
        Ok(content) => {
            let content_type = mime::content_type_for(file_path);
            http::build_file_response(Bytes::from(content), content_type, is_head)
        }
        // Removed between resolution and read
        Err(e) if is_missing(&e) => http::build_404_response(),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                file_path.display()
            ));
            http::build_500_response()
        }
    }
}
