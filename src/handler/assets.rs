//! Game asset lookup
//!
//! The resolution pipeline behind every `GET`: case-insensitive lookup, patch
//! substitution for the target script, then the `index.html` fallback for
//! directory requests and client-side routes.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger;
use crate::resolve;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

pub const INDEX_FILE: &str = "index.html";

/// Serve the asset behind `request_path`, or 404
pub async fn serve_asset(state: &AppState, request_path: &str, is_head: bool) -> Response<Full<Bytes>> {
    match locate_asset(state, request_path).await {
        Ok(Some(file)) => static_files::serve_file(&file, is_head).await,
        Ok(None) => http::build_404_response(),
        Err(e) => {
            logger::log_error(&format!("Failed to resolve '{request_path}': {e}"));
            http::build_500_response()
        }
    }
}

/// Pick the file to serve for `request_path`.
///
/// Candidates are tried in order: the path itself, then `<path>/index.html`.
/// The first one that resolves wins; if it is the target script and a patch
/// exists for its content, the patch is returned instead.
pub async fn locate_asset(state: &AppState, request_path: &str) -> io::Result<Option<PathBuf>> {
    let Some(joined) = join_request_path(&state.paths.root, request_path) else {
        return Ok(None);
    };

    for candidate in [joined.clone(), joined.join(INDEX_FILE)] {
        let Some(found) = resolve::resolve(&candidate).await? else {
            continue;
        };

        if let Some(patch) = state.patches.match_patch(&found).await? {
            logger::log_debug(&format!(
                "{request_path} -> patch {}",
                patch.display()
            ));
            return Ok(Some(patch));
        }
        if candidate != joined {
            logger::log_debug(&format!("{request_path} -> index fallback"));
        }
        return Ok(Some(found));
    }

    Ok(None)
}

/// Serve `/static/<path>`: the game root mounted literally, without case
/// folding, patching or index fallback
pub async fn serve_static_mount(
    state: &AppState,
    request_path: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let Some(path) = join_request_path(&state.paths.root, request_path) else {
        return http::build_404_response();
    };

    match fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => static_files::serve_file(&path, is_head).await,
        Ok(_) => http::build_404_response(),
        Err(e) if resolve::is_missing(&e) => http::build_404_response(),
        Err(e) => {
            logger::log_error(&format!("Failed to stat '{}': {e}", path.display()));
            http::build_500_response()
        }
    }
}

/// Join a URL path onto `root`.
///
/// Segments are percent-decoded; empty and `.` segments are dropped. Returns
/// `None` when the path would leave `root` or a segment cannot name a file.
/// Each kept segment must be a single plain file name, so a drive prefix such
/// as `C:` can never replace `root` when joined.
pub fn join_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut segments: Vec<String> = Vec::new();

    for raw in request_path.split('/') {
        let segment = percent_decode_str(raw).decode_utf8().ok()?;
        match &*segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if is_plain_segment(s) => segments.push(s.to_string()),
            _ => return None,
        }
    }

    let mut path = root.to_path_buf();
    path.extend(segments);
    Some(path)
}

/// One `Normal` path component with no separator, drive or stream syntax
fn is_plain_segment(segment: &str) -> bool {
    if segment.contains(['/', '\\', ':', '\0']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_plain_path() {
        let root = Path::new("/game");
        assert_eq!(
            join_request_path(root, "/img/pictures/Title.png"),
            Some(PathBuf::from("/game/img/pictures/Title.png"))
        );
        assert_eq!(join_request_path(root, "/"), Some(PathBuf::from("/game")));
        assert_eq!(join_request_path(root, ""), Some(PathBuf::from("/game")));
    }

    #[test]
    fn test_join_decodes_segments() {
        let root = Path::new("/game");
        assert_eq!(
            join_request_path(root, "/audio/bgm/Battle%201.ogg"),
            Some(PathBuf::from("/game/audio/bgm/Battle 1.ogg"))
        );
        assert_eq!(
            join_request_path(root, "/img/%E3%82%BF%E3%82%A4%E3%83%88%E3%83%AB.png"),
            Some(PathBuf::from("/game/img/タイトル.png"))
        );
    }

    #[test]
    fn test_join_normalizes_dots() {
        let root = Path::new("/game");
        assert_eq!(
            join_request_path(root, "/js/./plugins/../main.js"),
            Some(PathBuf::from("/game/js/main.js"))
        );
        assert_eq!(
            join_request_path(root, "//js//main.js/"),
            Some(PathBuf::from("/game/js/main.js"))
        );
    }

    #[test]
    fn test_join_rejects_escape() {
        let root = Path::new("/game");
        assert_eq!(join_request_path(root, "/../etc/passwd"), None);
        assert_eq!(join_request_path(root, "/js/../../etc/passwd"), None);
        assert_eq!(join_request_path(root, "/%2e%2e/etc/passwd"), None);
        assert_eq!(join_request_path(root, "/js%2F..%2F..%2Fetc"), None);
        assert_eq!(join_request_path(root, "/bad%FF"), None);
        assert_eq!(join_request_path(root, "/js%5C..%5C..%5Cetc"), None);
    }

    #[test]
    fn test_join_rejects_drive_and_stream_names() {
        let root = Path::new("/game");
        assert_eq!(join_request_path(root, "/C:/Windows/win.ini"), None);
        assert_eq!(join_request_path(root, "/D:secret.txt"), None);
        assert_eq!(join_request_path(root, "/img/C%3A/x.png"), None);
        assert_eq!(join_request_path(root, "/save/file1.rpgsave:stream"), None);
    }
}
