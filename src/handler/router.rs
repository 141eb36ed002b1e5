//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: save/load endpoints, the literal
//! `/static/` mount, and the asset catch-all.

use crate::config::AppState;
use crate::handler::{assets, save};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

pub const SAVE_PATH: &str = "/mvix/save";
pub const LOAD_PATH: &str = "/mvix/load";
pub const STATIC_PREFIX: &str = "/static/";

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let started = Instant::now();
    let mut access_entry = state
        .access_log
        .then(|| AccessLogEntry::from_request(&req, peer_addr.ip().to_string()));

    let mut response = route_request(req, &state).await;
    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }

    if let Some(entry) = access_entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match method {
        Method::POST if path == SAVE_PATH => save::handle_save(req.into_body(), state).await,
        Method::POST if path == LOAD_PATH => save::handle_load(state).await,
        Method::GET | Method::HEAD => {
            let is_head = method == Method::HEAD;
            match path.strip_prefix(STATIC_PREFIX) {
                Some(rest) => assets::serve_static_mount(state, rest, is_head).await,
                None => assets::serve_asset(state, &path, is_head).await,
            }
        }
        _ => http::build_404_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::patch::Fingerprint;
    use crate::store::{FileStore, MemoryStore, SaveStore};
    use http_body_util::BodyExt;
    use hyper::StatusCode;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    const MAIN_JS: &[u8] = b"PluginManager.setup($plugins);\r\nSceneManager.run(Scene_Boot);\r\n";
    const PATCHED_JS: &[u8] = b"// patched\nSceneManager.run(Scene_Boot);\n";

    struct Fixture {
        game: TempDir,
        patches: TempDir,
        state: Arc<AppState>,
    }

    fn fixture() -> Fixture {
        fixture_with_store(None)
    }

    fn fixture_with_store(store: Option<Arc<dyn SaveStore>>) -> Fixture {
        let game = TempDir::new().unwrap();
        let patches = TempDir::new().unwrap();

        fs::write(game.path().join("Index.HTML"), b"<html>game</html>").unwrap();
        fs::create_dir_all(game.path().join("js/plugins")).unwrap();
        fs::write(game.path().join("js/main.js"), MAIN_JS).unwrap();
        fs::write(game.path().join("js/plugins/Core.js"), b"core").unwrap();
        fs::create_dir_all(game.path().join("img/Pictures")).unwrap();
        fs::write(game.path().join("img/Pictures/Title.png"), b"png").unwrap();
        fs::create_dir_all(game.path().join("docs")).unwrap();
        fs::write(game.path().join("docs/index.html"), b"docs").unwrap();

        let mut config = Config::load_from(game.path(), &HashMap::new()).unwrap();
        config.game.patches_dir = Some(patches.path().to_path_buf());
        let paths = config.game_paths(game.path());
        let store: Arc<dyn SaveStore> = match store {
            Some(store) => store,
            None => Arc::new(FileStore::new(paths.save_file.clone())),
        };
        let state = Arc::new(AppState::with_store(config, paths, store));

        Fixture {
            game,
            patches,
            state,
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        uri: &str,
        body: &'static [u8],
    ) -> (StatusCode, Bytes) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body)))
            .unwrap();
        let resp = handle_request(req, Arc::clone(state), peer()).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, body)
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Bytes) {
        send(state, Method::GET, uri, b"").await
    }

    #[tokio::test]
    async fn test_root_serves_mixed_case_index() {
        let fx = fixture();
        for uri in ["/", "/index.html", "/INDEX.html"] {
            let (status, body) = get(&fx.state, uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, Bytes::from_static(b"<html>game</html>"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_case_insensitive_asset() {
        let fx = fixture();
        let (status, body) = get(&fx.state, "/IMG/pictures/title.PNG").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"png"));
    }

    #[tokio::test]
    async fn test_query_string_ignored() {
        let fx = fixture();
        let (status, body) = get(&fx.state, "/js/plugins/Core.js?v=123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"core"));
    }

    #[tokio::test]
    async fn test_main_js_without_patch_is_untouched() {
        let fx = fixture();
        let (status, body) = get(&fx.state, "/js/main.js").await;
        assert_eq!(status, StatusCode::OK);
        // CRs are only stripped for fingerprinting, never from the served bytes
        assert_eq!(body, Bytes::from_static(MAIN_JS));
    }

    #[tokio::test]
    async fn test_main_js_replaced_by_matching_patch() {
        let fx = fixture();
        let name = fx.state.patches.patch_file_name(&Fingerprint::of(MAIN_JS));
        fs::write(fx.patches.path().join(name), PATCHED_JS).unwrap();

        let (status, body) = get(&fx.state, "/js/main.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(PATCHED_JS));
    }

    #[tokio::test]
    async fn test_patch_matches_lf_checkout() {
        let fx = fixture();
        let lf: Vec<u8> = MAIN_JS.iter().copied().filter(|&b| b != b'\r').collect();
        fs::write(fx.game.path().join("js/main.js"), &lf).unwrap();

        let name = fx.state.patches.patch_file_name(&Fingerprint::of(MAIN_JS));
        fs::write(fx.patches.path().join(name), PATCHED_JS).unwrap();

        let (_, body) = get(&fx.state, "/js/MAIN.js").await;
        assert_eq!(body, Bytes::from_static(PATCHED_JS));
    }

    #[tokio::test]
    async fn test_patch_for_other_release_ignored() {
        let fx = fixture();
        let name = fx.state.patches.patch_file_name(&Fingerprint::of(b"older release"));
        fs::write(fx.patches.path().join(name), PATCHED_JS).unwrap();

        let (_, body) = get(&fx.state, "/js/main.js").await;
        assert_eq!(body, Bytes::from_static(MAIN_JS));
    }

    #[tokio::test]
    async fn test_directory_index_fallback() {
        let fx = fixture();
        for uri in ["/docs", "/docs/", "/DOCS"] {
            let (status, body) = get(&fx.state, uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, Bytes::from_static(b"docs"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_missing_asset_is_empty_404() {
        let fx = fixture();
        for uri in ["/nope.png", "/img/nope/", "/js/plugins/", "/../etc/passwd"] {
            let (status, body) = get(&fx.state, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(body.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let fx = fixture();
        let req = Request::builder()
            .method(Method::HEAD)
            .uri("/js/plugins/Core.js")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_request(req, Arc::clone(&fx.state), peer()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Length"], "4");
        assert!(resp.into_body().collect().await.unwrap().to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_content_type_follows_served_file() {
        let fx = fixture();
        let req = Request::builder()
            .uri("/img/Pictures/Title.png")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_request(req, Arc::clone(&fx.state), peer()).await.unwrap();
        assert_eq!(resp.headers()["Content-Type"], "image/png");
        assert_eq!(resp.headers()["Server"], "mvix");
    }

    #[tokio::test]
    async fn test_static_mount_is_literal() {
        let fx = fixture();
        let (status, body) = get(&fx.state, "/static/img/Pictures/Title.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"png"));

        // No case folding and no index fallback under /static/
        let (status, _) = get(&fx.state, "/static/img/pictures/title.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(&fx.state, "/static/docs/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_load_before_save_is_null() {
        let fx = fixture();
        let (status, body) = send(&fx.state, Method::POST, LOAD_PATH, b"").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"null"));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let fx = fixture();
        let (status, body) = send(&fx.state, Method::POST, SAVE_PATH, b"{\"x\":1}").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (_, body) = send(&fx.state, Method::POST, LOAD_PATH, b"").await;
        assert_eq!(body, Bytes::from_static(b"{\"x\":1}"));
        assert_eq!(
            fs::read(fx.game.path().join("mvix.json")).unwrap(),
            b"{\"x\":1}"
        );
    }

    #[tokio::test]
    async fn test_empty_save_keeps_previous_blob() {
        let fx = fixture();
        send(&fx.state, Method::POST, SAVE_PATH, b"[1,2,3]").await;
        let (status, _) = send(&fx.state, Method::POST, SAVE_PATH, b"").await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&fx.state, Method::POST, LOAD_PATH, b"").await;
        assert_eq!(body, Bytes::from_static(b"[1,2,3]"));
    }

    #[tokio::test]
    async fn test_save_with_in_memory_store() {
        let fx = fixture_with_store(Some(Arc::new(MemoryStore::default())));
        send(&fx.state, Method::POST, SAVE_PATH, b"in memory").await;

        let (_, body) = send(&fx.state, Method::POST, LOAD_PATH, b"").await;
        assert_eq!(body, Bytes::from_static(b"in memory"));
        assert!(!fx.game.path().join("mvix.json").exists());
    }

    #[tokio::test]
    async fn test_oversized_save_rejected() {
        let game = TempDir::new().unwrap();
        let vars = HashMap::from([("MVIX_HTTP__MAX_BODY_SIZE".to_string(), "4".to_string())]);
        let config = Config::load_from(game.path(), &vars).unwrap();
        let paths = config.game_paths(game.path());
        let state = Arc::new(AppState::with_store(
            config,
            paths,
            Arc::new(MemoryStore::default()),
        ));

        let (status, _) = send(&state, Method::POST, SAVE_PATH, b"too long").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let (_, body) = send(&state, Method::POST, LOAD_PATH, b"").await;
        assert_eq!(body, Bytes::from_static(b"null"));
    }

    #[tokio::test]
    async fn test_unknown_routes_are_404() {
        let fx = fixture();
        let cases = [
            (Method::GET, SAVE_PATH),
            (Method::POST, "/index.html"),
            (Method::PUT, SAVE_PATH),
            (Method::DELETE, "/js/main.js"),
        ];
        for (method, uri) in cases {
            let (status, body) = send(&fx.state, method, uri, b"").await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(body.is_empty(), "{uri}");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_io_fault_during_resolution_is_500() {
        let fx = fixture();
        // Self-referencing link: stat fails with ELOOP, not NotFound
        std::os::unix::fs::symlink("loop.js", fx.game.path().join("loop.js")).unwrap();

        for uri in ["/loop.js", "/LOOP.js"] {
            let (status, body) = get(&fx.state, uri).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert!(body.is_empty(), "{uri}");
        }
    }
}
