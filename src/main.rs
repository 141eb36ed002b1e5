use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod patch;
mod resolve;
mod server;
mod store;

use error::StartupError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StartupError> {
    let root = std::env::current_dir().map_err(StartupError::WorkingDir)?;
    let env: HashMap<String, String> = std::env::vars().collect();
    let cfg = config::Config::load_from(&root, &env)?;
    let paths = cfg.game_paths(&root);

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(StartupError::Runtime)?;

    let state = Arc::new(config::AppState::new(cfg, paths));
    runtime.block_on(async_main(state))
}

async fn async_main(state: Arc<config::AppState>) -> Result<(), StartupError> {
    check_game_folder(&state.paths.root).await?;

    logger::init(&state).map_err(StartupError::Logger)?;
    remove_unfinished_saves(&state).await;

    let addr = state
        .config
        .get_socket_addr()
        .map_err(StartupError::InvalidAddress)?;
    let listener =
        server::create_listener(addr).map_err(|source| StartupError::Bind { addr, source })?;

    let url = listener
        .local_addr()
        .map_or_else(|_| server::browser_url(addr), server::browser_url);
    logger::log_server_start(&url, &state);

    if state.config.browser.open {
        open_browser(url);
    }

    server::run(listener, state, server::signal::shutdown_signal()).await;
    Ok(())
}

/// Refuse to serve anything that is not a game folder
async fn check_game_folder(root: &Path) -> Result<(), StartupError> {
    let index = root.join(handler::assets::INDEX_FILE);
    match resolve::resolve(&index).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(StartupError::MissingIndex),
        Err(e) => Err(StartupError::IndexCheck(e)),
    }
}

/// Temp files of saves interrupted before their rename
async fn remove_unfinished_saves(state: &config::AppState) {
    let save_store = store::FileStore::new(state.paths.save_file.clone());
    match save_store.remove_orphans().await {
        Ok(0) => {}
        Ok(removed) => logger::log_warning(&format!(
            "Removed {removed} unfinished save file(s) from an earlier run"
        )),
        Err(e) => logger::log_warning(&format!("Failed to clean up unfinished saves: {e}")),
    }
}

/// Open the game in the default browser without holding up the server
fn open_browser(url: String) {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = webbrowser::open(&url) {
            logger::log_warning(&format!("Failed to open browser: {e}"));
        }
    });
}
