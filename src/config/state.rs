// Application state module
// Immutable per-process state shared by every request

use std::sync::Arc;

use super::types::{Config, GamePaths};
use crate::patch::PatchMatcher;
use crate::store::{FileStore, SaveStore};

/// Application state
pub struct AppState {
    pub config: Config,
    pub paths: GamePaths,
    pub patches: PatchMatcher,
    pub save_store: Arc<dyn SaveStore>,
    /// Access logging, fixed at startup from the debug toggle
    pub access_log: bool,
}

impl AppState {
    /// State backed by the save file inside the game folder
    pub fn new(config: Config, paths: GamePaths) -> Self {
        let store = Arc::new(FileStore::new(paths.save_file.clone()));
        Self::with_store(config, paths, store)
    }

    pub fn with_store(config: Config, paths: GamePaths, save_store: Arc<dyn SaveStore>) -> Self {
        let patches = PatchMatcher::new(paths.patches_dir.clone(), config.game.target_file.clone());
        let access_log = config.logging.debug;

        Self {
            config,
            paths,
            patches,
            save_store,
            access_log,
        }
    }
}
