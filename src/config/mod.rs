// Configuration module entry point
// Loads settings from defaults, an optional mvix.toml and the environment

mod state;
mod types;

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

pub use state::AppState;
pub use types::{Config, GamePaths};

/// Optional config file looked up in the game root
pub const CONFIG_FILE_NAME: &str = "mvix.toml";

/// Prefix for environment overrides of any key, e.g. `MVIX_GAME__PATCHES_DIR`
const ENV_PREFIX: &str = "MVIX";

impl Config {
    /// Load configuration for the game folder at `root`.
    ///
    /// Precedence, lowest first: built-in defaults, `<root>/mvix.toml`, `MVIX_*`
    /// variables, then the plain `HOST`, `PORT` and `DEBUG` variables.
    pub fn load_from(root: &Path, env: &HashMap<String, String>) -> Result<Self, config::ConfigError> {
        let debug = env.get("DEBUG").is_some_and(|v| !v.is_empty());

        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("logging.debug", false)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 75)?
            .set_default("http.server_name", "mvix")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("game.target_file", "main.js")?
            .set_default("game.save_file", "mvix.json")?
            .set_default("browser.open", true)?
            .add_source(config::File::from(root.join(CONFIG_FILE_NAME)).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            )
            .set_override_option("server.host", env.get("HOST").cloned())?
            .set_override_option("server.port", env.get("PORT").cloned())?
            .set_override_option("logging.debug", debug.then_some(true))?
            .build()?;

        settings.try_deserialize()
    }

    /// Listen address; hostnames such as `localhost` are looked up once here
    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        let host = self.server.host.as_str();
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.server.port));
        }

        (host, self.server.port)
            .to_socket_addrs()
            .map_err(|e| format!("Invalid address '{host}': {e}"))?
            .next()
            .ok_or_else(|| format!("Invalid address '{host}': no addresses found"))
    }

    /// Resolve the configured file locations against the game root
    pub fn game_paths(&self, root: &Path) -> GamePaths {
        let patches_dir = match &self.game.patches_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => default_patches_dir().unwrap_or_else(|| root.join("patches")),
        };

        GamePaths {
            root: root.to_path_buf(),
            save_file: root.join(&self.game.save_file),
            patches_dir,
        }
    }
}

/// `patches/` next to the running executable
fn default_patches_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(|dir| dir.join("patches"))
}
