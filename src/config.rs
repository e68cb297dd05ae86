use std::ffi::OsString;
use std::path::{Path, PathBuf};

use remote_tray_core::{ClientState, TrayAttributes};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use winit::icon::Icon;

use crate::error::HarnessError;

pub const CONFIG_VAR: &str = "REMOTE_TRAY_CONFIG";
pub const BACKEND_VAR: &str = "REMOTE_TRAY_BACKEND";
pub const STATE_VAR: &str = "REMOTE_TRAY_STATE";
pub const ICON_PATH_VAR: &str = "REMOTE_TRAY_ICON_PATH";

/// Settings of the tray harness. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub app_id: u32,
    pub title: String,
    /// Defaults to the title.
    pub tooltip: Option<String>,
    pub icon_name: String,
    /// Searched before the built-in icon directories.
    pub icon_dirs: Vec<PathBuf>,
    /// Only try the tray backend with this name.
    pub backend: Option<String>,
    /// JSON file overriding fields of the fake client state.
    pub state_file: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            app_id: 0,
            title: "Test System Tray".to_string(),
            tooltip: None,
            icon_name: "xpra".to_string(),
            icon_dirs: Vec::new(),
            backend: None,
            state_file: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_vars(|key| std::env::var_os(key))
    }

    /// JSON configuration file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        read_json(path)
    }

    /// Build the configuration from a variable lookup: the `CONFIG_VAR` file when set, then the
    /// remaining variables on top. Empty values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self, HarnessError> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config = match lookup(CONFIG_VAR) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(backend) = lookup(BACKEND_VAR) {
            config.backend = Some(backend.to_string_lossy().into_owned());
        }
        if let Some(path) = lookup(STATE_VAR) {
            config.state_file = Some(PathBuf::from(path));
        }
        if let Some(paths) = lookup(ICON_PATH_VAR) {
            config.icon_dirs = std::env::split_paths(&paths).collect();
        }
        debug!(?config, "harness configuration");
        Ok(config)
    }

    /// The fake client state: defaults, overridden by the state file when one is configured.
    pub fn load_client_state(&self) -> Result<ClientState, HarnessError> {
        match &self.state_file {
            Some(path) => load_state_file(path),
            None => Ok(ClientState::default()),
        }
    }

    pub fn tray_attributes(&self, icon: Option<Icon>) -> TrayAttributes {
        let attributes = TrayAttributes::default()
            .with_app_id(self.app_id)
            .with_title(self.title.clone())
            .with_icon(self.icon_name.clone(), icon);
        match &self.tooltip {
            Some(tooltip) => attributes.with_tooltip(tooltip.clone()),
            None => attributes,
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, HarnessError> {
    let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| HarnessError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn load_state_file(path: &Path) -> Result<ClientState, HarnessError> {
    let state: ClientState = read_json(path)?;
    state.validate()?;
    for pair in state.inconsistent_pairs() {
        warn!(pair, "feature enabled but not allowed by the server; treated as inactive");
    }
    Ok(state)
}
