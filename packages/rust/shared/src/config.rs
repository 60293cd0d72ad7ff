//! Application configuration for texquiz.
//!
//! User config lives at `~/.texquiz/texquiz.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TexquizError};
use crate::style::StyleConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "texquiz.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".texquiz";

// ---------------------------------------------------------------------------
// Config structs (matching texquiz.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Page geometry, layout and rasterization settings.
    #[serde(default)]
    pub style: StyleConfig,

    /// External tool commands.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding `art/image0.png` … `art/image3.png`, the choice
    /// marker icons. Defaults to the directory of the executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<String>,
}

/// `[toolchain]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Typesetting compiler producing the intermediate document.
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Margin crop tool, run in place on the intermediate document.
    #[serde(default = "default_cropper")]
    pub cropper: String,

    /// Rasterizer turning the intermediate document into images.
    #[serde(default = "default_rasterizer")]
    pub rasterizer: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            cropper: default_cropper(),
            rasterizer: default_rasterizer(),
        }
    }
}

fn default_compiler() -> String {
    "pdflatex".into()
}
fn default_cropper() -> String {
    "pdfcrop".into()
}
fn default_rasterizer() -> String {
    "convert".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.texquiz/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TexquizError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.texquiz/texquiz.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TexquizError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TexquizError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TexquizError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TexquizError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TexquizError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
