//! `glyph.toml` project settings.
//!
//! ```toml
//! out_dir = "db/schemas"
//! fk_index = true
//! on_delete = "cascade"
//! ```
//!
//! Looked up in the current directory first, then in the user config dir
//! (`~/.config/glyph/config.toml` on Linux).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{GlyphError, GlyphResult};
use crate::types::FkAction;

pub const SETTINGS_FILE: &str = "glyph.toml";
pub const DEFAULT_OUT_DIR: &str = "schemas";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub out_dir: PathBuf,
    pub fk_index: bool,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            fk_index: true,
            on_delete: None,
            on_update: None,
        }
    }
}

impl Settings {
    /// Load the first settings file found, or defaults if there is none.
    pub fn load() -> GlyphResult<Self> {
        let candidates = [
            Some(PathBuf::from(SETTINGS_FILE)),
            dirs::config_dir().map(|d| d.join("glyph").join("config.toml")),
        ];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> GlyphResult<Self> {
        debug!(path = %path.display(), "loading settings");
        let content = std::fs::read_to_string(path).map_err(|e| GlyphError::fs(path, e))?;
        Self::parse(&content).map_err(|e| match e {
            GlyphError::InvalidArgument(msg) => {
                GlyphError::InvalidArgument(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> GlyphResult<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| GlyphError::InvalidArgument(e.to_string()))?;
        // surface bad actions at load time rather than at first use
        settings.default_on_delete()?;
        settings.default_on_update()?;
        Ok(settings)
    }

    pub fn default_on_delete(&self) -> GlyphResult<Option<FkAction>> {
        parse_action("on_delete", self.on_delete.as_deref())
    }

    pub fn default_on_update(&self) -> GlyphResult<Option<FkAction>> {
        parse_action("on_update", self.on_update.as_deref())
    }
}

/// Parse an optional referential action from a flag or setting.
pub fn parse_action(what: &str, value: Option<&str>) -> GlyphResult<Option<FkAction>> {
    value
        .map(|v| {
            v.parse::<FkAction>()
                .map_err(|e| GlyphError::InvalidArgument(format!("{}: {}", what, e)))
        })
        .transpose()
}
