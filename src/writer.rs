//! Artifact persistence.
//!
//! Two overwrite policies live here and must stay separate:
//! - primary tables are refused when they already exist, unless forced;
//! - stubs are written once and then never touched again, forced or not.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::ast::SchemaArtifact;
use crate::error::{GlyphError, GlyphResult};

/// Environment variable that forces overwriting primary tables.
pub const FORCE_ENV: &str = "GLYPH_FORCE";

/// File extension of written artifacts.
pub const ARTIFACT_EXTENSION: &str = "json";

/// Overwrite permission for primary tables: the `--force` flag OR'd with
/// [`FORCE_ENV`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Force {
    pub flag: bool,
    pub env: bool,
}

impl Force {
    /// Read [`FORCE_ENV`] from the process environment.
    ///
    /// Call this before command-line parsing so the variable can never
    /// change how positional arguments are read.
    pub fn from_env() -> Self {
        Self {
            flag: false,
            env: env_truthy(std::env::var(FORCE_ENV).ok().as_deref()),
        }
    }

    pub fn with_flag(self, flag: bool) -> Self {
        Self {
            flag: self.flag || flag,
            ..self
        }
    }

    pub fn is_set(&self) -> bool {
        self.flag || self.env
    }
}

/// `1`, `true`, `yes`, `on` (any case) are truthy; everything else is not.
pub fn env_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// How to treat an artifact that is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Fail with [`GlyphError::NameCollision`].
    Refuse,
    /// Atomically replace it.
    Replace,
    /// Leave it alone and report [`WriteOutcome::Kept`].
    Keep,
}

impl OverwritePolicy {
    /// Policy for the table being defined.
    pub fn primary(force: Force) -> Self {
        if force.is_set() { Self::Replace } else { Self::Refuse }
    }

    /// Policy for stubs: write once, never regenerate. Takes no force.
    pub fn stub() -> Self {
        Self::Keep
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Replaced,
    Kept,
}

/// A directory of `<table>.json` artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", table, ARTIFACT_EXTENSION))
    }

    pub fn exists(&self, table: &str) -> bool {
        self.path_for(table).exists()
    }

    /// Load a previously written artifact.
    pub fn read(&self, table: &str) -> GlyphResult<SchemaArtifact> {
        let path = self.path_for(table);
        let content = std::fs::read_to_string(&path).map_err(|e| GlyphError::fs(&path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            GlyphError::fs(
                &path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Serialize fully in memory, stage in a temp file next to the target,
    /// then persist in one step.
    pub fn write(
        &self,
        artifact: &SchemaArtifact,
        policy: OverwritePolicy,
    ) -> GlyphResult<WriteOutcome> {
        let path = self.path_for(&artifact.table);
        let existed = path.exists();

        if existed {
            match policy {
                OverwritePolicy::Refuse => {
                    warn!(table = %artifact.table, path = %path.display(), "refusing to overwrite");
                    return Err(GlyphError::NameCollision {
                        table: artifact.table.clone(),
                        path,
                    });
                }
                OverwritePolicy::Keep => {
                    debug!(table = %artifact.table, "artifact exists, keeping it");
                    return Ok(WriteOutcome::Kept);
                }
                OverwritePolicy::Replace => {}
            }
        }

        let mut body = serde_json::to_string_pretty(artifact).map_err(|e| {
            GlyphError::fs(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        body.push('\n');

        std::fs::create_dir_all(&self.dir).map_err(|e| GlyphError::fs(&self.dir, e))?;
        let mut staged =
            NamedTempFile::new_in(&self.dir).map_err(|e| GlyphError::fs(&self.dir, e))?;
        staged
            .write_all(body.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| GlyphError::fs(staged.path(), e))?;

        match policy {
            OverwritePolicy::Replace => {
                staged
                    .persist(&path)
                    .map_err(|e| GlyphError::fs(&path, e.error))?;
                Ok(if existed {
                    WriteOutcome::Replaced
                } else {
                    WriteOutcome::Created
                })
            }
            OverwritePolicy::Refuse | OverwritePolicy::Keep => {
                match staged.persist_noclobber(&path) {
                    Ok(_) => Ok(WriteOutcome::Created),
                    // another writer created it after the exists() check
                    Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                        if policy == OverwritePolicy::Keep {
                            Ok(WriteOutcome::Kept)
                        } else {
                            Err(GlyphError::NameCollision {
                                table: artifact.table.clone(),
                                path,
                            })
                        }
                    }
                    Err(e) => Err(GlyphError::fs(&path, e.error)),
                }
            }
        }
    }
}
