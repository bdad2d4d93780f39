//! YAML profile holding remote scope and transport settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.roster/               (mode 0700)
//!   config.yaml            (mode 0600, may contain a bearer token)
//! ```
//!
//! # API pattern
//!
//! Every filesystem function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Level, LevelId};

pub const DEFAULT_BASE_URL: &str = "https://www.uno-internacional.com/pegasus-api";
pub const DEFAULT_EMPRESA_ID: u64 = 11;
pub const DEFAULT_CICLO_ID: u64 = 207;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Keys accepted by [`Profile::set`].
pub const PROFILE_KEYS: &[&str] = &[
    "base_url",
    "empresa_id",
    "ciclo_id",
    "colegio_id",
    "timeout_secs",
    "token",
    "nivel.inicial",
    "nivel.primaria",
    "nivel.secundaria",
];

/// Level → remote `nivelId` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelIdMap {
    pub inicial: LevelId,
    pub primaria: LevelId,
    pub secundaria: LevelId,
}

impl Default for LevelIdMap {
    fn default() -> Self {
        Self {
            inicial: LevelId(38),
            primaria: LevelId(39),
            secundaria: LevelId(40),
        }
    }
}

impl LevelIdMap {
    pub fn id(&self, level: Level) -> LevelId {
        match level {
            Level::Inicial => self.inicial,
            Level::Primaria => self.primaria,
            Level::Secundaria => self.secundaria,
        }
    }

    pub fn level(&self, id: LevelId) -> Option<Level> {
        Level::all().iter().copied().find(|l| self.id(*l) == id)
    }

    pub fn as_map(&self) -> BTreeMap<Level, LevelId> {
        Level::all().iter().map(|l| (*l, self.id(*l))).collect()
    }
}

/// Persisted settings for talking to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_empresa_id")]
    pub empresa_id: u64,
    #[serde(default = "default_ciclo_id")]
    pub ciclo_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colegio_id: Option<u64>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub level_ids: LevelIdMap,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_empresa_id() -> u64 {
    DEFAULT_EMPRESA_ID
}
fn default_ciclo_id() -> u64 {
    DEFAULT_CICLO_ID
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            empresa_id: DEFAULT_EMPRESA_ID,
            ciclo_id: DEFAULT_CICLO_ID,
            colegio_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: None,
            level_ids: LevelIdMap::default(),
        }
    }
}

impl Profile {
    /// Set one key from its textual value (`roster config set <key> <value>`).
    ///
    /// An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let number = || value.trim().parse::<u64>().map_err(|_| invalid());
        match key {
            "base_url" => {
                let url = value.trim().trim_end_matches('/');
                if url.is_empty() {
                    return Err(invalid());
                }
                self.base_url = url.to_string();
            }
            "empresa_id" => self.empresa_id = number()?,
            "ciclo_id" => self.ciclo_id = number()?,
            "colegio_id" if value.trim().is_empty() => self.colegio_id = None,
            "colegio_id" => self.colegio_id = Some(number()?),
            "timeout_secs" => match number()? {
                0 => return Err(invalid()),
                secs => self.timeout_secs = secs,
            },
            "token" if value.trim().is_empty() => self.token = None,
            "token" => self.token = Some(value.trim().to_string()),
            "nivel.inicial" => self.level_ids.inicial = LevelId(number()?),
            "nivel.primaria" => self.level_ids.primaria = LevelId(number()?),
            "nivel.secundaria" => self.level_ids.secundaria = LevelId(number()?),
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                    expected: PROFILE_KEYS.join(", "),
                })
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.roster/`: pure, no I/O.
pub fn roster_dir_at(home: &Path) -> PathBuf {
    home.join(".roster")
}

/// `<home>/.roster/config.yaml`: pure, no I/O.
pub fn profile_path_at(home: &Path) -> PathBuf {
    roster_dir_at(home).join("config.yaml")
}

/// `<home>/.roster/`, created with mode `0700` if missing.
pub fn ensure_roster_dir_at(home: &Path) -> Result<PathBuf, ConfigError> {
    let dir = roster_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the profile, or [`Profile::default`] when no file exists yet.
///
/// Returns `ConfigError::Parse` (with path) if the YAML is malformed.
pub fn load_at(home: &Path) -> Result<Profile, ConfigError> {
    let path = profile_path_at(home);
    if !path.exists() {
        return Ok(Profile::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Profile, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the profile to `<home>/.roster/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, profile: &Profile) -> Result<PathBuf, ConfigError> {
    ensure_roster_dir_at(home)?;
    let path = profile_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(profile)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(profile: &Profile) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, profile)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
