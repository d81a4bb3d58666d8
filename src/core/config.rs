use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::ConfigError;

pub const APP_DIR: &str = ".bandheap";
pub const HOME_ENV: &str = "BANDHEAP_HOME";
pub const SETTINGS_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Candidate data files, in priority order. `~` is expanded.
    pub data_paths: Vec<String>,
    /// Extra directories searched for scripts after the built-in ones.
    #[serde(default)]
    pub script_dirs: Vec<String>,
}

impl Settings {
    pub fn defaults() -> Self {
        Self {
            data_paths: vec![
                format!("~/{}/data.txt", APP_DIR),
                format!("~/{}/backup.txt", APP_DIR),
            ],
            script_dirs: Vec::new(),
        }
    }

    pub fn with_data_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_paths: paths.into_iter().map(Into::into).collect(),
            script_dirs: Vec::new(),
        }
    }

    /// `$BANDHEAP_HOME` if set, otherwise `~/.bandheap`.
    pub fn base_dir() -> Result<PathBuf, ConfigError> {
        if let Ok(custom) = std::env::var(HOME_ENV) {
            if !custom.trim().is_empty() {
                return Ok(resolve_path(&custom));
            }
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(APP_DIR))
    }

    /// Reads `config.json` from `base`, writing the defaults first if the
    /// file does not exist yet.
    pub fn load_or_create(base: &Path) -> Result<Self, ConfigError> {
        let path = base.join(SETTINGS_FILE);
        if !path.exists() {
            let settings = Self::defaults();
            settings.write(&path)?;
            debug!(path = %path.display(), "created default settings");
            return Ok(settings);
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut settings: Settings = match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "invalid settings file, using defaults");
                return Ok(Self::defaults());
            }
        };

        settings.data_paths.retain(|p| !p.trim().is_empty());
        if settings.data_paths.is_empty() {
            warn!(path = %path.display(), "settings list no data paths, using defaults");
            settings.data_paths = Self::defaults().data_paths;
        }
        Ok(settings)
    }

    fn write(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        // Serializing plain strings cannot fail
        let json = serde_json::to_string_pretty(self).unwrap_or_default();
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn data_paths(&self) -> DataPaths {
        DataPaths::new(self.data_paths.iter().map(|p| resolve_path(p)).collect())
    }

    /// Directories searched for a script named by `argument`, in order.
    pub fn script_search_dirs(&self, argument: &str) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(parent) = Path::new(&*shellexpand::tilde(argument)).parent() {
            if !parent.as_os_str().is_empty() {
                dirs.push(absolute(parent));
            }
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        dirs.push(cwd.clone());
        for relative in ["scripts", "..", "../scripts", "../../scripts"] {
            dirs.push(cwd.join(relative));
        }
        dirs.extend(self.script_dirs.iter().map(|d| resolve_path(d)));
        dirs
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Expands `~` and makes the path absolute against the working directory.
pub fn resolve_path(raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw.trim());
    absolute(Path::new(expanded.as_ref()))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Ordered candidate data files.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    candidates: Vec<PathBuf>,
}

impl DataPaths {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    fn fallback(&self) -> PathBuf {
        self.candidates.first().cloned().unwrap_or_else(|| {
            resolve_path(&format!("~/{}/data.txt", APP_DIR))
        })
    }

    /// First candidate that exists and can be opened, else the first one.
    pub fn first_readable(&self) -> PathBuf {
        self.candidates
            .iter()
            .find(|path| path.is_file() && fs::File::open(path).is_ok())
            .cloned()
            .unwrap_or_else(|| self.fallback())
    }

    /// First candidate that is writable itself or sits in a writable
    /// directory, else the first one.
    pub fn first_writable(&self) -> PathBuf {
        self.candidates
            .iter()
            .find(|path| {
                if path.exists() {
                    return is_writable(path);
                }
                path.parent().is_some_and(|dir| dir.is_dir() && is_writable(dir))
            })
            .cloned()
            .unwrap_or_else(|| self.fallback())
    }
}

fn is_writable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}
