use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::dates::{DatePattern, DEFAULT_FORMAT};
use crate::paths::normalize_path;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "DailyNote";
const APP_NAME: &str = "dailynote";

pub const CONFIG_ENV: &str = "DAILYNOTE_CONFIG";
pub const VAULT_ENV: &str = "DAILYNOTE_VAULT";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Reads the config file, writing the defaults on first run.
    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        let file = &self.paths.config_file;
        let cfg = match fs::read_to_string(file) {
            Ok(raw) => Self::parse(&raw)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let cfg = AppConfig::default();
                let toml = toml::to_string_pretty(&cfg).context("serializing default config")?;
                fs::write(file, toml)
                    .with_context(|| format!("writing default config {}", file.display()))?;
                tracing::info!(path = %file.display(), "wrote default config");
                cfg
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", file.display()))
            }
        };
        Ok(self.resolve(cfg))
    }

    pub fn load(&self) -> Result<AppConfig> {
        let file = &self.paths.config_file;
        let raw = fs::read_to_string(file)
            .with_context(|| format!("reading config {}", file.display()))?;
        Ok(self.resolve(Self::parse(&raw)?))
    }

    fn parse(raw: &str) -> Result<AppConfig> {
        toml::from_str(raw).context("parsing config toml")
    }

    /// Settles the vault location (`DAILYNOTE_VAULT` wins over the file,
    /// the data directory is the fallback) and normalizes note settings.
    fn resolve(&self, mut cfg: AppConfig) -> AppConfig {
        if env::var_os(VAULT_ENV).is_some() || cfg.vault.is_none() {
            cfg.vault = Some(self.paths.vault_dir.clone());
        }
        cfg.notes.normalize();
        cfg
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub vault_dir: PathBuf,
    pub state_dir: PathBuf,
    pub fold_state_file: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_vault = env::var(VAULT_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = project_dirs.data_dir().to_path_buf();
        let vault_dir = override_vault.unwrap_or_else(|| data_dir.join("vault"));
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join("state"));
        let fold_state_file = state_dir.join("folds.json");

        Ok(Self {
            config_dir,
            config_file,
            data_dir,
            vault_dir,
            state_dir,
            fold_state_file,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Vault root; falls back to the data directory's `vault` folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault: Option<PathBuf>,
    pub open_in_split: bool,
    pub notes: NoteSettings,
}

impl AppConfig {
    pub fn vault_dir(&self, paths: &ConfigPaths) -> PathBuf {
        self.vault.clone().unwrap_or_else(|| paths.vault_dir.clone())
    }
}

/// Settings the note pipeline reads: naming format, folder, template,
/// birthday for age buckets and the confirmation toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteSettings {
    pub format: String,
    pub folder: String,
    pub template: String,
    /// `YYYY-MM-DD`; empty disables age buckets.
    pub birthday: String,
    pub confirm_before_create: bool,
}

impl Default for NoteSettings {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            folder: String::new(),
            template: String::new(),
            birthday: String::new(),
            confirm_before_create: true,
        }
    }
}

impl NoteSettings {
    pub fn pattern(&self) -> DatePattern {
        if self.format.trim().is_empty() {
            DatePattern::default()
        } else {
            DatePattern::new(self.format.trim())
        }
    }

    fn normalize(&mut self) {
        if self.format.trim().is_empty() {
            tracing::warn!("empty note format in config, using {DEFAULT_FORMAT}");
            self.format = DEFAULT_FORMAT.to_string();
        }
        self.folder = normalize_path(&self.folder);
        self.birthday = self.birthday.trim().to_string();
    }
}
