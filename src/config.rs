use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CONFIG_FILE: &str = "navsync.toml";
pub const DEFAULT_LAYOUT: &str = "packages/config/navigation/layout.tsx";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip)]
    pub root: PathBuf,
    pub layout: PathBuf,
    pub features: PathBuf,
    pub native_app: PathBuf,
    pub web_app: PathBuf,
    pub root_declaration: String,
    pub root_navigator: String,
    pub import_prefix: String,
    pub debounce_ms: u64,
    pub commit: CommitConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CommitConfig {
    pub enabled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            layout: PathBuf::from(DEFAULT_LAYOUT),
            features: PathBuf::from("packages/core/features"),
            native_app: PathBuf::from("apps/expo/app"),
            web_app: PathBuf::from("apps/web/app"),
            root_declaration: "appNavigationStructure".to_string(),
            root_navigator: "Root".to_string(),
            import_prefix: "#features".to_string(),
            debounce_ms: 1000,
            commit: CommitConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            message: "sync: navigation structure & files".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4817,
        }
    }
}

impl Config {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub async fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = match fs::read_to_string(&path).await {
            Ok(content) => toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        config.root = root.to_path_buf();
        Ok(config)
    }

    pub fn layout_path(&self) -> PathBuf {
        self.root.join(&self.layout)
    }

    pub fn features_dir(&self) -> PathBuf {
        self.root.join(&self.features)
    }

    pub fn native_dir(&self) -> PathBuf {
        self.root.join(&self.native_app)
    }

    pub fn web_dir(&self) -> PathBuf {
        self.root.join(&self.web_app)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".navsync")
    }

    pub fn conventions(&self) -> Conventions {
        Conventions {
            root_declaration: self.root_declaration.clone(),
            root_navigator: self.root_navigator.clone(),
            import_prefix: self.import_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    pub root_declaration: String,
    pub root_navigator: String,
    pub import_prefix: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Config::default().conventions()
    }
}

