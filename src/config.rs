//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件
//!
//! The loaded [`AppConfig`] is passed explicitly to the importer, the store
//! and the server; there is no global instance.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration failure / 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// DSL import configuration / 导入配置
    pub import: ImportConfig,
    /// Search configuration / 搜索配置
    pub search: SearchConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Database file path (relative to data_dir) / 数据库文件路径
    pub db_file: String,
}

/// DSL import configuration / DSL 导入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Directory holding the DSL sources
    pub source_dir: String,
    /// Sources matching `<file_prefix>*<file_suffix>` are imported in name order
    pub file_prefix: String,
    pub file_suffix: String,
    /// Imported after the matched files when present
    pub extra_files: Vec<String>,
    /// File names containing this marker are RU→CN corpora
    pub reverse_marker: String,
    /// Text encoding label of the sources / 源文件编码
    pub encoding: String,
    /// Entries per transaction / 每批条目数
    pub batch_size: usize,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8180,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "dictionary.db".to_string(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            source_dir: "data".to_string(),
            file_prefix: "dabkrs_".to_string(),
            file_suffix: ".dsl".to_string(),
            extra_files: vec!["dabruks.dsl".to_string()],
            reverse_marker: "bruks".to_string(),
            encoding: "utf-16".to_string(),
            batch_size: 5000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ImportConfig {
    /// Source files in import order / 按导入顺序列出源文件
    ///
    /// Matching files sorted by name, then each existing extra file that was
    /// not matched already.
    pub fn source_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let dir = Path::new(&self.source_dir);
        let mut files = Vec::new();

        for entry in std::fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with(&self.file_prefix) && name.ends_with(&self.file_suffix) {
                    files.push(path);
                }
            }
        }
        files.sort();

        for extra in &self.extra_files {
            let path = dir.join(extra);
            if path.is_file() && !files.contains(&path) {
                files.push(path);
            }
        }

        Ok(files)
    }
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(config_path: &Path) -> Result<AppConfig, ConfigError> {
    if config_path.exists() {
        // Load existing config / 加载现有配置
        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;

        let config: AppConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: config_path.to_path_buf(),
                source,
            })?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        // Create default config / 创建默认配置
        let config = AppConfig::default();
        save_config(config_path, &config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config_path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: config_path.to_path_buf(),
        source,
    };

    let content = serde_json::to_string_pretty(config).map_err(|e| write_err(e.into()))?;
    std::fs::write(config_path, content).map_err(write_err)?;

    Ok(())
}
