// ==========================================
// 主数据 ETL - 运行配置
// ==========================================
// 来源: 环境变量（MFT_*），缺省值兜底
// 优先级: 命令行参数 > 环境变量 > 默认值
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ===== 环境变量名 =====
pub const ENV_DB_PATH: &str = "MFT_DB_PATH";
pub const ENV_DB_MAX_RETRIES: &str = "MFT_DB_MAX_RETRIES";
pub const ENV_DB_RETRY_DELAY_MS: &str = "MFT_DB_RETRY_DELAY_MS";
pub const ENV_DB_BUSY_TIMEOUT_MS: &str = "MFT_DB_BUSY_TIMEOUT_MS";
pub const ENV_TRUNCATE_BEFORE_LOAD: &str = "MFT_TRUNCATE_BEFORE_LOAD";
pub const ENV_CLEANUP_SOURCE: &str = "MFT_CLEANUP_SOURCE";

// ===== 默认值 =====
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DB_DIR_NAME: &str = "mft-etl";
const DB_FILE_NAME: &str = "mft.db";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("配置项取值无效 ({key}={value}): {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("数据库路径为空")]
    EmptyDbPath,
}

/// ETL 运行配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlConfig {
    pub db_path: PathBuf,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub busy_timeout_ms: u64,
    pub truncate_before_load: bool,
    pub cleanup_source: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            truncate_before_load: true,
            cleanup_source: false,
        }
    }
}

impl EtlConfig {
    /// 从进程环境变量读取
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取（空白值视为未设置）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(v) = get(ENV_DB_MAX_RETRIES) {
            config.max_retries = parse_number(ENV_DB_MAX_RETRIES, &v)?;
        }
        if let Some(v) = get(ENV_DB_RETRY_DELAY_MS) {
            config.retry_delay_ms = parse_number(ENV_DB_RETRY_DELAY_MS, &v)?;
        }
        if let Some(v) = get(ENV_DB_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = parse_number(ENV_DB_BUSY_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = get(ENV_TRUNCATE_BEFORE_LOAD) {
            config.truncate_before_load = parse_bool(ENV_TRUNCATE_BEFORE_LOAD, &v)?;
        }
        if let Some(v) = get(ENV_CLEANUP_SOURCE) {
            config.cleanup_source = parse_bool(ENV_CLEANUP_SOURCE, &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: ENV_DB_MAX_RETRIES.to_string(),
                value: "0".to_string(),
                reason: "至少尝试 1 次".to_string(),
            });
        }
        Ok(())
    }

    /// 数据库路径（字符串形式，供 rusqlite 打开）
    pub fn db_path_str(&self) -> String {
        self.db_path.to_string_lossy().into_owned()
    }

    /// 运行锁文件路径: `<db>.lock`
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.db_path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

/// 默认数据库路径: `<data_local_dir>/mft-etl/mft.db`，取不到系统目录时回退到当前目录
pub fn default_db_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(DB_DIR_NAME).join(DB_FILE_NAME),
        None => PathBuf::from(DB_FILE_NAME),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "应为 true/false".to_string(),
        }),
    }
}
