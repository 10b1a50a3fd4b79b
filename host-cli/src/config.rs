//! # Config 模块
//!
//! 终端宿主的配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use dialogue_runtime::RunnerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, info, warn};

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 资源根目录
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,

    /// 存档目录（完成记录写在这里）
    #[serde(default = "default_saves_dir")]
    pub saves_dir: PathBuf,

    /// 对话图目录（相对于 assets_root）
    #[serde(default = "default_dialogue_dir")]
    pub dialogue_dir: String,

    /// 默认的世界种子（相对于 assets_root）
    #[serde(default)]
    pub world_seed: Option<String>,

    /// 日志级别：trace / debug / info / warn / error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 对话结束后打印回看记录
    #[serde(default)]
    pub show_history: bool,

    /// 引擎配置
    #[serde(default)]
    pub runner: RunnerConfig,
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_saves_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_dialogue_dir() -> String {
    "dialogue".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assets_root: default_assets_root(),
            saves_dir: default_saves_dir(),
            dialogue_dir: default_dialogue_dir(),
            world_seed: None,
            log_level: default_log_level(),
            show_history: false,
            runner: RunnerConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// 对话图目录的完整路径
    pub fn dialogue_full_path(&self) -> PathBuf {
        self.assets_root.join(&self.dialogue_dir)
    }

    /// 世界种子的完整路径
    pub fn world_seed_full_path(&self) -> Option<PathBuf> {
        self.world_seed
            .as_ref()
            .map(|seed| self.assets_root.join(seed))
    }

    /// 解析日志级别（大小写不敏感）
    pub fn log_level(&self) -> Result<Level, ConfigError> {
        self.log_level.parse::<Level>().map_err(|_| {
            ConfigError::ValidationFailed(format!("未知的日志级别: {}", self.log_level))
        })
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log_level()?;

        if self.runner.max_silent_chain == 0 {
            return Err(ConfigError::ValidationFailed(
                "runner.max_silent_chain 必须大于 0".to_string(),
            ));
        }

        if let Some(seed) = self.world_seed_full_path()
            && !seed.exists()
        {
            return Err(ConfigError::ValidationFailed(format!(
                "世界种子不存在: {}",
                seed.display()
            )));
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),

    #[error("配置 IO 错误: {0}")]
    IoError(String),

    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
