//! # Config 模块
//!
//! 驱动器配置，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anim_runtime::{Image, Value, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 驱动器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// 动画库文件路径
    #[serde(default = "default_library")]
    pub library: PathBuf,

    /// 要播放的动画名称
    #[serde(default = "default_animation")]
    pub animation: String,

    /// 模拟帧率
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// 最长模拟时长（秒），动画提前结束时提前停止
    #[serde(default = "default_seconds")]
    pub seconds: f64,

    /// Track 的时间缩放
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 启动时是否检查动画库
    ///
    /// debug build 默认开启，检查结果只输出诊断，不阻塞运行。
    #[serde(default = "default_library_check")]
    pub library_check: bool,

    /// 精灵初始状态
    #[serde(default)]
    pub sprite: SpriteConfig,
}

/// 精灵配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpriteConfig {
    /// 初始位置
    #[serde(default = "default_position")]
    pub position: Vec2,

    /// 包围盒尺寸
    #[serde(default = "default_size")]
    pub size: Vec2,

    /// 初始图像
    #[serde(default)]
    pub image: Option<Image>,

    /// 旋转枢轴偏移（不设置则没有枢轴）
    #[serde(default)]
    pub pivot: Option<Vec2>,

    /// 命名图像序列
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<Image>>,

    /// 自定义属性初始值
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            position: default_position(),
            size: default_size(),
            image: None,
            pivot: None,
            sources: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }
}

// 默认值函数
fn default_library() -> PathBuf {
    PathBuf::from("assets/animations.json")
}

fn default_animation() -> String {
    "entrance".to_string()
}

fn default_fps() -> u32 {
    60
}

fn default_seconds() -> f64 {
    10.0
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_library_check() -> bool {
    cfg!(debug_assertions)
}

fn default_position() -> Vec2 {
    Vec2::new(320.0, 240.0)
}

fn default_size() -> Vec2 {
    Vec2::new(32.0, 32.0)
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            library: default_library(),
            animation: default_animation(),
            fps: default_fps(),
            seconds: default_seconds(),
            time_scale: default_time_scale(),
            log_level: default_log_level(),
            library_check: default_library_check(),
            sprite: SpriteConfig::default(),
        }
    }
}

impl HostConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；读取或解析失败时返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        info!(path = %path.display(), "配置文件加载成功");
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;
        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.animation.is_empty() {
            return Err(ConfigError::Validation("必须配置 animation（动画名称）".to_string()));
        }

        if self.fps == 0 {
            return Err(ConfigError::Validation("帧率必须大于 0".to_string()));
        }

        if !(self.seconds.is_finite() && self.seconds >= 0.0) {
            return Err(ConfigError::Validation(format!(
                "模拟时长无效: {}",
                self.seconds
            )));
        }

        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            return Err(ConfigError::Validation(format!(
                "时间缩放必须为正数: {}",
                self.time_scale
            )));
        }

        self.level()?;
        Ok(())
    }

    /// 解析日志级别
    pub fn level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Validation(format!("未知日志级别: {}", self.log_level)))
    }

    /// 最多模拟的帧数
    pub fn max_frames(&self) -> u64 {
        (self.seconds * f64::from(self.fps)).ceil() as u64
    }
}

/// 配置错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    Serialization(String),
    /// 解析失败
    #[error("配置解析失败: {0}")]
    Parse(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    Validation(String),
}
