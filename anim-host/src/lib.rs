//! # Anim Host
//!
//! 无界面动画驱动器：加载配置与动画库，构建精灵目标，
//! 用模拟帧时钟驱动调度器，输出精灵的最终状态。

pub mod config;
pub mod simulate;

pub use config::{ConfigError, HostConfig, SpriteConfig};
pub use simulate::{SimulationReport, build_sprite, run};
