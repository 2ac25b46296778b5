//! # Anim Host
//!
//! 无界面动画驱动器。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p anim-host
//! cargo run -p anim-host -- --config anim-host/assets/config.json
//! cargo run -p anim-host -- --library anim-host/assets/animations.json --animation bounce --fps 30
//! cargo run -p anim-host -- --animation entrance --time-scale 2 --verbose
//! ```
//!
//! 最终精灵状态以 JSON 输出到 stdout，日志输出到 stderr。

use std::path::PathBuf;

use anim_host::config::HostConfig;
use anim_host::simulate;
use anim_runtime::{AnimationLibrary, DiagnosticLevel, check_library_json};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "anim-host")]
#[command(about = "无界面动画驱动器 - 用模拟帧时钟播放动画库中的动画")]
#[command(version)]
struct Cli {
    /// 配置文件路径（不指定则使用默认配置）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 动画库文件路径
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// 要播放的动画名称
    #[arg(short, long)]
    animation: Option<String>,

    /// 模拟帧率
    #[arg(long)]
    fps: Option<u32>,

    /// 最长模拟时长（秒）
    #[arg(long)]
    seconds: Option<f64>,

    /// 时间缩放
    #[arg(long)]
    time_scale: Option<f64>,

    /// 输出完整模拟报告（而不只是精灵状态）
    #[arg(long)]
    report: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// 命令行参数覆盖配置文件
    fn apply(&self, config: &mut HostConfig) {
        if let Some(library) = &self.library {
            config.library = library.clone();
        }
        if let Some(animation) = &self.animation {
            config.animation = animation.clone();
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(seconds) = self.seconds {
            config.seconds = seconds;
        }
        if let Some(time_scale) = self.time_scale {
            config.time_scale = time_scale;
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("无法加载配置文件 {}", path.display()))?,
        None => HostConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    tracing_subscriber::fmt()
        .with_max_level(config.level()?)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .init();

    info!(
        library = %config.library.display(),
        animation = %config.animation,
        fps = config.fps,
        "开始模拟"
    );

    let text = std::fs::read_to_string(&config.library)
        .with_context(|| format!("无法读取动画库 {}", config.library.display()))?;

    if config.library_check {
        report_diagnostics(&config.library.display().to_string(), &text);
    }

    let mut library = AnimationLibrary::new();
    library
        .load_json(&text)
        .with_context(|| format!("动画库无效: {}", config.library.display()))?;
    simulate::ensure_animation(&library, &config.animation)?;

    let report = simulate::run(&config, &library)
        .with_context(|| format!("动画 '{}' 执行失败", config.animation))?;
    if !report.completed {
        warn!(
            frames = report.frames,
            seconds = config.seconds,
            "动画未在时限内完成"
        );
    }

    let output = if cli.report {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.sprite)?
    };
    println!("{}", output);
    Ok(())
}

/// 输出动画库检查结果（不阻塞运行）
fn report_diagnostics(source_id: &str, text: &str) {
    let result = check_library_json(source_id, text);
    for diagnostic in &result.diagnostics {
        match diagnostic.level {
            DiagnosticLevel::Error => error!("{}", diagnostic),
            DiagnosticLevel::Warn => warn!("{}", diagnostic),
            DiagnosticLevel::Info => info!("{}", diagnostic),
        }
    }
    if !result.is_empty() {
        info!(
            errors = result.error_count(),
            warnings = result.warn_count(),
            "动画库检查完成"
        );
    }
}
