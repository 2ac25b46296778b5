//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 anim-runtime 覆盖率
//! - `anim-check`: 检查动画库文件（指令类型、参数、缓动、delay 引用）

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anim_runtime::{DiagnosticResult, check_library_json};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "开发辅助工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行 fmt、clippy、test 门禁检查
    CheckAll,

    /// 运行 anim-runtime 覆盖率报告
    CovRuntime,

    /// 检查动画库文件
    ///
    /// 不带参数：检查 anim-host/assets/ 下所有动画库（config.json 除外）
    AnimCheck {
        /// 动画库文件或目录
        path: Option<PathBuf>,

        /// 以 JSON 输出汇总
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    match cli.command {
        Commands::CheckAll => {
            eprintln!("\n==> cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;

            eprintln!("\n==> cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

            eprintln!("\n==> cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;
        }
        Commands::CovRuntime => {
            if cmd!(sh, "cargo llvm-cov --version").quiet().run().is_err() {
                anyhow::bail!(
                    "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
                );
            }

            eprintln!("\n==> cargo llvm-cov -p anim-runtime --html");
            cmd!(sh, "cargo llvm-cov -p anim-runtime --html").run()?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        Commands::AnimCheck { path, json } => anim_check(path.as_deref(), json)?,
    }

    Ok(())
}

//=============================================================================
// anim-check 命令实现
//=============================================================================

/// 默认检查目录（相对于 workspace root）
const DEFAULT_ASSETS_DIR: &str = "anim-host/assets";

/// 不是动画库的 JSON 文件
const SKIPPED_FILES: &[&str] = &["config.json"];

/// 执行动画库检查
fn anim_check(path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let files = match path {
        Some(path) if path.is_file() => vec![path.to_path_buf()],
        Some(path) if path.is_dir() => collect_library_files(path),
        Some(path) => anyhow::bail!("路径不存在: {}", path.display()),
        None => {
            let dir = Path::new(DEFAULT_ASSETS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认目录不存在: {}\n请在 workspace 根目录运行，或指定动画库路径",
                    dir.display()
                );
            }
            collect_library_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到动画库文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个动画库文件...\n", files.len());

    let mut diagnostics = DiagnosticResult::new();
    let mut unreadable = 0;
    for file in &files {
        let source_id = file.display().to_string();
        match std::fs::read_to_string(file) {
            Ok(text) => diagnostics.merge(check_library_json(&source_id, &text)),
            Err(e) => {
                eprintln!("[ERROR] {}: 无法读取文件 - {}", source_id, e);
                unreadable += 1;
            }
        }
    }

    let error_count = unreadable + diagnostics.error_count();
    let warn_count = diagnostics.warn_count();

    if json {
        let summary = serde_json::json!({
            "files": files.len(),
            "errors": error_count,
            "warnings": warn_count,
            "diagnostics": diagnostics
                .diagnostics
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_check_result(files.len(), &diagnostics, error_count, warn_count);
    }

    if error_count > 0 {
        anyhow::bail!("动画库检查发现错误");
    }
    Ok(())
}

/// 收集目录下的所有动画库文件
fn collect_library_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_none_or(|name| !SKIPPED_FILES.contains(&name))
        })
        .collect();
    files.sort();
    files
}

/// 输出检查结果
fn print_check_result(
    file_count: usize,
    diagnostics: &DiagnosticResult,
    error_count: usize,
    warn_count: usize,
) {
    for diag in &diagnostics.diagnostics {
        eprintln!("{}", diag);
    }

    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个动画库", file_count);
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
