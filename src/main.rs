//! # 去背景工具：命令行入口
//!
//! 本文件仅负责参数解析、配置合并与并发调度。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use background_remover::error::AppError;
use background_remover::removal::{
    FileReport, MediaType, Operation, PerformanceProfile, ProcessingOptions, RemovalService,
};
use background_remover::settings;
use clap::{Parser, ValueEnum};
use tokio::task::JoinSet;

/// Remove flat backgrounds from images
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Input image files (JPEG, PNG or WebP)
    #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// Output directory (default: next to each input)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    out_dir: Option<PathBuf>,

    /// Operation to run on every input
    #[arg(short, long, value_enum, default_value_t = Mode::Remove)]
    mode: Mode,

    /// Color distance below which a pixel counts as background
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Output quality for lossy formats, in [0, 1]
    #[arg(short, long)]
    quality: Option<f64>,

    /// Performance profile: quality, balanced or speed
    #[arg(short, long, value_parser = PerformanceProfile::parse)]
    profile: Option<PerformanceProfile>,

    /// JSON settings file overriding the defaults (ignored when missing)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Write the effective settings to this JSON file before processing
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    save_config: Option<PathBuf>,

    /// Print progress events as JSON lines on stdout
    #[arg(long)]
    json_progress: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Remove,
    Grayscale,
    Edges,
}

impl Mode {
    fn operation(self) -> Operation {
        match self {
            Self::Remove => Operation::RemoveBackground,
            Self::Grayscale => Operation::Grayscale,
            Self::Edges => Operation::EdgeMap,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Remove => "nobg",
            Self::Grayscale => "gray",
            Self::Edges => "edges",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Png,
    Jpeg,
    Webp,
}

impl From<Format> for MediaType {
    fn from(format: Format) -> Self {
        match format {
            Format::Png => MediaType::Png,
            Format::Jpeg => MediaType::Jpeg,
            Format::Webp => MediaType::Webp,
        }
    }
}

/// 设置文件 → 档位 → 单项参数，后者覆盖前者。
fn build_options(cli: &Cli) -> Result<ProcessingOptions, AppError> {
    let mut options = match &cli.config {
        Some(path) => settings::load_options_or_default(path)?,
        None => ProcessingOptions::default(),
    };

    if let Some(profile) = cli.profile {
        options.apply_performance_profile(profile);
    }
    if let Some(tolerance) = cli.tolerance {
        options.color_tolerance = tolerance;
    }
    if let Some(format) = cli.format {
        options.output_media_type = format.into();
    }
    if let Some(quality) = cli.quality {
        options.output_quality = quality;
    }

    options.validate()?;
    Ok(options)
}

fn output_path(input: &Path, out_dir: Option<&Path>, mode: Mode, media_type: MediaType) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let file_name = format!("{}-{}.{}", stem, mode.suffix(), media_type.extension());

    match out_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

async fn run(cli: Cli) -> Result<bool, AppError> {
    let options = build_options(&cli)?;
    if let Some(path) = &cli.save_config {
        settings::save_options(path, &options)?;
        log::info!("💾 已保存设置文件：{}", path.display());
    }
    let media_type = options.output_media_type;
    let service = Arc::new(RemovalService::new(options)?);

    log::info!("🚀 开始处理 {} 个文件（模式: {:?}）", cli.inputs.len(), cli.mode);

    let mut tasks: JoinSet<(PathBuf, Result<FileReport, AppError>)> = JoinSet::new();
    for (index, input) in cli.inputs.iter().cloned().enumerate() {
        let service = Arc::clone(&service);
        let output = output_path(&input, cli.out_dir.as_deref(), cli.mode, media_type);
        let operation = cli.mode.operation();
        let json_progress = cli.json_progress;
        let request_id = format!("{}-{}", index, input.display());

        tasks.spawn(async move {
            let result = service
                .process_file_with(&request_id, &input, &output, operation, move |event| {
                    if json_progress {
                        match serde_json::to_string(&event) {
                            Ok(line) => println!("{}", line),
                            Err(err) => log::warn!("进度事件序列化失败: {}", err),
                        }
                    }
                })
                .await;
            (input, result)
        });
    }

    let mut all_ok = true;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((input, Ok(report))) => {
                let background = report
                    .background
                    .map(|c| format!(" 背景 {}", c.to_hex()))
                    .unwrap_or_default();
                log::info!(
                    "✅ {} -> {}（{}x{}{}）",
                    input.display(),
                    report.output.display(),
                    report.width,
                    report.height,
                    background
                );
            }
            Ok((input, Err(err))) => {
                all_ok = false;
                eprintln!("{}: {}", input.display(), err);
            }
            Err(err) => {
                all_ok = false;
                eprintln!("{}", AppError::Task(err.to_string()));
            }
        }
    }

    Ok(all_ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
