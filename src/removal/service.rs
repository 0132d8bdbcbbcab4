//! # 服务层
//!
//! ## 设计思路
//!
//! `RemovalService` 是外壳（CLI 或其他宿主）与像素流水线之间的异步边界：
//! 文件读写走 `tokio::fs`，像素计算走阻塞线程池，避免占用异步工作线程。
//!
//! ## 实现思路
//!
//! - 每个请求以 `request_id` 注册一个取消标志，仅在调用期间存在
//! - 进度以结构化 `ProgressEvent` 推送给调用方提供的 sink
//! - 失败时进度归零，并附带阶段、错误码与错误消息

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::{
    BackgroundRemover, Color, EncodedImage, ImageCandidate, ImageSurface, ProcessingOptions,
    RasterSurface, RemovalError, media_type_for_path,
};
use crate::error::AppError;

/// 推送给外壳的进度事件。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub request_id: String,
    pub progress: u8,
    pub status: &'static str,
    pub stage: Option<&'static str>,
    pub error_code: Option<&'static str>,
    pub error_message: Option<String>,
}

impl ProgressEvent {
    fn processing(request_id: &str, progress: u8) -> Self {
        Self {
            request_id: request_id.to_string(),
            progress,
            status: "processing",
            stage: None,
            error_code: None,
            error_message: None,
        }
    }
}

/// 对单个文件执行的操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RemoveBackground,
    Grayscale,
    EdgeMap,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove",
            Self::Grayscale => "grayscale",
            Self::EdgeMap => "edges",
        }
    }
}

/// 单个文件的处理结果。
#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub operation: Operation,
    pub width: u32,
    pub height: u32,
    pub bytes_written: usize,
    pub background: Option<Color>,
    pub cleared_pixels: Option<u64>,
}

type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// 去背景服务状态。
pub struct RemovalService<S: RasterSurface + 'static = ImageSurface> {
    remover: Arc<BackgroundRemover<S>>,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl RemovalService<ImageSurface> {
    /// 使用给定配置创建服务。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use background_remover::removal::{ProcessingOptions, RemovalService};
    ///
    /// # async fn demo() -> Result<(), background_remover::error::AppError> {
    /// let service = RemovalService::new(ProcessingOptions::default())?;
    /// let report = service
    ///     .process_file("req-1", "in.jpg".as_ref(), "out.png".as_ref(), |event| {
    ///         println!("{} {}%", event.status, event.progress);
    ///     })
    ///     .await?;
    /// println!("{}x{}", report.width, report.height);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(options: ProcessingOptions) -> Result<Self, RemovalError> {
        Ok(Self::with_remover(BackgroundRemover::new(options)?))
    }
}

impl<S: RasterSurface + 'static> RemovalService<S> {
    pub fn with_remover(remover: BackgroundRemover<S>) -> Self {
        Self {
            remover: Arc::new(remover),
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn remover(&self) -> &BackgroundRemover<S> {
        &self.remover
    }

    pub async fn process_file<F>(
        &self,
        request_id: &str,
        input: &Path,
        output: &Path,
        sink: F,
    ) -> Result<FileReport, AppError>
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.process_file_with(request_id, input, output, Operation::RemoveBackground, sink)
            .await
    }

    /// 读取 → 处理 → 写出，并在结束时推送终态事件。
    pub async fn process_file_with<F>(
        &self,
        request_id: &str,
        input: &Path,
        output: &Path,
        operation: Operation,
        sink: F,
    ) -> Result<FileReport, AppError>
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        let sink: ProgressSink = Arc::new(sink);
        let cancel_flag = self.register(request_id)?;

        sink(ProgressEvent::processing(request_id, 0));

        let result = self
            .run(request_id, input, output, operation, Arc::clone(&sink), cancel_flag)
            .await;

        self.unregister(request_id)?;

        let terminal = match &result {
            Ok(_) => ProgressEvent {
                progress: 100,
                status: "completed",
                ..ProgressEvent::processing(request_id, 100)
            },
            Err(AppError::Removal(RemovalError::Cancelled)) => ProgressEvent {
                status: "cancelled",
                error_code: Some("E_CANCELLED"),
                ..ProgressEvent::processing(request_id, 0)
            },
            Err(err) => ProgressEvent {
                request_id: request_id.to_string(),
                progress: 0,
                status: "failed",
                stage: Some(err.stage()),
                error_code: Some(err.code()),
                error_message: Some(err.to_string()),
            },
        };
        sink(terminal);

        result
    }

    async fn run(
        &self,
        request_id: &str,
        input: &Path,
        output: &Path,
        operation: Operation,
        sink: ProgressSink,
        cancel_flag: Arc<AtomicBool>,
    ) -> Result<FileReport, AppError> {
        let bytes = tokio::fs::read(input).await?;
        let candidate = ImageCandidate::new(bytes, media_type_for_path(input))
            .with_source_hint(input.display().to_string());

        log::info!(
            "📥 开始处理 {}（{}，{} 字节，操作 {}）",
            request_id,
            candidate.media_type(),
            candidate.byte_len(),
            operation.as_str()
        );

        let remover = Arc::clone(&self.remover);
        let id = request_id.to_string();
        let processed = tokio::task::spawn_blocking(move || {
            run_operation(&remover, candidate, operation, &id, &sink, &cancel_flag)
        })
        .await
        .map_err(|e| AppError::Task(format!("处理任务异常退出: {}", e)))??;

        let (image, background, cleared_pixels) = processed;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, &image.bytes).await?;

        log::info!("💾 已写出 {}（{} 字节）", output.display(), image.len());

        Ok(FileReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            operation,
            width: image.width,
            height: image.height,
            bytes_written: image.len(),
            background,
            cleared_pixels,
        })
    }

    /// 取消正在进行的请求；请求不存在时返回 `false`。
    pub fn cancel(&self, request_id: &str) -> Result<bool, AppError> {
        let guard = self
            .cancel_flags
            .lock()
            .map_err(|_| AppError::Task("取消标志锁已中毒".to_string()))?;

        if let Some(flag) = guard.get(request_id) {
            flag.store(true, Ordering::SeqCst);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn register(&self, request_id: &str) -> Result<Arc<AtomicBool>, AppError> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut guard = self
            .cancel_flags
            .lock()
            .map_err(|_| AppError::Task("取消标志锁已中毒".to_string()))?;
        guard.insert(request_id.to_string(), Arc::clone(&flag));
        Ok(flag)
    }

    fn unregister(&self, request_id: &str) -> Result<(), AppError> {
        let mut guard = self
            .cancel_flags
            .lock()
            .map_err(|_| AppError::Task("取消标志锁已中毒".to_string()))?;
        guard.remove(request_id);
        Ok(())
    }
}

fn run_operation<S: RasterSurface>(
    remover: &BackgroundRemover<S>,
    candidate: ImageCandidate,
    operation: Operation,
    request_id: &str,
    sink: &ProgressSink,
    cancel_flag: &AtomicBool,
) -> Result<(EncodedImage, Option<Color>, Option<u64>), RemovalError> {
    match operation {
        Operation::RemoveBackground => {
            let output = remover.remove_background_with_hooks(
                candidate,
                |progress| {
                    // 终态由外层统一推送
                    if progress < 100 {
                        sink(ProgressEvent::processing(request_id, progress));
                    }
                },
                || cancel_flag.load(Ordering::SeqCst),
            )?;
            Ok((output.image, Some(output.background), Some(output.cleared_pixels)))
        }
        Operation::Grayscale => Ok((remover.grayscale(candidate)?, None, None)),
        Operation::EdgeMap => Ok((remover.edge_map(candidate)?, None, None)),
    }
}
