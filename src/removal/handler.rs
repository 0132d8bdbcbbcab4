//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `BackgroundRemover` 只负责流程编排与配置管理，不绑定任何外壳。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 校验输入元数据
//! 3. 解码 + 尺寸门限
//! 4. 按需降采样
//! 5. 背景色采样
//! 6. 逐像素匹配并清除 alpha
//! 7. 重新编码
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ProcessingOptions>>` 支持运行时动态切档。
//! - 单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 任一阶段失败立即短路，状态进入 `Errored`，不返回任何部分结果。
//! - 记录各阶段耗时，便于性能诊断。

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::progress::{ProgressTracker, checkpoints};
use super::resize::ResizeOutcome;
use super::sampler::SampleSet;
use super::{
    AlphaMatcher, Color, EncodedImage, ImageCandidate, ImageSurface, PerformanceProfile,
    PixelBuffer, ProcessingOptions, RasterSurface, RemovalError, decoder, encoder, filters,
    resize, sampler, validator,
};

/// 流水线阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    Decoding,
    DimensionChecking,
    Resizing,
    Sampling,
    Matching,
    Encoding,
    Done,
    Errored,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validate",
            Self::Decoding => "decode",
            Self::DimensionChecking => "dimension_check",
            Self::Resizing => "resize",
            Self::Sampling => "sample",
            Self::Matching => "match",
            Self::Encoding => "encode",
            Self::Done => "done",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 去背景成功结果。
#[derive(Debug, Clone)]
pub struct RemovalOutput {
    pub image: EncodedImage,
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub was_resized: bool,
    pub background: Color,
    pub cleared_pixels: u64,
}

/// 单次运行的状态：当前阶段、进度与阶段耗时。
struct PipelineRun<F>
where
    F: FnMut(u8),
{
    stage: Stage,
    tracker: ProgressTracker<F>,
    timings: Vec<(Stage, Duration)>,
    stage_started: Instant,
    total_started: Instant,
}

impl<F> PipelineRun<F>
where
    F: FnMut(u8),
{
    fn new(on_progress: F) -> Self {
        let now = Instant::now();
        Self {
            stage: Stage::Idle,
            tracker: ProgressTracker::new(on_progress),
            timings: Vec::new(),
            stage_started: now,
            total_started: now,
        }
    }

    fn close_stage(&mut self) {
        if self.stage != Stage::Idle {
            self.timings.push((self.stage, self.stage_started.elapsed()));
        }
    }

    fn enter(&mut self, next: Stage) {
        self.close_stage();
        log::debug!("阶段切换：{} -> {}", self.stage, next);
        self.stage = next;
        self.stage_started = Instant::now();
    }

    fn finish(&mut self) {
        self.close_stage();
        self.stage = Stage::Done;
        self.tracker.report(checkpoints::DONE);

        let stages = self
            .timings
            .iter()
            .map(|(stage, elapsed)| format!("{}={}ms", stage, elapsed.as_millis()))
            .collect::<Vec<_>>()
            .join(" ");
        log::info!(
            "✅ 去背景完成 - {} total={}ms",
            stages,
            self.total_started.elapsed().as_millis()
        );
    }

    fn fail(&mut self, error: &RemovalError) {
        log::warn!("❌ 阶段 {} 失败：{}（{}）", self.stage, error, error.code());
        self.stage = Stage::Errored;
    }
}

/// 去背景处理器。
///
/// 封装了配置状态与渲染后端，并编排各子模块实现完整流程。
pub struct BackgroundRemover<S: RasterSurface = ImageSurface> {
    surface: S,
    options: Arc<RwLock<ProcessingOptions>>,
}

impl BackgroundRemover<ImageSurface> {
    /// 使用默认渲染后端创建处理器。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use background_remover::removal::{BackgroundRemover, ImageCandidate, ProcessingOptions};
    ///
    /// let remover = BackgroundRemover::new(ProcessingOptions::default())?;
    /// let bytes = std::fs::read("photo.png").unwrap_or_default();
    /// let output = remover.remove_background(ImageCandidate::new(bytes, "image/png"), |p| {
    ///     println!("{p}%");
    /// })?;
    /// println!("background = {}", output.background.to_hex());
    /// # Ok::<(), background_remover::removal::RemovalError>(())
    /// ```
    pub fn new(options: ProcessingOptions) -> Result<Self, RemovalError> {
        Self::with_surface(ImageSurface, options)
    }
}

impl<S: RasterSurface> BackgroundRemover<S> {
    /// 注入自定义渲染后端（测试或其他宿主环境）。
    pub fn with_surface(surface: S, options: ProcessingOptions) -> Result<Self, RemovalError> {
        options.validate()?;
        Ok(Self {
            surface,
            options: Arc::new(RwLock::new(options)),
        })
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// 获取配置快照，保证单次请求链路使用一致参数。
    pub fn options_snapshot(&self) -> Result<ProcessingOptions, RemovalError> {
        self.options
            .read()
            .map(|options| options.clone())
            .map_err(|_| RemovalError::ContextUnavailable("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置（先校验）。
    pub fn set_options(&self, options: ProcessingOptions) -> Result<(), RemovalError> {
        options.validate()?;
        let mut guard = self
            .options
            .write()
            .map_err(|_| RemovalError::ContextUnavailable("配置写入锁已中毒".to_string()))?;
        *guard = options;
        Ok(())
    }

    /// 设置性能档位。
    pub fn set_performance_profile(&self, profile: PerformanceProfile) -> Result<(), RemovalError> {
        let mut options = self
            .options
            .write()
            .map_err(|_| RemovalError::ContextUnavailable("配置写入锁已中毒".to_string()))?;
        options.apply_performance_profile(profile);

        log::info!(
            "⚙️ 已切换性能档位：{:?}（working_max_side={:?}）",
            profile,
            options.working_max_side
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn performance_profile(&self) -> Result<PerformanceProfile, RemovalError> {
        Ok(self.options_snapshot()?.infer_performance_profile())
    }

    pub fn remove_background<P>(
        &self,
        candidate: ImageCandidate,
        on_progress: P,
    ) -> Result<RemovalOutput, RemovalError>
    where
        P: FnMut(u8),
    {
        self.remove_background_with_hooks(candidate, on_progress, || false)
    }

    /// 处理主入口：校验 → 解码 → 门限 → 降采样 → 采样 → 匹配 → 编码。
    ///
    /// 进度单调不减，成功时最后一次上报恰为 100。
    pub fn remove_background_with_hooks<P, C>(
        &self,
        candidate: ImageCandidate,
        on_progress: P,
        is_cancelled: C,
    ) -> Result<RemovalOutput, RemovalError>
    where
        P: FnMut(u8),
        C: Fn() -> bool,
    {
        let options = self.options_snapshot()?;
        let mut run = PipelineRun::new(on_progress);

        let result = self.run_removal(&mut run, &candidate, &options, &is_cancelled);
        match &result {
            Ok(_) => run.finish(),
            Err(err) => run.fail(err),
        }
        result
    }

    fn run_removal<F, C>(
        &self,
        run: &mut PipelineRun<F>,
        candidate: &ImageCandidate,
        options: &ProcessingOptions,
        is_cancelled: &C,
    ) -> Result<RemovalOutput, RemovalError>
    where
        F: FnMut(u8),
        C: Fn() -> bool,
    {
        run.enter(Stage::Validating);
        validator::validate(Some(candidate), options)?;

        run.enter(Stage::Decoding);
        let decoded = decoder::decode_unchecked(candidate, options, &self.surface)?;
        run.tracker.report(checkpoints::DECODED);

        run.enter(Stage::DimensionChecking);
        decoder::check_dimensions(decoded.width(), decoded.height(), options)?;
        run.tracker.report(checkpoints::DIMENSIONS_CHECKED);

        run.enter(Stage::Resizing);
        let ResizeOutcome {
            buffer: mut working,
            was_resized,
            original_width,
            original_height,
        } = match options.working_max_side {
            Some(side) => resize::resize(&self.surface, decoded, side)?,
            None => ResizeOutcome {
                original_width: decoded.width(),
                original_height: decoded.height(),
                buffer: decoded,
                was_resized: false,
            },
        };
        run.tracker.report(checkpoints::BUFFER_READY);

        run.enter(Stage::Sampling);
        let samples = SampleSet::border(working.width(), working.height());
        let background = sampler::estimate(&working, &samples);
        log::debug!("🎯 背景色估计：{}（{} 个采样点）", background.to_hex(), samples.len());
        run.tracker.report(checkpoints::SAMPLED);

        run.enter(Stage::Matching);
        let matcher = AlphaMatcher::from_options(options);
        let tracker = &mut run.tracker;
        let report = matcher.match_and_clear_with_hooks(
            &mut working,
            background,
            |local| tracker.report_within(checkpoints::SAMPLED, checkpoints::MATCHED, local),
            is_cancelled,
        )?;

        run.enter(Stage::Encoding);
        let (width, height) = working.dimensions();
        let image = encoder::encode(
            &self.surface,
            working,
            options.output_media_type,
            options.output_quality,
        )?;
        run.tracker.report(checkpoints::ENCODED);

        Ok(RemovalOutput {
            image,
            width,
            height,
            original_width,
            original_height,
            was_resized,
            background,
            cleared_pixels: report.cleared,
        })
    }

    /// 校验 + 解码 + 门限，供独立滤镜操作复用。
    fn load_checked(
        &self,
        candidate: &ImageCandidate,
        options: &ProcessingOptions,
    ) -> Result<PixelBuffer, RemovalError> {
        validator::validate(Some(candidate), options)?;
        decoder::decode(candidate, options, &self.surface)
    }

    /// 独立操作：灰度化后按配置输出格式编码。
    pub fn grayscale(&self, candidate: ImageCandidate) -> Result<EncodedImage, RemovalError> {
        let options = self.options_snapshot()?;
        let mut buffer = self.load_checked(&candidate, &options)?;
        filters::to_grayscale(&mut buffer);
        encoder::encode(&self.surface, buffer, options.output_media_type, options.output_quality)
    }

    /// 独立操作：Sobel 边缘强度图。
    pub fn edge_map(&self, candidate: ImageCandidate) -> Result<EncodedImage, RemovalError> {
        let options = self.options_snapshot()?;
        let buffer = self.load_checked(&candidate, &options)?;
        let edges = filters::sobel(&buffer);
        encoder::encode(&self.surface, edges, options.output_media_type, options.output_quality)
    }
}
