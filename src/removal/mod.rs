//! # 去背景模块（removal）
//!
//! ## 设计思路
//!
//! 该模块把“输入校验 → 解码门限 → 降采样 → 背景采样 → 颜色匹配 → 重新编码”
//! 按职责拆分为多个子模块，每个阶段只消费上一阶段的产物。
//!
//! - `service`：异步边界（文件读写、请求取消、进度事件）
//! - `handler`：编排整条处理流水线
//! - `validator/decoder/resize`：输入校验、解码与尺寸门限、降采样
//! - `sampler/matcher`：背景色估计与 alpha 清除
//! - `filters`：灰度与 Sobel 边缘，作为独立工具操作
//! - `encoder/surface`：编码输出与底层渲染后端
//! - `config/error/source/buffer/progress`：配置、错误、中间数据模型
//!
//! ## 实现思路
//!
//! 像素计算全部同步执行，一次请求独占一个 `PixelBuffer`；
//! 渲染能力通过 `RasterSurface` 注入，测试可以替换为假后端。
//!
//! ## 新同事快速上手
//!
//! ```text
//! 外壳（CLI）
//!    ↓
//! service.rs（tokio::fs 读写 + spawn_blocking）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ validator.rs（类型 / 体积）
//!    ├─ decoder.rs（解码 + 尺寸门限）
//!    ├─ resize.rs（长边收敛到工作尺寸）
//!    ├─ sampler.rs（8 点边界采样）
//!    ├─ matcher.rs（距离 < 容差 → alpha = 0）
//!    └─ encoder.rs（PNG / JPEG / WebP）
//!    ↓
//! 返回 RemovalOutput 或 RemovalError
//! ```

mod buffer;
mod config;
pub mod decoder;
mod encoder;
mod error;
pub mod filters;
mod handler;
pub mod matcher;
pub mod progress;
pub mod resize;
pub mod sampler;
mod service;
mod source;
mod surface;
pub mod validator;

pub use buffer::{Color, PixelBuffer};
pub use config::{PerformanceProfile, ProcessingOptions, SAFETY_CEILING_FACTOR};
pub use encoder::{EncodedImage, encode};
pub use error::RemovalError;
pub use handler::{BackgroundRemover, RemovalOutput, Stage};
pub use matcher::{AlphaMatcher, MatchReport};
pub use progress::ProgressTracker;
pub use resize::ResizeOutcome;
pub use sampler::SampleSet;
pub use service::{FileReport, Operation, ProgressEvent, RemovalService};
pub use source::{ImageCandidate, MediaType, media_type_for_path};
pub use surface::{ImageSurface, RasterSurface, ResampleFilter};
