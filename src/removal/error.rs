//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载去背景链路中的所有失败原因，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 所有错误都是确定性的输入问题（除 `ContextUnavailable` 外），
//! 编排层不做自动重试，直接把具体错误透传给调用方。

/// 去背景处理统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`，最终原样展示给用户。
#[derive(Debug, thiserror::Error)]
pub enum RemovalError {
    #[error("未提供图片")]
    Empty,

    #[error("不支持的文件类型：{0}（可选：JPEG / PNG / WebP）")]
    InvalidType(String),

    #[error("文件过大：{size} 字节（限制：{limit} 字节）")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("图片已损坏或格式不受支持：{0}")]
    Decode(String),

    #[error("图片尺寸无效：{width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("图片尺寸过大：{width}x{height}（单边限制：{limit}）")]
    DimensionTooLarge { width: u32, height: u32, limit: u32 },

    #[error("图片像素过多：{pixels} 像素（限制：{limit} 像素）")]
    TooManyPixels { pixels: u64, limit: u64 },

    #[error("渲染环境不可用：{0}")]
    ContextUnavailable(String),

    #[error("处理超时：{pixels} 像素超过安全上限 {ceiling}")]
    ProcessingTimeout { pixels: u64, ceiling: u64 },

    #[error("图片编码失败：{0}")]
    Encode(String),

    #[error("处理已取消")]
    Cancelled,

    #[error("像素缓冲长度异常：期望 {expected} 字节，实际 {actual} 字节")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("配置无效：{0}")]
    InvalidOptions(String),
}

impl RemovalError {
    /// 稳定错误码，供外壳做分支展示或埋点。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "E_EMPTY",
            Self::InvalidType(_) => "E_INVALID_TYPE",
            Self::FileTooLarge { .. } => "E_FILE_TOO_LARGE",
            Self::Decode(_) => "E_DECODE",
            Self::ZeroDimension { .. } => "E_ZERO_DIMENSION",
            Self::DimensionTooLarge { .. } => "E_DIMENSION_TOO_LARGE",
            Self::TooManyPixels { .. } => "E_TOO_MANY_PIXELS",
            Self::ContextUnavailable(_) => "E_CONTEXT_UNAVAILABLE",
            Self::ProcessingTimeout { .. } => "E_PROCESSING_TIMEOUT",
            Self::Encode(_) => "E_ENCODE",
            Self::Cancelled => "E_CANCELLED",
            Self::InvalidBuffer { .. } => "E_INVALID_BUFFER",
            Self::InvalidOptions(_) => "E_INVALID_OPTIONS",
        }
    }

    /// 错误通常发生的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Empty | Self::InvalidType(_) | Self::FileTooLarge { .. } => "validate",
            Self::Decode(_) => "decode",
            Self::ZeroDimension { .. }
            | Self::DimensionTooLarge { .. }
            | Self::TooManyPixels { .. } => "dimension_check",
            Self::ContextUnavailable(_) | Self::InvalidBuffer { .. } => "surface",
            Self::ProcessingTimeout { .. } | Self::Cancelled => "match",
            Self::Encode(_) => "encode",
            Self::InvalidOptions(_) => "config",
        }
    }

    /// 是否属于宿主环境的瞬时故障（调用方可自行决定是否重试）。
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ContextUnavailable(_))
    }
}

impl From<RemovalError> for String {
    fn from(error: RemovalError) -> Self {
        error.to_string()
    }
}
