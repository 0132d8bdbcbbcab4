//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ProcessingOptions`，保证运行时行为可观测、可调整、可测试。
//! 其中性能档位（quality / balanced / speed）作为高层语义，映射到工作分辨率上限。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - `validate` 在配置生效前做范围检查，非法配置不会进入流水线。
//! - `PerformanceProfile` 负责档位字符串解析与反向输出。
//! - 结构体可被 serde 部分反序列化，缺省字段回落到默认值。

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::source::normalize_media_type;
use super::{MediaType, RemovalError};

/// 默认允许的声明类型（含 `image/jpg` 兼容写法）。
static DEFAULT_ALLOWED_MEDIA_TYPES: Lazy<BTreeSet<String>> = Lazy::new(|| {
    ["image/jpeg", "image/jpg", "image/png", "image/webp"]
        .into_iter()
        .map(String::from)
        .collect()
});

/// 匹配阶段的安全倍数：像素数超过 `max_total_pixels * 1.5` 时直接中止。
pub const SAFETY_CEILING_FACTOR: f64 = 1.5;

/// 去背景处理配置。
///
/// 字段覆盖了校验、解码门限、降采样、匹配与编码五个阶段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessingOptions {
    /// 输入字节允许的最大体积（字节）。
    pub max_file_size_bytes: u64,
    /// 允许的声明类型集合（小写、无参数）。
    pub allowed_media_types: BTreeSet<String>,
    /// 解码后宽/高单边上限。
    pub max_dimension_side: u32,
    /// 解码后的像素上限（`width * height`）。
    pub max_total_pixels: u64,
    /// 判定为背景的最大颜色距离（严格小于）。
    pub color_tolerance: f64,
    /// 输出格式。
    pub output_media_type: MediaType,
    /// 有损格式的输出质量，范围 `[0, 1]`。
    pub output_quality: f64,
    /// 匹配前的工作分辨率上限；`None` 表示保持原尺寸。
    pub working_max_side: Option<u32>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 20 * 1024 * 1024,
            allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES.clone(),
            max_dimension_side: 8000,
            max_total_pixels: 40_000_000,
            color_tolerance: 45.0,
            output_media_type: MediaType::Png,
            output_quality: 0.92,
            working_max_side: Some(2048),
        }
    }
}

impl ProcessingOptions {
    /// 声明类型是否在白名单内。
    ///
    /// `image/jpg` 与 `image/jpeg` 视为同一类型。
    pub fn allows_media_type(&self, declared: &str) -> bool {
        let normalized = normalize_media_type(declared);
        let parsed = MediaType::parse(&normalized);
        self.allowed_media_types.iter().any(|allowed| match parsed {
            Some(media_type) => MediaType::parse(allowed) == Some(media_type),
            None => normalize_media_type(allowed) == normalized,
        })
    }

    /// 匹配阶段允许扫描的最大像素数。
    pub fn pixel_ceiling(&self) -> u64 {
        (self.max_total_pixels as f64 * SAFETY_CEILING_FACTOR) as u64
    }

    /// 范围检查。
    pub fn validate(&self) -> Result<(), RemovalError> {
        if self.max_file_size_bytes == 0 {
            return Err(RemovalError::InvalidOptions("maxFileSizeBytes 必须大于 0".to_string()));
        }
        if self.allowed_media_types.is_empty() {
            return Err(RemovalError::InvalidOptions("allowedMediaTypes 不能为空".to_string()));
        }
        if self.max_dimension_side == 0 {
            return Err(RemovalError::InvalidOptions("maxDimensionSide 必须大于 0".to_string()));
        }
        if self.max_total_pixels == 0 {
            return Err(RemovalError::InvalidOptions("maxTotalPixels 必须大于 0".to_string()));
        }
        if !self.color_tolerance.is_finite() || self.color_tolerance < 0.0 {
            return Err(RemovalError::InvalidOptions(format!(
                "colorTolerance 必须为非负有限数：{}",
                self.color_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&self.output_quality) {
            return Err(RemovalError::InvalidOptions(format!(
                "outputQuality 必须在 0~1 之间：{}",
                self.output_quality
            )));
        }
        if self.working_max_side == Some(0) {
            return Err(RemovalError::InvalidOptions("workingMaxSide 不能为 0".to_string()));
        }
        Ok(())
    }

    /// 基于当前参数反推性能档位。
    pub fn infer_performance_profile(&self) -> PerformanceProfile {
        match self.working_max_side {
            None => PerformanceProfile::Quality,
            Some(side) if side <= 1024 => PerformanceProfile::Speed,
            Some(_) => PerformanceProfile::Balanced,
        }
    }

    /// 应用指定性能档位到实际参数。
    pub fn apply_performance_profile(&mut self, profile: PerformanceProfile) {
        self.working_max_side = match profile {
            PerformanceProfile::Quality => None,
            PerformanceProfile::Balanced => Some(2048),
            PerformanceProfile::Speed => Some(1024),
        };
    }
}

/// 性能档位（面向产品/用户语义）。
///
/// - `Quality`：按原尺寸处理
/// - `Balanced`：长边降到 2048
/// - `Speed`：长边降到 1024
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceProfile {
    Quality,
    Balanced,
    Speed,
}

impl PerformanceProfile {
    /// 从外部字符串解析档位。
    pub fn parse(profile: &str) -> Result<Self, RemovalError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(RemovalError::InvalidOptions(format!(
                "未知性能档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = ProcessingOptions::default();
        options.validate().expect("default options should validate");
        assert_eq!(options.color_tolerance, 45.0);
        assert_eq!(options.output_media_type, MediaType::Png);
        assert_eq!(options.pixel_ceiling(), 60_000_000);
    }

    #[test]
    fn allowed_types_are_matched_loosely() {
        let options = ProcessingOptions::default();
        assert!(options.allows_media_type("image/jpg"));
        assert!(options.allows_media_type("IMAGE/PNG; foo=bar"));
        assert!(!options.allows_media_type("image/gif"));
        assert!(!options.allows_media_type(""));

        let mut jpeg_only = ProcessingOptions::default();
        jpeg_only.allowed_media_types = ["image/jpeg".to_string()].into_iter().collect();
        assert!(jpeg_only.allows_media_type("image/jpg"));
        assert!(!jpeg_only.allows_media_type("image/png"));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut options = ProcessingOptions::default();
        options.output_quality = 1.5;
        assert!(matches!(options.validate(), Err(RemovalError::InvalidOptions(_))));

        let mut options = ProcessingOptions::default();
        options.color_tolerance = f64::NAN;
        assert!(matches!(options.validate(), Err(RemovalError::InvalidOptions(_))));

        let mut options = ProcessingOptions::default();
        options.working_max_side = Some(0);
        assert!(matches!(options.validate(), Err(RemovalError::InvalidOptions(_))));

        let mut options = ProcessingOptions::default();
        options.allowed_media_types.clear();
        assert!(matches!(options.validate(), Err(RemovalError::InvalidOptions(_))));
    }

    #[test]
    fn profile_roundtrip() {
        let mut options = ProcessingOptions::default();
        assert_eq!(options.infer_performance_profile(), PerformanceProfile::Balanced);

        for profile in [
            PerformanceProfile::Quality,
            PerformanceProfile::Speed,
            PerformanceProfile::Balanced,
        ] {
            options.apply_performance_profile(profile);
            assert_eq!(options.infer_performance_profile(), profile);
            assert_eq!(PerformanceProfile::parse(profile.as_str()).expect("parse failed"), profile);
        }

        assert!(PerformanceProfile::parse("ultra").is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let options: ProcessingOptions =
            serde_json::from_str(r#"{"colorTolerance": 30, "outputMediaType": "image/webp"}"#)
                .expect("partial options should parse");

        assert_eq!(options.color_tolerance, 30.0);
        assert_eq!(options.output_media_type, MediaType::Webp);
        assert_eq!(options.max_dimension_side, 8000);
        assert!(options.allows_media_type("image/png"));
    }
}
