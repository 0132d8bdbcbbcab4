//! # 降采样模块
//!
//! ## 设计思路
//!
//! 在逐像素匹配之前，把过大的图片按比例缩到工作分辨率以内，控制耗时与内存。
//! 长边对齐到目标值，短边按比例四舍五入且至少 1 像素。
//!
//! 滤镜按缩放倍数选择：任一轴缩小超过 2 倍时用 Lanczos3，否则用双线性。
//! 这只是画质启发式，不影响正确性。

use super::{PixelBuffer, RasterSurface, RemovalError, ResampleFilter};

/// 降采样结果。
#[derive(Debug, Clone)]
pub struct ResizeOutcome {
    pub buffer: PixelBuffer,
    pub was_resized: bool,
    pub original_width: u32,
    pub original_height: u32,
}

/// 计算目标尺寸；已在范围内时返回 `None`。
pub fn target_dimensions(width: u32, height: u32, target_max_side: u32) -> Option<(u32, u32)> {
    let target = target_max_side.max(1);
    if width <= target && height <= target {
        return None;
    }

    let scale_other = |other: u32, longer: u32| -> u32 {
        let scaled = (other as f64 * target as f64 / longer as f64).round() as u32;
        scaled.max(1)
    };

    if width >= height {
        Some((target, scale_other(height, width)))
    } else {
        Some((scale_other(width, height), target))
    }
}

/// 按缩放倍数挑选滤镜。
pub fn select_filter(src: (u32, u32), dst: (u32, u32)) -> ResampleFilter {
    let ratio_x = src.0 as f64 / dst.0.max(1) as f64;
    let ratio_y = src.1 as f64 / dst.1.max(1) as f64;

    if ratio_x > 2.0 || ratio_y > 2.0 {
        ResampleFilter::Lanczos3
    } else {
        ResampleFilter::Bilinear
    }
}

/// 按需降采样，长边不超过 `target_max_side`。
pub fn resize<S: RasterSurface + ?Sized>(
    surface: &S,
    buffer: PixelBuffer,
    target_max_side: u32,
) -> Result<ResizeOutcome, RemovalError> {
    let (original_width, original_height) = buffer.dimensions();

    let Some((width, height)) = target_dimensions(original_width, original_height, target_max_side)
    else {
        return Ok(ResizeOutcome {
            buffer,
            was_resized: false,
            original_width,
            original_height,
        });
    };

    let filter = select_filter((original_width, original_height), (width, height));
    log::info!(
        "🧩 降采样：{}x{} -> {}x{}（filter={:?}）",
        original_width,
        original_height,
        width,
        height,
        filter
    );

    let resized = surface.resample(&buffer, width, height, filter)?;

    Ok(ResizeOutcome {
        buffer: resized,
        was_resized: true,
        original_width,
        original_height,
    })
}
