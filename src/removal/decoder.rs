//! # 解码与尺寸门限
//!
//! ## 设计思路
//!
//! 将“字节 → RGBA 缓冲”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先读取头信息做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 按文件签名识别真实格式，必须在允许的类型内（声明类型可能与内容不符）
//! 2. 若后端支持，读取 header 尺寸并执行门限
//! 3. 完整解码
//! 4. 对解码结果再次执行门限（头信息可能与实际不一致）

use super::{
    ImageCandidate, MediaType, PixelBuffer, ProcessingOptions, RasterSurface, RemovalError,
};

/// 尺寸门限：零尺寸 → 单边过大 → 像素总数过多。
pub fn check_dimensions(
    width: u32,
    height: u32,
    options: &ProcessingOptions,
) -> Result<(), RemovalError> {
    if width == 0 || height == 0 {
        return Err(RemovalError::ZeroDimension { width, height });
    }

    if width.max(height) > options.max_dimension_side {
        return Err(RemovalError::DimensionTooLarge {
            width,
            height,
            limit: options.max_dimension_side,
        });
    }

    let pixels = width as u64 * height as u64;
    if pixels > options.max_total_pixels {
        return Err(RemovalError::TooManyPixels {
            pixels,
            limit: options.max_total_pixels,
        });
    }

    Ok(())
}

/// 完整解码：调用方需已通过 `validator::validate`。
pub fn decode<S: RasterSurface + ?Sized>(
    candidate: &ImageCandidate,
    options: &ProcessingOptions,
    surface: &S,
) -> Result<PixelBuffer, RemovalError> {
    let buffer = decode_unchecked(candidate, options, surface)?;
    check_dimensions(buffer.width(), buffer.height(), options)?;
    Ok(buffer)
}

/// 签名门限：能识别出的真实格式必须在白名单内。
///
/// 无法识别签名时交给后端解码处理。
pub fn check_signature(bytes: &[u8], options: &ProcessingOptions) -> Result<(), RemovalError> {
    let Some(kind) = infer::get(bytes) else {
        return Ok(());
    };

    let sniffed = MediaType::parse(kind.mime_type())
        .map(MediaType::as_mime)
        .unwrap_or(kind.mime_type());

    if !options.allows_media_type(sniffed) {
        log::warn!("⛔ 文件签名为 {}，不在允许的类型内", sniffed);
        return Err(RemovalError::Decode(format!(
            "文件内容为 {}，不在允许的类型内",
            sniffed
        )));
    }

    Ok(())
}

/// 解码但不对解码结果执行门限，供编排层把门限作为独立阶段运行。
///
/// 头信息门限仍会在分配像素数组前执行。
pub(crate) fn decode_unchecked<S: RasterSurface + ?Sized>(
    candidate: &ImageCandidate,
    options: &ProcessingOptions,
    surface: &S,
) -> Result<PixelBuffer, RemovalError> {
    check_signature(candidate.bytes(), options)?;

    if let Some((header_width, header_height)) = surface.inspect_dimensions(candidate.bytes())? {
        log::debug!("📐 头信息尺寸：{}x{}", header_width, header_height);
        check_dimensions(header_width, header_height, options)?;
    }

    let buffer = surface.decode(candidate.bytes())?;

    log::info!(
        "✅ 图片解码成功 - 来源: {} 尺寸: {}x{}",
        candidate.source_hint(),
        buffer.width(),
        buffer.height()
    );

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::removal::{Color, ImageSurface, ResampleFilter};

    struct FixedSurface {
        width: u32,
        height: u32,
    }

    impl RasterSurface for FixedSurface {
        fn decode(&self, _bytes: &[u8]) -> Result<PixelBuffer, RemovalError> {
            PixelBuffer::new(
                self.width,
                self.height,
                vec![0; self.width as usize * self.height as usize * 4],
            )
        }

        fn encode(&self, _: &PixelBuffer, _: MediaType, _: f64) -> Result<Vec<u8>, RemovalError> {
            Ok(Vec::new())
        }

        fn resample(
            &self,
            buffer: &PixelBuffer,
            _: u32,
            _: u32,
            _: ResampleFilter,
        ) -> Result<PixelBuffer, RemovalError> {
            Ok(buffer.clone())
        }
    }

    #[test]
    fn gate_order_is_zero_then_side_then_pixels() {
        let mut options = ProcessingOptions::default();
        options.max_dimension_side = 100;
        options.max_total_pixels = 1000;

        assert!(matches!(
            check_dimensions(0, 500, &options),
            Err(RemovalError::ZeroDimension { .. })
        ));
        assert!(matches!(
            check_dimensions(101, 1, &options),
            Err(RemovalError::DimensionTooLarge { limit: 100, .. })
        ));
        assert!(matches!(
            check_dimensions(100, 11, &options),
            Err(RemovalError::TooManyPixels { pixels: 1100, limit: 1000 })
        ));
        assert!(check_dimensions(100, 10, &options).is_ok());
    }

    #[test]
    fn decoded_zero_dimension_is_rejected() {
        let surface = FixedSurface { width: 0, height: 3 };
        let candidate = ImageCandidate::new(vec![1, 2, 3], "image/png");
        let result = decode(&candidate, &ProcessingOptions::default(), &surface);
        assert!(matches!(result, Err(RemovalError::ZeroDimension { width: 0, height: 3 })));
    }

    #[test]
    fn header_gate_rejects_before_full_decode() {
        let surface = ImageSurface;
        let fixture = PixelBuffer::filled(64, 8, Color::rgb(1, 2, 3));
        let bytes = surface
            .encode(&fixture, MediaType::Png, 1.0)
            .expect("encode fixture failed");

        let mut options = ProcessingOptions::default();
        options.max_dimension_side = 32;

        let candidate = ImageCandidate::new(bytes, "image/png");
        let result = decode(&candidate, &options, &surface);
        assert!(matches!(
            result,
            Err(RemovalError::DimensionTooLarge { width: 64, height: 8, limit: 32 })
        ));
    }

    #[test]
    fn corrupt_bytes_are_decode_error() {
        let candidate = ImageCandidate::new(vec![0x89, b'P', b'N', b'G', 0, 0, 0], "image/png");
        let result = decode(&candidate, &ProcessingOptions::default(), &ImageSurface);
        assert!(matches!(result, Err(RemovalError::Decode(_))));
    }

    #[test]
    fn content_outside_allowed_types_is_decode_error() {
        let jpeg = ImageSurface
            .encode(&PixelBuffer::filled(4, 4, Color::rgb(9, 9, 9)), MediaType::Jpeg, 0.9)
            .expect("encode fixture failed");

        let mut options = ProcessingOptions::default();
        options.allowed_media_types = ["image/png".to_string()].into_iter().collect();

        let candidate = ImageCandidate::new(jpeg, "image/png");
        let result = decode(&candidate, &options, &ImageSurface);
        assert!(matches!(result, Err(RemovalError::Decode(ref msg)) if msg.contains("image/jpeg")));
    }

    #[test]
    fn alias_in_allowed_types_admits_jpeg_content() {
        let jpeg = ImageSurface
            .encode(&PixelBuffer::filled(4, 4, Color::rgb(9, 9, 9)), MediaType::Jpeg, 0.9)
            .expect("encode fixture failed");

        let mut options = ProcessingOptions::default();
        options.allowed_media_types = ["image/jpg".to_string()].into_iter().collect();

        assert!(check_signature(&jpeg, &options).is_ok());
    }

    #[test]
    fn unrecognized_signature_is_left_to_the_surface() {
        assert!(check_signature(&[1, 2, 3], &ProcessingOptions::default()).is_ok());
    }
}
