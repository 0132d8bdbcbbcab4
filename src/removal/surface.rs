//! # 渲染后端抽象
//!
//! ## 设计思路
//!
//! 解码、编码、重采样属于“外部能力”而非核心算法：核心只依赖 `RasterSurface`，
//! 从而可以在无界面 / 服务端环境下替换为任意实现（测试中也可注入假后端）。
//!
//! ## 实现思路
//!
//! `ImageSurface` 是默认实现：
//! 1. 通过文件签名（magic bytes）识别真实格式，仅接受 JPEG / PNG / WebP
//! 2. `image` crate 负责解码与编码
//! 3. `fast_image_resize` 负责重采样，失败时回退 `image::imageops::resize`

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use std::io::Cursor;

use super::{MediaType, PixelBuffer, RemovalError};

/// 重采样滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Nearest => fr::FilterType::Box,
            Self::Bilinear => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// 解码 / 编码 / 重采样能力。
pub trait RasterSurface: Send + Sync {
    /// 将压缩字节解码为 RGBA 缓冲。
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, RemovalError>;

    /// 将缓冲编码为指定格式；`quality` 仅对有损格式生效。
    fn encode(
        &self,
        buffer: &PixelBuffer,
        media_type: MediaType,
        quality: f64,
    ) -> Result<Vec<u8>, RemovalError>;

    /// 重采样到指定尺寸。
    fn resample(
        &self,
        buffer: &PixelBuffer,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<PixelBuffer, RemovalError>;

    /// 仅读取头信息中的宽高，用于在完整解码前做尺寸门限。
    ///
    /// 不支持头部探测的后端返回 `Ok(None)`。
    fn inspect_dimensions(&self, _bytes: &[u8]) -> Result<Option<(u32, u32)>, RemovalError> {
        Ok(None)
    }
}

/// 基于 `image` + `fast_image_resize` 的默认后端。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSurface;

impl ImageSurface {
    /// 通过文件签名识别真实格式。
    fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, RemovalError> {
        if bytes.is_empty() {
            return Err(RemovalError::Decode("图片内容为空".to_string()));
        }

        let kind = infer::get(bytes)
            .ok_or_else(|| RemovalError::Decode("无法识别图片类型".to_string()))?;

        match MediaType::parse(kind.mime_type()) {
            Some(MediaType::Jpeg) => Ok(ImageFormat::Jpeg),
            Some(MediaType::Png) => Ok(ImageFormat::Png),
            Some(MediaType::Webp) => Ok(ImageFormat::WebP),
            None => Err(RemovalError::Decode(format!(
                "文件签名不是受支持的图片类型：{}",
                kind.mime_type()
            ))),
        }
    }

    fn resize_with_fast_image_resize(
        buffer: &PixelBuffer,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<PixelBuffer, RemovalError> {
        let src_image = fr::images::Image::from_vec_u8(
            buffer.width(),
            buffer.height(),
            buffer.data().to_vec(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| RemovalError::ContextUnavailable(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(width, height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(filter.to_fast_filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| {
                RemovalError::ContextUnavailable(format!("fast_image_resize 执行失败：{}", e))
            })?;

        PixelBuffer::new(width, height, dst_image.into_vec())
    }
}

impl RasterSurface for ImageSurface {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, RemovalError> {
        let format = Self::sniff_format(bytes)?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| RemovalError::Decode(format!("图片解码失败：{}", e)))?;

        Ok(PixelBuffer::from(decoded.to_rgba8()))
    }

    fn encode(
        &self,
        buffer: &PixelBuffer,
        media_type: MediaType,
        quality: f64,
    ) -> Result<Vec<u8>, RemovalError> {
        let (width, height) = buffer.dimensions();
        let mut out = Vec::new();

        let result = match media_type {
            MediaType::Png => PngEncoder::new(&mut out).write_image(
                buffer.data(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            MediaType::Jpeg => {
                let rgb: Vec<u8> = buffer
                    .data()
                    .chunks_exact(PixelBuffer::CHANNELS)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                let jpeg_quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
                JpegEncoder::new_with_quality(&mut out, jpeg_quality).write_image(
                    &rgb,
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            }
            MediaType::Webp => {
                log::debug!("WebP 仅支持无损编码，忽略 quality={}", quality);
                WebPEncoder::new_lossless(&mut out).write_image(
                    buffer.data(),
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )
            }
        };

        result.map_err(|e| RemovalError::Encode(format!("{}：{}", media_type, e)))?;
        Ok(out)
    }

    fn resample(
        &self,
        buffer: &PixelBuffer,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<PixelBuffer, RemovalError> {
        match Self::resize_with_fast_image_resize(buffer, width, height, filter) {
            Ok(resized) => Ok(resized),
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 降采样失败，回退 image::imageops::resize：{}",
                    err
                );
                let image = buffer.clone().into_rgba_image()?;
                let resized =
                    image::imageops::resize(&image, width, height, filter.to_image_filter());
                Ok(PixelBuffer::from(resized))
            }
        }
    }

    fn inspect_dimensions(&self, bytes: &[u8]) -> Result<Option<(u32, u32)>, RemovalError> {
        let format = Self::sniff_format(bytes)?;
        image::ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map(Some)
            .map_err(|e| RemovalError::Decode(format!("无法读取图片尺寸：{}", e)))
    }
}
