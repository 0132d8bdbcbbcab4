//! # 编码输出
//!
//! 将处理后的缓冲序列化为压缩字节，用于保存、预览或下载。
//! 默认输出 PNG 以保留透明通道；JPEG 会丢弃 alpha。

use base64::{Engine as _, engine::general_purpose};

use super::{MediaType, PixelBuffer, RasterSurface, RemovalError};

/// 编码结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// 生成 `data:` URL，供外壳直接预览。
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type.as_mime(),
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 编码缓冲（消费缓冲，编码后不再持有）。
pub fn encode<S: RasterSurface + ?Sized>(
    surface: &S,
    buffer: PixelBuffer,
    media_type: MediaType,
    quality: f64,
) -> Result<EncodedImage, RemovalError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(RemovalError::Encode(format!("quality 必须在 0~1 之间：{}", quality)));
    }

    if buffer.is_empty() {
        return Err(RemovalError::Encode(format!(
            "无法编码空图像：{}x{}",
            buffer.width(),
            buffer.height()
        )));
    }

    if !media_type.supports_alpha() {
        log::debug!("{} 不支持透明通道，输出将丢弃 alpha", media_type);
    }

    let (width, height) = buffer.dimensions();
    let bytes = surface.encode(&buffer, media_type, quality)?;

    log::debug!(
        "编码完成：{} {}x{} -> {} 字节",
        media_type,
        width,
        height,
        bytes.len()
    );

    Ok(EncodedImage {
        bytes,
        media_type,
        width,
        height,
    })
}
