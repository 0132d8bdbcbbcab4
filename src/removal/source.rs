//! # 输入来源与媒体类型
//!
//! ## 设计思路
//!
//! 将“外部输入”与“流水线中间结果”解耦：
//! - `ImageCandidate` 表示外壳交来的原始字节 + 声明类型，只被消费一次
//! - `MediaType` 表示核心真正能解码 / 编码的格式
//!
//! 声明类型保持字符串形式，由校验器按配置白名单判断；
//! 只有编码输出与后端嗅探才使用强类型的 `MediaType`。

use std::fmt;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

use super::RemovalError;

/// 核心支持的图片格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg", alias = "image/jpg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MediaType {
    /// 解析 MIME 字符串（忽略大小写与参数，兼容 `image/jpg` 别名）。
    ///
    /// # 示例
    /// ```rust
    /// use background_remover::removal::MediaType;
    ///
    /// assert_eq!(MediaType::parse("IMAGE/JPG"), Some(MediaType::Jpeg));
    /// assert_eq!(MediaType::parse("image/png; charset=binary"), Some(MediaType::Png));
    /// assert_eq!(MediaType::parse("image/gif"), None);
    /// ```
    pub fn parse(mime: &str) -> Option<Self> {
        match normalize_media_type(mime).as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// 短名解析（`png` / `jpeg` / `jpg` / `webp`），供 CLI 使用。
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn as_mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// 是否能保留透明通道。
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// 统一声明类型的写法：去掉参数、首尾空白并转小写。
pub(crate) fn normalize_media_type(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_lowercase()
}

/// 根据文件扩展名推断声明类型，未知扩展名返回 `application/octet-stream`。
pub fn media_type_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "webp" => "image/webp".to_string(),
        "gif" => "image/gif".to_string(),
        "bmp" => "image/bmp".to_string(),
        "tif" | "tiff" => "image/tiff".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

/// 待处理图片：原始字节 + 声明类型。
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    bytes: Vec<u8>,
    media_type: String,
    source_hint: String,
}

impl ImageCandidate {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            source_hint: "memory".to_string(),
        }
    }

    /// 附加来源提示（仅用于日志与诊断）。
    pub fn with_source_hint(mut self, hint: impl Into<String>) -> Self {
        self.source_hint = hint.into();
        self
    }

    /// 解析 Data URL（`data:image/png;base64,...`）或纯 Base64 字符串。
    ///
    /// 纯 Base64 没有类型头，使用 `fallback_type` 作为声明类型。
    /// 解码前先按长度估算体积，超过 `max_file_size` 直接拒绝，避免大块内存分配。
    pub fn from_base64(
        data: &str,
        fallback_type: &str,
        max_file_size: u64,
    ) -> Result<Self, RemovalError> {
        let normalized = data.trim();

        let (media_type, payload) = if let Some(rest) = normalized.strip_prefix("data:") {
            let marker = rest
                .find(";base64,")
                .ok_or_else(|| RemovalError::Decode("Data URL 缺少 base64 标记".to_string()))?;
            (rest[..marker].to_string(), &rest[marker + 8..])
        } else {
            (fallback_type.to_string(), normalized)
        };

        if payload.is_empty() {
            return Err(RemovalError::Empty);
        }

        let estimated = estimate_base64_decoded_len(payload);
        if estimated > max_file_size {
            return Err(RemovalError::FileTooLarge {
                size: estimated,
                limit: max_file_size,
            });
        }

        let bytes = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| RemovalError::Decode(format!("Base64 解码失败：{}", e)))?;

        Ok(Self {
            bytes,
            media_type,
            source_hint: "base64".to_string(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn source_hint(&self) -> &str {
        &self.source_hint
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn estimate_base64_decoded_len(payload: &str) -> u64 {
    (payload.len() as u64).saturating_add(3) / 4 * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_aliases_and_params() {
        assert_eq!(MediaType::parse(" image/jpeg "), Some(MediaType::Jpeg));
        assert_eq!(MediaType::parse("image/WEBP"), Some(MediaType::Webp));
        assert_eq!(MediaType::parse("text/html"), None);
        assert_eq!(MediaType::from_extension(".JPG"), Some(MediaType::Jpeg));
        assert!(!MediaType::Jpeg.supports_alpha());
        assert!(MediaType::Png.supports_alpha());
    }

    #[test]
    fn media_type_serde_uses_mime_strings() {
        let json = serde_json::to_string(&MediaType::Webp).expect("serialize media type failed");
        assert_eq!(json, "\"image/webp\"");

        let parsed: MediaType = serde_json::from_str("\"image/jpg\"").expect("alias should parse");
        assert_eq!(parsed, MediaType::Jpeg);
    }

    #[test]
    fn path_media_type_guess() {
        assert_eq!(media_type_for_path(Path::new("a/b/photo.JPEG")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("anim.gif")), "image/gif");
        assert_eq!(media_type_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn data_url_is_split_into_type_and_payload() {
        let candidate =
            ImageCandidate::from_base64("data:image/png;base64,SGVsbG8=", "image/jpeg", 1024)
            .expect("data url should parse");

        assert_eq!(candidate.media_type(), "image/png");
        assert_eq!(candidate.bytes(), b"Hello");
        assert_eq!(candidate.source_hint(), "base64");
    }

    #[test]
    fn plain_base64_uses_fallback_type() {
        let candidate = ImageCandidate::from_base64("SGVsbG8=", "image/webp", 1024)
            .expect("plain base64 should parse");
        assert_eq!(candidate.media_type(), "image/webp");
        assert_eq!(candidate.byte_len(), 5);
    }

    #[test]
    fn oversized_base64_rejected_before_decode() {
        let huge = "A".repeat(1024 * 1024);
        let result = ImageCandidate::from_base64(&huge, "image/png", 32);
        assert!(matches!(result, Err(RemovalError::FileTooLarge { limit: 32, .. })));
    }

    #[test]
    fn data_url_without_marker_is_rejected() {
        let result = ImageCandidate::from_base64("data:image/png,abc", "image/png", 1024);
        assert!(matches!(result, Err(RemovalError::Decode(_))));
    }
}
