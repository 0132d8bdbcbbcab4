//! # 输入校验
//!
//! 在任何解码工作之前，仅凭元数据（是否存在、声明类型、字节长度）尽快失败。
//! 像素尺寸只有解码后才可知，由 `decoder` 的尺寸门限负责。

use super::{ImageCandidate, ProcessingOptions, RemovalError};

/// 校验待处理图片。
///
/// 顺序：是否存在 → 声明类型 → 体积。
pub fn validate(
    candidate: Option<&ImageCandidate>,
    options: &ProcessingOptions,
) -> Result<(), RemovalError> {
    let candidate = candidate.ok_or(RemovalError::Empty)?;

    if candidate.byte_len() == 0 {
        return Err(RemovalError::Empty);
    }

    if !options.allows_media_type(candidate.media_type()) {
        return Err(RemovalError::InvalidType(candidate.media_type().to_string()));
    }

    if candidate.byte_len() > options.max_file_size_bytes {
        return Err(RemovalError::FileTooLarge {
            size: candidate.byte_len(),
            limit: options.max_file_size_bytes,
        });
    }

    log::debug!(
        "🔎 输入校验通过 - 来源: {} 类型: {} 体积: {} 字节",
        candidate.source_hint(),
        candidate.media_type(),
        candidate.byte_len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_candidate_is_empty() {
        let options = ProcessingOptions::default();
        assert!(matches!(validate(None, &options), Err(RemovalError::Empty)));
    }

    #[test]
    fn zero_length_payload_is_empty() {
        let options = ProcessingOptions::default();
        let candidate = ImageCandidate::new(Vec::new(), "image/png");
        assert!(matches!(validate(Some(&candidate), &options), Err(RemovalError::Empty)));
    }

    #[test]
    fn gif_is_rejected_by_type() {
        let options = ProcessingOptions::default();
        let candidate = ImageCandidate::new(b"GIF89a....".to_vec(), "image/gif");
        assert!(matches!(
            validate(Some(&candidate), &options),
            Err(RemovalError::InvalidType(t)) if t == "image/gif"
        ));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let mut options = ProcessingOptions::default();
        options.max_file_size_bytes = 8;

        let at_limit = ImageCandidate::new(vec![0; 8], "image/jpg");
        assert!(validate(Some(&at_limit), &options).is_ok());

        let over = ImageCandidate::new(vec![0; 9], "image/jpeg");
        assert!(matches!(
            validate(Some(&over), &options),
            Err(RemovalError::FileTooLarge { size: 9, limit: 8 })
        ));
    }

    #[test]
    fn type_is_checked_before_size() {
        let mut options = ProcessingOptions::default();
        options.max_file_size_bytes = 1;
        let candidate = ImageCandidate::new(vec![0; 64], "image/bmp");
        assert!(matches!(
            validate(Some(&candidate), &options),
            Err(RemovalError::InvalidType(_))
        ));
    }
}
