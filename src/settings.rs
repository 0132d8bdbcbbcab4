//! 设置文件：以 JSON 覆盖 `ProcessingOptions` 默认值。
//!
//! 文件中缺省的字段回落到默认值，加载后立即执行 `validate()`。

use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::removal::ProcessingOptions;

pub fn load_options(path: &Path) -> Result<ProcessingOptions, AppError> {
    let content = fs::read_to_string(path)?;
    let options = serde_json::from_str::<ProcessingOptions>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败 {}: {}", path.display(), e)))?;

    options.validate()?;
    log::info!("⚙️ 已加载设置文件：{}", path.display());
    Ok(options)
}

/// 设置文件不存在时返回默认值。
pub fn load_options_or_default(path: &Path) -> Result<ProcessingOptions, AppError> {
    if !path.exists() {
        log::warn!("设置文件不存在，使用默认配置：{}", path.display());
        return Ok(ProcessingOptions::default());
    }
    load_options(path)
}

pub fn save_options(path: &Path, options: &ProcessingOptions) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(options)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}
