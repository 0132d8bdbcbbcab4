//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError`，把去背景流水线错误、文件系统错误与设置错误
//! 收敛为一个类型，供服务层与命令行外壳统一处理。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `RemovalError` / `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于以 JSON 输出给外壳。

use serde::Serialize;

use crate::removal::RemovalError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 去背景流水线错误（校验 / 解码 / 匹配 / 编码）
    #[error("{0}")]
    Removal(#[from] RemovalError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件读取或解析失败
    #[error("设置文件错误: {0}")]
    Settings(String),

    /// 后台任务异常
    #[error("后台任务失败: {0}")]
    Task(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Removal(err) => err.code(),
            Self::Io(_) => "E_IO",
            Self::Settings(_) => "E_SETTINGS",
            Self::Task(_) => "E_TASK",
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Removal(err) => err.stage(),
            Self::Io(_) => "io",
            Self::Settings(_) => "config",
            Self::Task(_) => "task",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_error_message_is_passed_through() {
        let err = AppError::from(RemovalError::InvalidType("image/gif".to_string()));
        assert_eq!(err.to_string(), RemovalError::InvalidType("image/gif".to_string()).to_string());
        assert_eq!(err.code(), "E_INVALID_TYPE");
        assert_eq!(err.stage(), "validate");
    }

    #[test]
    fn serializes_as_plain_string() {
        let err = AppError::Settings("bad json".to_string());
        let json = serde_json::to_string(&err).expect("serialize failed");
        assert_eq!(json, "\"设置文件错误: bad json\"");
    }
}
