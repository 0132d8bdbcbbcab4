//! # 去背景工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  外壳 (CLI / 其他宿主)                    │
//! │                                                          │
//! │  clap 参数 ── settings (JSON) ── ProgressEvent 输出      │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Result<FileReport, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ settings ─── ProcessingOptions JSON 覆盖              │
//! │  │                                                       │
//! │  └─ removal ──── 去背景流水线                             │
//! │      ├─ service        tokio 文件读写 + 取消 + 进度事件   │
//! │      ├─ handler        编排 + 阶段耗时                    │
//! │      ├─ surface        image / fast_image_resize 后端     │
//! │      └─ filters        灰度 / Sobel 边缘                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，服务层与命令行的返回类型 |
//! | [`settings`] | 设置文件的读取、校验与保存 |
//! | [`removal`] | 校验、解码、降采样、背景采样、颜色匹配、编码 |

pub mod error;
pub mod removal;
pub mod settings;
