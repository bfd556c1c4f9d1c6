//! 工具模块 - 通用工具函数
//!
//! # 内容
//!
//! - 日志初始化 ([`logger`])

pub mod logger;
