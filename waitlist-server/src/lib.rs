//! Perch Waitlist Edge Server - 餐厅候位管理边缘节点
//!
//! # 架构概述
//!
//! 本模块是 Waitlist Server 的主入口，提供以下核心功能：
//!
//! - **候位引擎** (`waitlist`): 等待时间估算、候位状态机、通知定时器
//! - **数据库** (`db`): 嵌入式 SQLite 存储
//! - **事件广播** (`shared::message`): 推送层订阅的领域事件
//! - **短信网关** (`services/messaging`): 外部送达的抽象接口
//!
//! # 模块结构
//!
//! ```text
//! waitlist-server/src/
//! ├── core/          # 配置、状态、后台任务
//! ├── db/            # 数据库层 (SQLite + repositories)
//! ├── waitlist/      # 时间线模拟、估算器、状态机、定时器
//! ├── services/      # 短信网关、消息模板
//! └── utils/         # 日志等工具
//! ```

pub mod core;
pub mod db;
pub mod services;
pub mod utils;
pub mod waitlist;

// Re-export 公共类型
pub use core::{BackgroundTasks, Config, ServerState};
pub use services::{MessagingGateway, SendReceipt};
pub use waitlist::{WaitlistError, WaitlistManager, WaitlistResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ____                 __
   / __ \___  __________/ /_
  / /_/ / _ \/ ___/ ___/ __ \
 / ____/  __/ /  / /__/ / / /
/_/    \___/_/   \___/_/ /_/
        waitlist edge
    "#
    );
}
