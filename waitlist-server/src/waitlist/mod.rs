//! 候位引擎 - 等待时间估算与候位生命周期
//!
//! # 模块结构
//!
//! - [`timeline`] - 桌台空闲时间线与队列模拟 (纯函数)
//! - [`estimator`] - 等待时间估算
//! - [`manager`] - 候位状态机，所有状态变更的唯一入口
//! - [`timers`] - 通知后的跟进/自动取消定时器对
//!
//! # 数据流
//!
//! ```text
//! check_in / notify / seat / reply ──▶ WaitlistManager (transition lock)
//!                                          │
//!                       ┌──────────────────┼──────────────────┐
//!                       ▼                  ▼                  ▼
//!               NotificationTimers   MessagingGateway   broadcast::Sender
//!               (arm / disarm)       (best-effort SMS)  (WaitlistEvent)
//! ```

pub mod error;
pub mod estimator;
pub mod manager;
pub mod timeline;
pub mod timers;

pub use error::{WaitlistError, WaitlistResult};
pub use estimator::WaitEstimate;
pub use manager::WaitlistManager;
pub use timeline::TableSlot;
pub use timers::NotificationTimers;
