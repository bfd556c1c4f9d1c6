use std::sync::Arc;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::core::{BackgroundTasks, Config};
use crate::db::DbService;
use crate::services::{ConsoleGateway, MessagingGateway};
use crate::waitlist::WaitlistManager;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是候位节点的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | 嵌入式数据库连接池 |
/// | manager | Arc<WaitlistManager> | 候位状态机 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SQLite)
    pub pool: SqlitePool,
    /// 候位管理器 - 所有状态变更的唯一入口
    pub manager: Arc<WaitlistManager>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 数据库 (连接池 + 迁移)
    /// 2. 短信网关 (默认控制台实现；真实送达由外部传输层负责)
    /// 3. 候位管理器
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let db_service = DbService::new(&config.database_path).await?;
        let pool = db_service.pool;

        let gateway: Arc<dyn MessagingGateway> = Arc::new(ConsoleGateway);
        let manager = WaitlistManager::new(pool.clone(), config.clone(), gateway);

        Ok(Self {
            config: config.clone(),
            pool,
            manager,
        })
    }

    /// 启动后台任务
    ///
    /// 目前只有一个定时任务：周期性重算并广播各人数档的等待时间，
    /// 保证展示屏在没有状态变更时也能拿到新鲜估算。
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        let manager = self.manager.clone();
        let interval_ms = self.config.wait_broadcast_interval_ms;

        tasks.spawn("wait_time_refresher", async move {
            run_wait_time_refresher(manager, interval_ms, token).await;
        });

        tasks
    }

    /// 优雅关闭：排空所有候位定时器
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

/// 周期性重算等待时间并广播
async fn run_wait_time_refresher(
    manager: Arc<WaitlistManager>,
    interval_ms: u64,
    token: CancellationToken,
) {
    let period = std::time::Duration::from_millis(interval_ms.max(1000));
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(period) => {
                if let Err(e) = manager.broadcast_wait_times().await {
                    tracing::warn!(error = %e, "Periodic wait-time broadcast failed");
                }
            }
        }
    }
}
