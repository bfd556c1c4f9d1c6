use std::time::Duration;

use waitlist_server::{Config, ServerState, init_logger, init_logger_with_file, print_banner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 配置, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // 生产环境保持默认 info 级别；其余环境打开 debug
    if config.is_production() {
        init_logger();
    } else {
        init_logger_with_file(Some("debug"), None);
    }

    print_banner();
    tracing::info!("Perch waitlist server starting...");

    // 2. 初始化服务器状态 (数据库、短信网关、候位管理器)
    let state = ServerState::initialize(&config).await?;

    // 3. 启动后台任务 (定时刷新等待时间广播)
    let tasks = state.start_background_tasks();

    // 4. 等待退出信号，周期性检查后台任务健康
    let mut health_tick = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = health_tick.tick() => {
                tasks.check_health();
            }
        }
    }
    tracing::info!("Shutdown signal received");

    // 5. 优雅关闭
    state.shutdown().await;
    tasks.shutdown().await;

    Ok(())
}
