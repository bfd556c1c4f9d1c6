/// 服务器配置 - 候位节点的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | RESTAURANT_ID | default | 餐厅标识 (事件信封携带) |
/// | RESTAURANT_NAME | Perch | 餐厅名称 (短信模板使用) |
/// | DATABASE_PATH | waitlist.db | SQLite 数据库文件 |
/// | ENVIRONMENT | development | 运行环境 |
/// | TURNAROUND_BUFFER_MIN | 5 | 翻台缓冲时间(分钟) |
/// | PENDING_STATE_MIN | 10 | 清洁/预留桌台默认释放时间(分钟) |
/// | DEFAULT_DINING_MIN | 90 | 无画像时的默认用餐时长(分钟) |
/// | NO_TABLE_FALLBACK_MIN | 60 | 无兼容桌台时的兜底估算(分钟) |
/// | FOLLOW_UP_DELAY_MS | 420000 | 通知后跟进提醒延迟(毫秒, 7分钟) |
/// | GRACE_PERIOD_MS | 1200000 | 通知后自动取消宽限期(毫秒, 20分钟) |
/// | TABLE_RELEASE_DELAY_MS | 300000 | 清洁→可用的延迟(毫秒, 5分钟) |
/// | WAIT_BROADCAST_INTERVAL_MS | 60000 | 等待时间定时广播间隔(毫秒) |
///
/// # 示例
///
/// ```ignore
/// DATABASE_PATH=/data/waitlist.db GRACE_PERIOD_MS=900000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 餐厅标识，事件信封携带
    pub restaurant_id: String,
    /// 餐厅名称，短信模板使用
    pub restaurant_name: String,
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 估算参数 ===
    /// 翻台缓冲：任何"桌台空出"估算都要加上的固定余量 (分钟)
    pub turnaround_buffer_min: i64,
    /// 清洁/预留桌台的固定默认释放时间 (分钟)
    pub pending_state_min: i64,
    /// 画像缺失时的默认用餐时长 (分钟)
    pub default_dining_min: i64,
    /// 没有容量兼容桌台时返回的兜底估算 (分钟)
    pub no_table_fallback_min: i64,

    // === 定时器参数 (毫秒，便于测试缩短) ===
    /// 通知后跟进提醒延迟
    pub follow_up_delay_ms: u64,
    /// 通知后自动取消宽限期
    pub grace_period_ms: u64,
    /// 结账后桌台 清洁 → 可用 的延迟
    pub table_release_delay_ms: u64,
    /// 等待时间定时广播间隔
    pub wait_broadcast_interval_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            restaurant_id: std::env::var("RESTAURANT_ID").unwrap_or_else(|_| "default".into()),
            restaurant_name: std::env::var("RESTAURANT_NAME").unwrap_or_else(|_| "Perch".into()),
            database_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "waitlist.db".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            turnaround_buffer_min: env_i64("TURNAROUND_BUFFER_MIN", 5),
            pending_state_min: env_i64("PENDING_STATE_MIN", 10),
            default_dining_min: env_i64("DEFAULT_DINING_MIN", 90),
            no_table_fallback_min: env_i64("NO_TABLE_FALLBACK_MIN", 60),

            follow_up_delay_ms: env_u64("FOLLOW_UP_DELAY_MS", 7 * 60_000),
            grace_period_ms: env_u64("GRACE_PERIOD_MS", 20 * 60_000),
            table_release_delay_ms: env_u64("TABLE_RELEASE_DELAY_MS", 5 * 60_000),
            wait_broadcast_interval_ms: env_u64("WAIT_BROADCAST_INTERVAL_MS", 60_000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(restaurant_name: impl Into<String>, database_path: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.restaurant_name = restaurant_name.into();
        config.database_path = database_path.into();
        config
    }

    /// 通知宽限期，分钟表示 (短信模板使用)
    pub fn grace_period_min(&self) -> i64 {
        (self.grace_period_ms / 60_000) as i64
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
