use std::num::NonZeroU32;
use std::time::Duration;

use governor::Quota;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::errors::{Ip2LocError, Result};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 数据库加载方式
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LoadMode {
    /// 内存映射文件，只适用于通过 rename 替换数据库的部署方式
    ///
    /// 原地覆盖写入会截断映射中的 inode，正在进行的查询会触发 SIGBUS。
    Mmap,
    /// 整个文件读入内存（默认），文件的任何改写都不会影响已打开的句柄
    #[default]
    Memory,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量
/// - database: mmdb 文件路径与热加载参数
/// - rate_limit: 每客户端令牌桶参数
/// - cors: /v1/report 允许的来源
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：IP2LOC，分隔符：__
    /// 示例：IP2LOC__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
        let explicit = path != DEFAULT_CONFIG_PATH;

        let settings = Config::builder()
            // 显式指定的配置文件必须存在
            .add_source(File::with_name(path).required(explicit))
            .add_source(
                Environment::with_prefix("IP2LOC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: StaticConfig = settings.try_deserialize()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        config.validate()?;
        Ok(config)
    }

    /// 启动前校验
    pub fn validate(&self) -> Result<()> {
        self.rate_limit.quota()?;
        if self.database.path.trim().is_empty() {
            return Err(Ip2LocError::config("database.path must not be empty"));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_client_request_timeout_ms")]
    pub client_request_timeout_ms: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// mmdb 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default)]
    pub load_mode: LoadMode,
    /// 文件变更后等待多久再校验（毫秒），0 表示不合并事件
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl DatabaseConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// 每客户端限流配置（令牌桶）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// 令牌补充速率（个/秒）
    #[serde(default = "default_rate_per_second")]
    pub rate_per_second: f64,
    /// 桶容量（突发上限）
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// 空闲多久后回收客户端条目（秒），0 表示永不回收
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl RateLimitSettings {
    /// 补充一个令牌所需的时间
    pub fn period(&self) -> Result<Duration> {
        if !self.rate_per_second.is_finite() || self.rate_per_second <= 0.0 {
            return Err(Ip2LocError::config(format!(
                "rate_limit.rate_per_second must be a positive number, got {}",
                self.rate_per_second
            )));
        }
        Duration::try_from_secs_f64(1.0 / self.rate_per_second).map_err(|_| {
            Ip2LocError::config(format!(
                "rate_limit.rate_per_second {} is too small",
                self.rate_per_second
            ))
        })
    }

    pub fn burst_size(&self) -> Result<NonZeroU32> {
        NonZeroU32::new(self.burst).ok_or_else(|| {
            Ip2LocError::config("rate_limit.burst must be at least 1".to_string())
        })
    }

    /// 转换为 governor Quota
    pub fn quota(&self) -> Result<Quota> {
        let period = self.period()?;
        let burst = self.burst_size()?;
        Quota::with_period(period)
            .map(|q| q.allow_burst(burst))
            .ok_or_else(|| Ip2LocError::config("rate_limit period rounds down to zero"))
    }

    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.idle_ttl_secs > 0).then(|| Duration::from_secs(self.idle_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// CORS 配置（仅作用于 /v1/report）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    4000
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_keep_alive_secs() -> u64 {
    10
}

fn default_client_request_timeout_ms() -> u64 {
    5000
}

fn default_database_path() -> String {
    "./dbip-full.mmdb".to_string()
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_rate_per_second() -> f64 {
    1.0
}

fn default_burst() -> u32 {
    5
}

fn default_idle_ttl_secs() -> u64 {
    600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            keep_alive_secs: default_keep_alive_secs(),
            client_request_timeout_ms: default_client_request_timeout_ms(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            load_mode: LoadMode::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            rate_per_second: default_rate_per_second(),
            burst: default_burst(),
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}
