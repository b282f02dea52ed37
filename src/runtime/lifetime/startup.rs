use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::api::AppState;
use crate::api::services::AppStartTime;
use crate::config::{LoadMode, StaticConfig};
use crate::errors::Ip2LocError;
use crate::services::geoip::{ActiveHandleSlot, DatabaseHandle, LookupService, TranslationTables};
use crate::services::rate_limit::RateLimiterRegistry;
use crate::system::reload::{ReloadSupervisor, SupervisorHandle};

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

pub struct StartupContext {
    pub config: Arc<StaticConfig>,
    pub lookup: Arc<LookupService>,
    pub registry: Arc<RateLimiterRegistry>,
    pub supervisor: SupervisorHandle,
    pub start_time: AppStartTime,
    sweeper: Option<JoinHandle<()>>,
    sweeper_shutdown: watch::Sender<bool>,
}

impl StartupContext {
    /// 构建 HTTP 层共享状态
    pub fn app_state(&self) -> AppState {
        AppState {
            lookup: self.lookup.clone(),
            supervisor: self.supervisor.supervisor().clone(),
            registry: self.registry.clone(),
            rate_limit_enabled: self.config.rate_limit.enabled,
            cors: self.config.cors.clone(),
            start_time: self.start_time.clone(),
        }
    }

    /// 停止热加载任务和限流回收任务
    ///
    /// 当前句柄在最后一个持有者（包括仍在处理的请求）释放后关闭。
    pub async fn shutdown(self) {
        let StartupContext {
            supervisor,
            sweeper,
            sweeper_shutdown,
            lookup,
            ..
        } = self;

        let _ = sweeper_shutdown.send(true);
        let tasks = async {
            if let Err(e) = supervisor.shutdown().await {
                error!("{}", e);
            }
            if let Some(sweeper) = sweeper
                && let Err(e) = sweeper.await
            {
                error!("Rate limiter sweeper task failed: {}", e);
            }
        };

        match timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), tasks).await {
            Ok(()) => info!("Background tasks stopped"),
            Err(_) => warn!(
                "Background tasks did not stop within {} seconds",
                SHUTDOWN_TIMEOUT_SECS
            ),
        }

        drop(lookup);
        debug!("Lookup service released");
    }
}

/// 准备服务器启动的上下文
///
/// 在接收流量之前同步打开初始数据库并校验类型，随后启动后台监听。
pub async fn prepare_server_startup(config: Arc<StaticConfig>) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let path = config.database.path.clone();
    let load_mode = config.database.load_mode;
    let handle = tokio::task::spawn_blocking(move || DatabaseHandle::open(&path, load_mode))
        .await
        .context("Database open task failed")?
        .with_context(|| format!("Failed to open database {}", config.database.path))?;

    if !handle.kind().supports_location_isp() {
        return Err(Ip2LocError::invalid_method(format!(
            "the LocationISP method does not support the {} database",
            handle.database_type()
        )))
        .with_context(|| format!("Refusing to serve {}", config.database.path));
    }
    info!(
        "Database opened: {} ({}, {} mode, fingerprint {})",
        handle.path().display(),
        handle.database_type(),
        load_mode,
        handle.fingerprint()
    );
    if load_mode == LoadMode::Mmap {
        warn!(
            "Database is memory-mapped: replace {} by rename only, in-place writes crash the process",
            config.database.path
        );
    }

    let slot = Arc::new(ActiveHandleSlot::new(handle));
    let lookup = Arc::new(LookupService::new(
        slot.clone(),
        Arc::new(TranslationTables::builtin()),
    ));

    let registry = Arc::new(
        RateLimiterRegistry::from_settings(&config.rate_limit)
            .context("Invalid rate limit configuration")?,
    );
    let (sweeper_shutdown, sweeper_rx) = watch::channel(false);
    let sweeper = if config.rate_limit.enabled {
        info!(
            "Rate limit: {} req/s, burst {}",
            config.rate_limit.rate_per_second, config.rate_limit.burst
        );
        registry
            .clone()
            .spawn_sweeper(config.rate_limit.sweep_interval(), sweeper_rx)
    } else {
        info!("Rate limit is disabled");
        None
    };

    let supervisor = Arc::new(ReloadSupervisor::new(
        slot,
        &config.database.path,
        load_mode,
    ))
    .spawn(config.database.debounce())
    .context("Failed to watch the database file")?;

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        config,
        lookup,
        registry,
        supervisor,
        start_time: AppStartTime::now(),
        sweeper,
        sweeper_shutdown,
    })
}
