//! 每客户端令牌桶注册表
//!
//! 每个客户端标识对应一个独立的 governor 直连限流器（GCRA，行为上等价于令牌桶），
//! 首次出现时创建。不同客户端之间互不影响，同一客户端的更新由 governor 的 CAS 串行化。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock, Reference};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::RateLimitSettings;
use crate::errors::Result;

type DirectLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// 单个客户端的限流器
pub struct ClientLimiter<C: Clock + Clone = DefaultClock> {
    limiter: DirectLimiter<C>,
    clock: C,
    epoch: C::Instant,
    /// 相对 epoch 的最后访问时间（纳秒）
    last_seen: AtomicU64,
}

impl<C: Clock + Clone> ClientLimiter<C> {
    fn new(quota: Quota, clock: C, epoch: C::Instant) -> Self {
        let client = Self {
            limiter: RateLimiter::direct_with_clock(quota, clock.clone()),
            clock,
            epoch,
            last_seen: AtomicU64::new(0),
        };
        client.touch();
        client
    }

    fn elapsed_nanos(&self) -> u64 {
        let since: Duration = self.clock.now().duration_since(self.epoch).into();
        u64::try_from(since.as_nanos()).unwrap_or(u64::MAX)
    }

    fn touch(&self) {
        self.last_seen.fetch_max(self.elapsed_nanos(), Ordering::Relaxed);
    }

    /// 尝试消耗一个令牌
    pub fn allow(&self) -> bool {
        self.touch();
        self.limiter.check().is_ok()
    }

    /// 距离最后一次访问的时间
    pub fn idle_for(&self) -> Duration {
        let last = self.last_seen.load(Ordering::Relaxed);
        Duration::from_nanos(self.elapsed_nanos().saturating_sub(last))
    }
}

/// 客户端标识 -> 限流器
pub struct RateLimiterRegistry<C: Clock + Clone = DefaultClock> {
    entries: DashMap<String, Arc<ClientLimiter<C>>>,
    quota: Quota,
    clock: C,
    epoch: C::Instant,
    idle_ttl: Option<Duration>,
}

impl RateLimiterRegistry<DefaultClock> {
    pub fn new(quota: Quota, idle_ttl: Option<Duration>) -> Self {
        Self::with_clock(quota, idle_ttl, DefaultClock::default())
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Result<Self> {
        Ok(Self::new(settings.quota()?, settings.idle_ttl()))
    }
}

impl<C: Clock + Clone> RateLimiterRegistry<C> {
    pub fn with_clock(quota: Quota, idle_ttl: Option<Duration>, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            entries: DashMap::new(),
            quota,
            clock,
            epoch,
            idle_ttl,
        }
    }

    /// 获取或创建客户端的限流器
    ///
    /// 并发首次访问同一标识时只会创建一个条目。
    pub fn get_or_create(&self, identity: &str) -> Arc<ClientLimiter<C>> {
        if let Some(entry) = self.entries.get(identity) {
            return Arc::clone(entry.value());
        }
        let entry = self
            .entries
            .entry(identity.to_string())
            .or_insert_with(|| {
                Arc::new(ClientLimiter::new(
                    self.quota,
                    self.clock.clone(),
                    self.epoch,
                ))
            });
        Arc::clone(entry.value())
    }

    /// 该客户端当前是否允许请求（允许时消耗一个令牌）
    pub fn allow(&self, identity: &str) -> bool {
        self.get_or_create(identity).allow()
    }

    /// 实际生效的空闲回收时间
    ///
    /// 不低于令牌桶从空到满所需的时间：被回收的条目与重新创建的条目状态完全一致，
    /// 回收不会改变任何放行结果。
    pub fn effective_idle_ttl(&self) -> Option<Duration> {
        let refill = self
            .quota
            .replenish_interval()
            .saturating_mul(self.quota.burst_size().get());
        self.idle_ttl.map(|ttl| ttl.max(refill))
    }

    /// 回收空闲条目，返回回收数量
    ///
    /// 仍被调用方持有的条目不会被回收。
    pub fn sweep_idle(&self) -> usize {
        let Some(ttl) = self.effective_idle_ttl() else {
            return 0;
        };
        let before = self.entries.len();
        // retain 持有分片写锁，期间 get_or_create 无法克隆同一条目
        self.entries
            .retain(|_, limiter| Arc::strong_count(limiter) > 1 || limiter.idle_for() < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }
}

impl<C> RateLimiterRegistry<C>
where
    C: Clock + Clone + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    /// 启动后台回收任务，`shutdown` 变为 true 时退出
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Option<JoinHandle<()>> {
        let ttl = self.effective_idle_ttl()?;
        info!(
            "Rate limiter idle sweep enabled (ttl: {:?}, interval: {:?})",
            ttl, interval
        );
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次 tick 立即返回
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep_idle();
                        if removed > 0 {
                            debug!(
                                "Evicted {} idle rate limiter entries ({} remaining)",
                                removed,
                                self.len()
                            );
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Rate limiter sweeper stopped");
                            break;
                        }
                    }
                }
            }
        }))
    }
}
