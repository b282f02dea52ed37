//! 当前生效句柄的发布槽
//!
//! 读者通过 `load()` 拿到一个 `Arc<DatabaseHandle>`，在整个查询期间持有；
//! 写者（reload supervisor）通过 `publish()` 原子替换。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use super::handle::DatabaseHandle;

pub struct ActiveHandleSlot {
    current: ArcSwap<DatabaseHandle>,
    generation: AtomicU64,
}

impl ActiveHandleSlot {
    pub fn new(handle: DatabaseHandle) -> Self {
        Self::from_arc(Arc::new(handle))
    }

    pub fn from_arc(handle: Arc<DatabaseHandle>) -> Self {
        Self {
            current: ArcSwap::new(handle),
            generation: AtomicU64::new(1),
        }
    }

    /// 当前句柄。返回的 `Arc` 保证句柄在持有期间不会被释放。
    #[inline]
    pub fn load(&self) -> Arc<DatabaseHandle> {
        self.current.load_full()
    }

    /// 原子发布新句柄，返回被替换的旧句柄
    pub fn publish(&self, handle: Arc<DatabaseHandle>) -> Arc<DatabaseHandle> {
        let previous = self.current.swap(handle);
        self.generation.fetch_add(1, Ordering::AcqRel);
        previous
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ActiveHandleSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveHandleSlot")
            .field("generation", &self.generation())
            .field("current", &*self.current.load())
            .finish()
    }
}
