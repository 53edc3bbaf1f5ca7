//! 聚合包装（Aggregate）与聚合根句柄（RootHandle）
//!
//! `Aggregate` 绑定标识、加载时的流版本与聚合根实例，由工作单元独占持有；
//! 聚合根以 `RootHandle` 共享给调用方，句柄相等即为同一实例。
//!
use crate::aggregate_root::AggregateRoot;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

/// 聚合根共享句柄
pub struct RootHandle<R> {
    inner: Arc<RwLock<R>>,
}

impl<R> RootHandle<R> {
    pub fn new(root: R) -> Self {
        Self {
            inner: Arc::new(RwLock::new(root)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, R> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, R> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 是否指向同一聚合根实例
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R> Clone for RootHandle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// 聚合根按引用判等
impl<R> PartialEq for RootHandle<R> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<R> Eq for RootHandle<R> {}

impl<R: AggregateRoot> fmt::Debug for RootHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootHandle")
            .field("root_type", &R::TYPE)
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

// 类型擦除后的聚合根，工作单元借此跨类型持有
trait ErasedRoot: Send + Sync {
    fn root_type(&self) -> &'static str;

    fn has_changes(&self) -> bool;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: AggregateRoot> ErasedRoot for RwLock<R> {
    fn root_type(&self) -> &'static str {
        R::TYPE
    }

    // 写锁被占用时视为有变更，不阻塞等待
    fn has_changes(&self) -> bool {
        match self.try_read() {
            Ok(root) => root.has_changes(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().has_changes(),
            Err(TryLockError::WouldBlock) => true,
        }
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 工作单元中的聚合条目：`{identifier, expected_version, root}`
#[derive(Clone)]
pub struct Aggregate {
    identifier: String,
    expected_version: u64,
    root: Arc<dyn ErasedRoot>,
}

impl Aggregate {
    pub fn new<R: AggregateRoot>(
        identifier: impl Into<String>,
        expected_version: u64,
        root: RootHandle<R>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            expected_version,
            root: root.inner,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// 加载（或附加）时聚合根所反映的流版本；新建聚合为 0
    pub const fn expected_version(&self) -> u64 {
        self.expected_version
    }

    pub fn root_type(&self) -> &'static str {
        self.root.root_type()
    }

    /// 聚合根正被写入时返回 `true`
    pub fn has_changes(&self) -> bool {
        self.root.has_changes()
    }

    /// 以具体类型取回聚合根句柄；类型不符返回 `None`
    pub fn root<R: AggregateRoot>(&self) -> Option<RootHandle<R>> {
        Arc::clone(&self.root)
            .into_any()
            .downcast::<RwLock<R>>()
            .ok()
            .map(|inner| RootHandle { inner })
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("identifier", &self.identifier)
            .field("expected_version", &self.expected_version)
            .field("root_type", &self.root.root_type())
            .finish()
    }
}
