//! 持久化读路径（persist）
//!
//! - 事件存储协议（`EventStore`）与打开的事件流（`EventStream`）；
//! - 快照存储协议（`SnapshotStore`）；
//! - 两种聚合仓储：完整重放（`Repository`）与快照 + 尾部重放（`SnapshotableRepository`）；
//! - 内存实现（`InMemoryEventStore`，`in-memory` 特性）。
//!
//! 写路径（追加、并发冲突检测、快照生成策略）不在本模块范围内。
//!
mod aggregate_repository;
mod event_store;
#[cfg(feature = "in-memory")]
mod in_memory;
mod snapshot_store;
mod snapshotable_repository;

pub use aggregate_repository::{
    AggregateRepository, Repository, RepositoryBuilder, RootFactory,
};
pub use event_store::{CommittedEvent, EventStore, EventStream};
#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryEventStore;
pub use snapshot_store::{Snapshot, SnapshotStore};
pub use snapshotable_repository::SnapshotableRepository;
