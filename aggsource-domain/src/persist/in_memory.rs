//! 内存事件存储
//!
//! 同时实现 `EventStore` 与 `SnapshotStore`，并提供测试/演示用的写侧：
//! 追加事件、添加快照、删除流。删除后的流再次打开时与从未存在的流一致（版本 0）。
//!
use crate::{
    error::{DomainError, DomainResult as Result},
    event::{Event, EventMessage},
    optional::Optional,
    persist::{CommittedEvent, EventStore, EventStream, Snapshot, SnapshotStore},
};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: DashMap<String, Vec<EventMessage>>,
    // 按版本升序
    snapshots: DashMap<String, Vec<Snapshot>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加事件体，返回追加后的流版本
    pub fn append<I>(&self, stream_id: &str, events: I) -> u64
    where
        I: IntoIterator<Item = EventMessage>,
    {
        let mut stream = self.streams.entry(stream_id.to_string()).or_default();
        stream.extend(events);
        let revision = stream.len() as u64;
        tracing::trace!(stream_id, revision, "appended to stream");
        revision
    }

    /// 序列化并追加具体事件
    pub fn append_events<E: Event>(&self, stream_id: &str, events: &[E]) -> Result<u64> {
        let messages = events
            .iter()
            .map(EventMessage::from_event)
            .collect::<Result<Vec<_>>>()?;
        Ok(self.append(stream_id, messages))
    }

    /// 添加快照；同版本的旧快照被替换
    pub fn add_snapshot(&self, snapshot: Snapshot) {
        let mut snapshots = self
            .snapshots
            .entry(snapshot.stream_id().to_string())
            .or_default();
        snapshots.retain(|s| s.stream_revision() != snapshot.stream_revision());
        let at = snapshots.partition_point(|s| s.stream_revision() < snapshot.stream_revision());
        snapshots.insert(at, snapshot);
    }

    /// 删除流及其快照
    pub fn delete_stream(&self, stream_id: &str) {
        self.streams.remove(stream_id);
        self.snapshots.remove(stream_id);
        tracing::trace!(stream_id, "deleted stream");
    }

    pub fn stream_revision(&self, stream_id: &str) -> u64 {
        self.streams
            .get(stream_id)
            .map_or(0, |stream| stream.len() as u64)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn open_stream(
        &self,
        stream_id: &str,
        min_revision: u64,
        cancel: &CancellationToken,
    ) -> Result<EventStream> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let Some(stream) = self.streams.get(stream_id) else {
            return Ok(EventStream::new(stream_id, 0, Vec::new()));
        };

        let committed = stream
            .iter()
            .zip(1_u64..)
            .filter(|(_, revision)| *revision >= min_revision)
            .map(|(body, revision)| CommittedEvent::new(revision, body.clone()))
            .collect();

        Ok(EventStream::new(stream_id, stream.len() as u64, committed))
    }
}

#[async_trait]
impl SnapshotStore for InMemoryEventStore {
    async fn latest_snapshot(
        &self,
        stream_id: &str,
        max_revision: u64,
        cancel: &CancellationToken,
    ) -> Result<Optional<Snapshot>> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let latest = self.snapshots.get(stream_id).and_then(|snapshots| {
            snapshots
                .iter()
                .rev()
                .find(|s| s.stream_revision() <= max_revision)
                .cloned()
        });

        Ok(latest.into())
    }
}
