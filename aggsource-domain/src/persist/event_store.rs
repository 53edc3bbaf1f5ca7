//! 事件存储协议（读路径）
//!
//! 存储引擎本身（持久追加、并发冲突检测、删除语义、传输协议）属于外部协作方，
//! 这里只定义重建聚合所需的读取接口与结果形态。
//!
use crate::{error::DomainResult as Result, event::EventMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 已提交事件：流版本 + 事件体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedEvent {
    revision: u64,
    body: EventMessage,
}

impl CommittedEvent {
    pub const fn new(revision: u64, body: EventMessage) -> Self {
        Self { revision, body }
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub const fn body(&self) -> &EventMessage {
        &self.body
    }

    pub fn into_body(self) -> EventMessage {
        self.body
    }
}

/// 打开的事件流。
///
/// `stream_revision` 为流的最新版本（0 表示无已提交事件，删除后的流同样为 0）；
/// `committed_events` 只含版本不小于打开时 `min_revision` 的事件，按提交顺序排列。
/// 句柄在作用域结束时释放。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStream {
    stream_id: String,
    stream_revision: u64,
    committed_events: Vec<CommittedEvent>,
}

impl EventStream {
    pub fn new(
        stream_id: impl Into<String>,
        stream_revision: u64,
        committed_events: Vec<CommittedEvent>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            stream_revision,
            committed_events,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub const fn stream_revision(&self) -> u64 {
        self.stream_revision
    }

    pub fn committed_events(&self) -> &[CommittedEvent] {
        &self.committed_events
    }

    /// 按提交顺序取出事件体
    pub fn into_bodies(self) -> impl Iterator<Item = EventMessage> {
        self.committed_events
            .into_iter()
            .map(CommittedEvent::into_body)
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// 打开标识对应的流，返回版本不小于 `min_revision` 的已提交事件
    async fn open_stream(
        &self,
        stream_id: &str,
        min_revision: u64,
        cancel: &CancellationToken,
    ) -> Result<EventStream>;
}

#[async_trait]
impl<T> EventStore for Arc<T>
where
    T: EventStore + ?Sized,
{
    async fn open_stream(
        &self,
        stream_id: &str,
        min_revision: u64,
        cancel: &CancellationToken,
    ) -> Result<EventStream> {
        (**self).open_stream(stream_id, min_revision, cancel).await
    }
}
