//! 快照协议（读路径）
//!
//! 快照是某标识在给定流版本（含该版本及之前全部事件）时的状态摘要。
//!
use crate::{error::DomainResult as Result, optional::Optional};
use async_trait::async_trait;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct Snapshot {
    stream_id: String,
    stream_revision: u64,
    payload: Value,
}

impl Snapshot {
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub const fn stream_revision(&self) -> u64 {
        self.stream_revision
    }

    pub const fn payload(&self) -> &Value {
        &self.payload
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 版本不大于 `max_revision` 的最近一个快照
    async fn latest_snapshot(
        &self,
        stream_id: &str,
        max_revision: u64,
        cancel: &CancellationToken,
    ) -> Result<Optional<Snapshot>>;
}

#[async_trait]
impl<T> SnapshotStore for Arc<T>
where
    T: SnapshotStore + ?Sized,
{
    async fn latest_snapshot(
        &self,
        stream_id: &str,
        max_revision: u64,
        cancel: &CancellationToken,
    ) -> Result<Optional<Snapshot>> {
        (**self)
            .latest_snapshot(stream_id, max_revision, cancel)
            .await
    }
}
