//! 快照仓储
//!
//! 未命中工作单元时，若聚合根具备快照能力则先取最近快照，只折叠快照版本之后的尾部事件；
//! 没有快照或聚合根不支持快照时退化为完整重放。
//!
use crate::{
    aggregate::{Aggregate, RootHandle},
    aggregate_root::AggregateRoot,
    error::DomainResult as Result,
    optional::Optional,
    persist::{
        AggregateRepository, EventStore, RepositoryBuilder, RootFactory, Snapshot, SnapshotStore,
        aggregate_repository::{attach, cached, cancellable, open_stream},
    },
    unit_of_work::UnitOfWork,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct SnapshotableRepository<R, S> {
    root_factory: RootFactory<R>,
    unit_of_work: Arc<UnitOfWork>,
    event_store: Arc<S>,
}

impl<R, S> SnapshotableRepository<R, S>
where
    R: AggregateRoot,
    S: EventStore + SnapshotStore,
{
    /// `event_store` 同时承担快照读取
    pub fn new<F>(root_factory: F, unit_of_work: Arc<UnitOfWork>, event_store: Arc<S>) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self::from_parts(Arc::new(root_factory), unit_of_work, event_store)
    }

    pub(crate) fn from_parts(
        root_factory: RootFactory<R>,
        unit_of_work: Arc<UnitOfWork>,
        event_store: Arc<S>,
    ) -> Self {
        Self {
            root_factory,
            unit_of_work,
            event_store,
        }
    }

    pub fn builder() -> RepositoryBuilder<R, S> {
        RepositoryBuilder::default()
    }

    pub fn root_factory(&self) -> &RootFactory<R> {
        &self.root_factory
    }

    pub fn unit_of_work(&self) -> &Arc<UnitOfWork> {
        &self.unit_of_work
    }

    pub fn event_store(&self) -> &Arc<S> {
        &self.event_store
    }
}

#[async_trait]
impl<R, S> AggregateRepository<R> for SnapshotableRepository<R, S>
where
    R: AggregateRoot,
    S: EventStore + SnapshotStore,
{
    async fn get_optional(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<Optional<RootHandle<R>>> {
        if let Some(root) = cached::<R>(&self.unit_of_work, identifier)? {
            return Ok(Optional::Value(root));
        }

        let mut root = (self.root_factory)();
        let supports_snapshots = root.as_snapshotable().is_some();

        let snapshot = if supports_snapshots {
            cancellable(
                cancel,
                self.event_store
                    .latest_snapshot(identifier, u64::MAX, cancel),
            )
            .await?
        } else {
            tracing::trace!(
                identifier,
                root_type = R::TYPE,
                "root does not restore snapshots"
            );
            Optional::Empty
        };

        let min_revision = match &snapshot {
            Optional::Value(snapshot) => tail_start(snapshot, u64::MAX).unwrap_or(0),
            Optional::Empty => 0,
        };
        let mut stream =
            open_stream(self.event_store.as_ref(), identifier, min_revision, cancel).await?;
        let head = stream.stream_revision();

        // 快照超出流版本时不可信，按流版本重新查找，仍无可用快照则从头重放
        let snapshot = match snapshot {
            Optional::Value(ahead) if tail_start(&ahead, head).is_none() => {
                tracing::debug!(
                    identifier,
                    snapshot_revision = ahead.stream_revision(),
                    stream_revision = head,
                    "snapshot ahead of stream, looking up an earlier one"
                );
                let earlier = cancellable(
                    cancel,
                    self.event_store.latest_snapshot(identifier, head, cancel),
                )
                .await?;
                let (start, earlier) = match earlier {
                    Optional::Value(earlier) => match tail_start(&earlier, head) {
                        Some(start) => (start, Optional::Value(earlier)),
                        None => (0, Optional::Empty),
                    },
                    Optional::Empty => (0, Optional::Empty),
                };
                if start != min_revision {
                    stream =
                        open_stream(self.event_store.as_ref(), identifier, start, cancel).await?;
                }
                earlier
            }
            other => other,
        };

        if stream.stream_revision() == 0 {
            return Ok(Optional::Empty);
        }
        let revision = stream.stream_revision();

        if let Optional::Value(snapshot) = &snapshot {
            if let Some(target) = root.as_snapshotable() {
                target.restore_snapshot(snapshot.payload())?;
            }
            tracing::debug!(
                identifier,
                snapshot_revision = snapshot.stream_revision(),
                tail = stream.committed_events().len(),
                "restored from snapshot"
            );
        }
        root.initialize(stream.into_bodies())?;

        attach(&self.unit_of_work, identifier, revision, root).map(Optional::Value)
    }

    fn add(&self, identifier: &str, root: RootHandle<R>) -> Result<()> {
        self.unit_of_work
            .attach(Aggregate::new(identifier, 0, root))
    }
}

// 快照版本不超过 `head` 时返回尾部事件的起始版本
fn tail_start(snapshot: &Snapshot, head: u64) -> Option<u64> {
    let revision = snapshot.stream_revision();
    if revision > head {
        return None;
    }
    revision.checked_add(1)
}

impl<R, S> fmt::Debug for SnapshotableRepository<R, S>
where
    R: AggregateRoot,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotableRepository")
            .field("root_type", &R::TYPE)
            .field("tracked", &self.unit_of_work.len())
            .finish_non_exhaustive()
    }
}
