//! 聚合仓储
//!
//! 检索协议：先查工作单元（命中直接返回同一实例，不访问存储）；未命中时打开流，
//! 用工厂创建新聚合根并按提交顺序折叠全部事件，成功后才附加到工作单元。
//! 取消或任一失败都不会在工作单元中留下条目。
//!
use crate::{
    aggregate::{Aggregate, RootHandle},
    aggregate_root::AggregateRoot,
    error::{DomainError, DomainResult as Result},
    optional::Optional,
    persist::{EventStore, EventStream, SnapshotStore, SnapshotableRepository},
    unit_of_work::UnitOfWork,
};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 聚合根工厂：产生未折叠的新实例
pub type RootFactory<R> = Arc<dyn Fn() -> R + Send + Sync>;

#[async_trait]
pub trait AggregateRepository<R>: Send + Sync
where
    R: AggregateRoot,
{
    /// 取回聚合根；不存在时返回 `AggregateNotFound`
    async fn get(&self, identifier: &str, cancel: &CancellationToken) -> Result<RootHandle<R>> {
        match self.get_optional(identifier, cancel).await? {
            Optional::Value(root) => Ok(root),
            Optional::Empty => Err(DomainError::AggregateNotFound {
                identifier: identifier.to_string(),
                root_type: R::TYPE,
            }),
        }
    }

    async fn get_optional(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<Optional<RootHandle<R>>>;

    /// 以版本 0 将新建聚合根附加到工作单元
    fn add(&self, identifier: &str, root: RootHandle<R>) -> Result<()>;
}

#[async_trait]
impl<R, T> AggregateRepository<R> for Arc<T>
where
    R: AggregateRoot,
    T: AggregateRepository<R> + ?Sized,
{
    async fn get(&self, identifier: &str, cancel: &CancellationToken) -> Result<RootHandle<R>> {
        (**self).get(identifier, cancel).await
    }

    async fn get_optional(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<Optional<RootHandle<R>>> {
        (**self).get_optional(identifier, cancel).await
    }

    fn add(&self, identifier: &str, root: RootHandle<R>) -> Result<()> {
        (**self).add(identifier, root)
    }
}

/// 基于完整事件重放的聚合仓储
pub struct Repository<R, S> {
    root_factory: RootFactory<R>,
    unit_of_work: Arc<UnitOfWork>,
    event_store: Arc<S>,
}

impl<R, S> Repository<R, S>
where
    R: AggregateRoot,
    S: EventStore,
{
    pub fn new<F>(root_factory: F, unit_of_work: Arc<UnitOfWork>, event_store: Arc<S>) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self {
            root_factory: Arc::new(root_factory),
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
impl<R, S> AggregateRepository<R> for Repository<R, S>
where
    R: AggregateRoot,
    S: EventStore,
{
    async fn get_optional(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
    ) -> Result<Optional<RootHandle<R>>> {
        if let Some(root) = cached::<R>(&self.unit_of_work, identifier)? {
            return Ok(Optional::Value(root));
        }

        let stream = open_stream(self.event_store.as_ref(), identifier, 0, cancel).await?;
        if stream.stream_revision() == 0 {
            return Ok(Optional::Empty);
        }

        let revision = stream.stream_revision();
        let mut root = (self.root_factory)();
        root.initialize(stream.into_bodies())?;

        attach(&self.unit_of_work, identifier, revision, root).map(Optional::Value)
    }

    fn add(&self, identifier: &str, root: RootHandle<R>) -> Result<()> {
        self.unit_of_work
            .attach(Aggregate::new(identifier, 0, root))
    }
}

impl<R, S> fmt::Debug for Repository<R, S>
where
    R: AggregateRoot,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root_type", &R::TYPE)
            .field("tracked", &self.unit_of_work.len())
            .finish_non_exhaustive()
    }
}

/// 由可缺省部件装配仓储；缺失部件在构建时报告 `MissingArgument`
pub struct RepositoryBuilder<R, S> {
    root_factory: Option<RootFactory<R>>,
    unit_of_work: Option<Arc<UnitOfWork>>,
    event_store: Option<Arc<S>>,
}

impl<R, S> Default for RepositoryBuilder<R, S> {
    fn default() -> Self {
        Self {
            root_factory: None,
            unit_of_work: None,
            event_store: None,
        }
    }
}

impl<R, S> RepositoryBuilder<R, S>
where
    R: AggregateRoot,
{
    #[must_use]
    pub fn root_factory<F>(mut self, root_factory: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.root_factory = Some(Arc::new(root_factory));
        self
    }

    #[must_use]
    pub fn unit_of_work(mut self, unit_of_work: Arc<UnitOfWork>) -> Self {
        self.unit_of_work = Some(unit_of_work);
        self
    }

    #[must_use]
    pub fn event_store(mut self, event_store: Arc<S>) -> Self {
        self.event_store = Some(event_store);
        self
    }

    fn into_parts(self) -> Result<(RootFactory<R>, Arc<UnitOfWork>, Arc<S>)> {
        let root_factory = self.root_factory.ok_or(DomainError::MissingArgument {
            argument: "root_factory",
        })?;
        let unit_of_work = self.unit_of_work.ok_or(DomainError::MissingArgument {
            argument: "unit_of_work",
        })?;
        let event_store = self.event_store.ok_or(DomainError::MissingArgument {
            argument: "event_store",
        })?;
        Ok((root_factory, unit_of_work, event_store))
    }

    pub fn build(self) -> Result<Repository<R, S>>
    where
        S: EventStore,
    {
        let (root_factory, unit_of_work, event_store) = self.into_parts()?;
        Ok(Repository {
            root_factory,
            unit_of_work,
            event_store,
        })
    }

    pub fn build_snapshotable(self) -> Result<SnapshotableRepository<R, S>>
    where
        S: EventStore + SnapshotStore,
    {
        let (root_factory, unit_of_work, event_store) = self.into_parts()?;
        Ok(SnapshotableRepository::from_parts(
            root_factory,
            unit_of_work,
            event_store,
        ))
    }
}

// ---- 两种仓储共用的检索步骤 ----

/// 工作单元命中时返回同一实例；已跟踪但类型不符视为 `TypeMismatch`
pub(crate) fn cached<R: AggregateRoot>(
    unit_of_work: &UnitOfWork,
    identifier: &str,
) -> Result<Option<RootHandle<R>>> {
    let Some(aggregate) = unit_of_work.try_get(identifier) else {
        return Ok(None);
    };

    match aggregate.root::<R>() {
        Some(root) => {
            tracing::debug!(identifier, root_type = R::TYPE, "unit of work hit");
            Ok(Some(root))
        }
        None => Err(DomainError::TypeMismatch {
            expected: R::TYPE.to_string(),
            found: aggregate.root_type().to_string(),
        }),
    }
}

/// 挂起点与取消信号竞争，取消优先
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DomainError::Cancelled),
        result = operation => result,
    }
}

pub(crate) async fn open_stream<S>(
    event_store: &S,
    identifier: &str,
    min_revision: u64,
    cancel: &CancellationToken,
) -> Result<EventStream>
where
    S: EventStore + ?Sized,
{
    let stream = cancellable(
        cancel,
        event_store.open_stream(identifier, min_revision, cancel),
    )
    .await?;

    tracing::debug!(
        identifier,
        min_revision,
        revision = stream.stream_revision(),
        events = stream.committed_events().len(),
        "opened stream"
    );
    Ok(stream)
}

/// 折叠完成后才附加，附加失败时新实例被丢弃
pub(crate) fn attach<R: AggregateRoot>(
    unit_of_work: &UnitOfWork,
    identifier: &str,
    revision: u64,
    root: R,
) -> Result<RootHandle<R>> {
    let handle = RootHandle::new(root);
    unit_of_work.attach(Aggregate::new(identifier, revision, handle.clone()))?;
    Ok(handle)
}
