use aggsource_domain::aggregate::{Aggregate, RootHandle};
use aggsource_domain::aggregate_root::{AggregateRoot, EventRouter, RootEntity};
use aggsource_domain::error::{DomainError, DomainResult};
use aggsource_domain::event::{Event, EventMessage};
use aggsource_domain::optional::Optional;
use aggsource_domain::persist::{
    AggregateRepository, EventStore, EventStream, InMemoryEventStore, Repository,
};
use aggsource_domain::unit_of_work::UnitOfWork;
use aggsource_macros::event;
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const KNOWN: &str = "stub-known";
const UNKNOWN: &str = "stub-unknown";

#[event]
struct EventStub {
    value: u32,
}

#[event]
struct NeverRegistered {}

#[derive(Debug, Default)]
struct Recorded {
    events: Vec<EventStub>,
}

struct StubRoot {
    entity: RootEntity<Recorded>,
}

impl StubRoot {
    fn factory() -> Self {
        Self {
            entity: RootEntity::new(
                Self::TYPE,
                Recorded::default(),
                EventRouter::new().on(|s: &mut Recorded, e: EventStub| s.events.push(e)),
            ),
        }
    }

    fn recorded_events(&self) -> &[EventStub] {
        &self.entity.state().events
    }
}

impl AggregateRoot for StubRoot {
    const TYPE: &'static str = "stub";
    type State = Recorded;

    fn entity(&self) -> &RootEntity<Recorded> {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut RootEntity<Recorded> {
        &mut self.entity
    }
}

struct OtherRoot {
    entity: RootEntity<()>,
}

impl AggregateRoot for OtherRoot {
    const TYPE: &'static str = "other";
    type State = ();

    fn entity(&self) -> &RootEntity<()> {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut RootEntity<()> {
        &mut self.entity
    }
}

// 记录每次 open_stream 的 min_revision
#[derive(Default)]
struct CountingStore {
    inner: InMemoryEventStore,
    opened: Mutex<Vec<u64>>,
}

impl CountingStore {
    fn opened(&self) -> Vec<u64> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for CountingStore {
    async fn open_stream(
        &self,
        stream_id: &str,
        min_revision: u64,
        cancel: &CancellationToken,
    ) -> DomainResult<EventStream> {
        self.opened.lock().unwrap().push(min_revision);
        self.inner.open_stream(stream_id, min_revision, cancel).await
    }
}

// 永不完成的读取，只能被取消打断
struct PendingStore;

#[async_trait]
impl EventStore for PendingStore {
    async fn open_stream(
        &self,
        _stream_id: &str,
        _min_revision: u64,
        _cancel: &CancellationToken,
    ) -> DomainResult<EventStream> {
        std::future::pending::<DomainResult<EventStream>>().await
    }
}

struct FailingStore;

#[async_trait]
impl EventStore for FailingStore {
    async fn open_stream(
        &self,
        _stream_id: &str,
        _min_revision: u64,
        _cancel: &CancellationToken,
    ) -> DomainResult<EventStream> {
        Err(DomainError::EventStore {
            reason: "connection reset".to_string(),
        })
    }
}

fn repository<S: EventStore>(store: Arc<S>) -> (Repository<StubRoot, S>, Arc<UnitOfWork>) {
    let uow = Arc::new(UnitOfWork::new());
    (Repository::new(StubRoot::factory, uow.clone(), store), uow)
}

fn stubs(values: &[u32]) -> Vec<EventStub> {
    values.iter().map(|&value| EventStub { value }).collect()
}

#[tokio::test]
async fn empty_store_get_optional_returns_empty() -> AnyResult<()> {
    let (repo, uow) = repository(Arc::new(InMemoryEventStore::new()));

    let result = repo.get_optional(UNKNOWN, &CancellationToken::new()).await?;

    assert!(result.is_empty());
    assert!(uow.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_store_get_fails_with_not_found() {
    let (repo, _uow) = repository(Arc::new(InMemoryEventStore::new()));

    let err = repo
        .get(UNKNOWN, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DomainError::AggregateNotFound {
            identifier,
            root_type,
        } => {
            assert_eq!(identifier, UNKNOWN);
            assert_eq!(root_type, StubRoot::TYPE);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn add_attaches_with_version_zero() -> AnyResult<()> {
    let (repo, uow) = repository(Arc::new(InMemoryEventStore::new()));
    let root = RootHandle::new(StubRoot::factory());

    repo.add(KNOWN, root.clone())?;

    let aggregate = uow.try_get(KNOWN).unwrap();
    assert_eq!(aggregate.identifier(), KNOWN);
    assert_eq!(aggregate.expected_version(), 0);
    assert!(aggregate.root::<StubRoot>().unwrap().ptr_eq(&root));

    let again = repo.add(KNOWN, RootHandle::new(StubRoot::factory()));
    assert!(matches!(again, Err(DomainError::DuplicateAttach { .. })));
    Ok(())
}

#[tokio::test]
async fn filled_unit_of_work_returns_tracked_root_without_store_access() -> AnyResult<()> {
    let store = Arc::new(CountingStore::default());
    let (repo, uow) = repository(store.clone());
    let root = RootHandle::new(StubRoot::factory());
    uow.attach(Aggregate::new(KNOWN, 0, root.clone()))?;
    let cancel = CancellationToken::new();

    let got = repo.get(KNOWN, &cancel).await?;
    assert!(got.ptr_eq(&root));

    let optional = repo.get_optional(KNOWN, &cancel).await?;
    assert_eq!(optional, Optional::Value(root));

    assert!(store.opened().is_empty());

    // 未跟踪的标识仍会访问存储
    assert!(repo.get_optional(UNKNOWN, &cancel).await?.is_empty());
    assert_eq!(store.opened(), vec![0]);
    Ok(())
}

#[tokio::test]
async fn filled_store_rehydrates_in_commit_order_and_attaches() -> AnyResult<()> {
    let store = Arc::new(CountingStore::default());
    store.inner.append_events(KNOWN, &stubs(&[1, 2, 3]))?;
    let (repo, uow) = repository(store.clone());
    let cancel = CancellationToken::new();

    let root = repo.get(KNOWN, &cancel).await?;

    assert_eq!(root.read().recorded_events(), stubs(&[1, 2, 3]).as_slice());
    assert!(!root.read().has_changes());

    let aggregate = uow.try_get(KNOWN).unwrap();
    assert_eq!(aggregate.expected_version(), 3);
    assert_eq!(aggregate.root_type(), StubRoot::TYPE);

    // 同一操作内重复获取返回同一实例，不再打开流
    let again = repo.get(KNOWN, &cancel).await?;
    assert!(again.ptr_eq(&root));
    assert_eq!(store.opened(), vec![0]);
    Ok(())
}

#[tokio::test]
async fn deleted_stream_is_absent_for_get_and_get_optional() -> AnyResult<()> {
    let store = Arc::new(InMemoryEventStore::new());
    store.append_events(KNOWN, &stubs(&[1]))?;
    store.delete_stream(KNOWN);
    let (repo, uow) = repository(store);
    let cancel = CancellationToken::new();

    assert!(repo.get_optional(KNOWN, &cancel).await?.is_empty());

    let err = repo.get(KNOWN, &cancel).await.unwrap_err();
    match err {
        DomainError::AggregateNotFound {
            identifier,
            root_type,
        } => {
            assert_eq!(identifier, KNOWN);
            assert_eq!(root_type, StubRoot::TYPE);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(uow.is_empty());
    Ok(())
}

#[tokio::test]
async fn unregistered_event_fails_and_attaches_nothing() -> AnyResult<()> {
    let store = Arc::new(InMemoryEventStore::new());
    store.append_events(KNOWN, &stubs(&[1]))?;
    store.append_events(KNOWN, &[NeverRegistered {}])?;
    let (repo, uow) = repository(store);

    let err = repo
        .get(KNOWN, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DomainError::UnregisteredEventType {
            root_type,
            event_type,
        } => {
            assert_eq!(root_type, StubRoot::TYPE);
            assert_eq!(event_type, NeverRegistered::EVENT_TYPE);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!uow.contains(KNOWN));
    Ok(())
}

#[tokio::test]
async fn tracked_root_of_another_type_is_a_mismatch() -> AnyResult<()> {
    let (repo, uow) = repository(Arc::new(InMemoryEventStore::new()));
    let other = RootHandle::new(OtherRoot {
        entity: RootEntity::new(OtherRoot::TYPE, (), EventRouter::new()),
    });
    uow.attach(Aggregate::new(KNOWN, 0, other))?;

    let err = repo
        .get_optional(KNOWN, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DomainError::TypeMismatch { expected, found } => {
            assert_eq!(expected, StubRoot::TYPE);
            assert_eq!(found, OtherRoot::TYPE);
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn already_cancelled_token_fails_without_touching_unit_of_work() -> AnyResult<()> {
    let store = Arc::new(InMemoryEventStore::new());
    store.append_events(KNOWN, &stubs(&[1]))?;
    let (repo, uow) = repository(store);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = repo.get_optional(KNOWN, &cancel).await;

    assert!(matches!(result, Err(DomainError::Cancelled)));
    assert!(uow.is_empty());
    Ok(())
}

#[tokio::test]
async fn cancellation_interrupts_a_pending_read() {
    let (repo, uow) = repository(Arc::new(PendingStore));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = repo.get(KNOWN, &cancel).await;

    assert!(matches!(result, Err(DomainError::Cancelled)));
    assert!(uow.is_empty());
}

#[tokio::test]
async fn store_failure_is_propagated() {
    let (repo, uow) = repository(Arc::new(FailingStore));

    let err = repo
        .get_optional(KNOWN, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::EventStore { ref reason } if reason == "connection reset"));
    assert!(uow.is_empty());
}

#[tokio::test]
async fn repository_is_usable_as_a_trait_object() -> AnyResult<()> {
    let store = Arc::new(InMemoryEventStore::new());
    store.append(
        KNOWN,
        vec![EventMessage::from_event(&EventStub { value: 7 })?.with_header("source", "import")],
    );
    let uow = Arc::new(UnitOfWork::new());
    let concrete = Repository::builder()
        .root_factory(StubRoot::factory)
        .unit_of_work(uow.clone())
        .event_store(store)
        .build()?;
    let repo: Arc<dyn AggregateRepository<StubRoot>> = Arc::new(concrete);

    let root = repo.get(KNOWN, &CancellationToken::new()).await?;

    assert_eq!(root.read().recorded_events(), stubs(&[7]).as_slice());
    assert_eq!(uow.identifiers(), vec![KNOWN.to_string()]);
    Ok(())
}
