/// 快照重建示例
/// 演示同一账户在两次逻辑操作中的加载：
/// 第一次完整重放事件并生成快照，第二次从快照恢复后只折叠尾部事件。
/// 运行时设置 `RUST_LOG=aggsource_domain=debug` 可观察仓储的检索路径。
use aggsource_domain::aggregate_root::{AggregateRoot, EventRouter, RootEntity, Snapshotable};
use aggsource_domain::error::DomainResult;
use aggsource_domain::optional::Optional;
use aggsource_domain::persist::{
    AggregateRepository, InMemoryEventStore, Repository, Snapshot, SnapshotableRepository,
};
use aggsource_domain::unit_of_work::UnitOfWork;
use aggsource_macros::event;
use anyhow::Result as AnyResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ============================================================================
// 领域模型
// ============================================================================

#[event(event_type = "account.opened")]
struct AccountOpened {
    owner: String,
}

#[event(event_type = "account.deposited")]
struct MoneyDeposited {
    amount: i64,
}

#[event(event_type = "account.withdrawn")]
struct MoneyWithdrawn {
    amount: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct AccountState {
    owner: String,
    balance: i64,
    replayed: usize,
}

struct Account {
    entity: RootEntity<AccountState>,
}

impl Account {
    fn factory() -> Self {
        let router = EventRouter::new()
            .on(|s: &mut AccountState, e: AccountOpened| {
                s.owner = e.owner;
                s.replayed += 1;
            })
            .on(|s: &mut AccountState, e: MoneyDeposited| {
                s.balance += e.amount;
                s.replayed += 1;
            })
            .on(|s: &mut AccountState, e: MoneyWithdrawn| {
                s.balance -= e.amount;
                s.replayed += 1;
            });

        Self {
            entity: RootEntity::new(Self::TYPE, AccountState::default(), router),
        }
    }

    fn deposit(&mut self, amount: i64) -> DomainResult<()> {
        self.entity.apply_change(&MoneyDeposited { amount })
    }
}

impl AggregateRoot for Account {
    const TYPE: &'static str = "account";
    type State = AccountState;

    fn entity(&self) -> &RootEntity<AccountState> {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut RootEntity<AccountState> {
        &mut self.entity
    }

    fn as_snapshotable(&mut self) -> Option<&mut dyn Snapshotable> {
        Some(self)
    }
}

impl Snapshotable for Account {
    fn restore_snapshot(&mut self, payload: &Value) -> DomainResult<()> {
        let mut state = AccountState::deserialize(payload)?;
        state.replayed = 0;
        *self.entity.state_mut() = state;
        Ok(())
    }

    fn take_snapshot(&self) -> DomainResult<Value> {
        Ok(serde_json::to_value(self.entity.state())?)
    }
}

// ============================================================================
// 演示
// ============================================================================

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Arc::new(InMemoryEventStore::new());
    let cancel = CancellationToken::new();
    let id = "acc-001";

    store.append_events(
        id,
        &[AccountOpened {
            owner: "alice".into(),
        }],
    )?;
    store.append_events(
        id,
        &[
            MoneyDeposited { amount: 100 },
            MoneyDeposited { amount: 50 },
        ],
    )?;
    store.append_events(id, &[MoneyWithdrawn { amount: 30 }])?;

    // 第一次操作：完整重放
    let uow = Arc::new(UnitOfWork::new());
    let repo = Repository::new(Account::factory, uow.clone(), store.clone());
    let account = repo.get(id, &cancel).await?;
    {
        let guard = account.read();
        let state = guard.entity().state();
        println!(
            "full replay: owner={}, balance={}, replayed={} events",
            state.owner, state.balance, state.replayed
        );
    }

    account.write().deposit(20)?;
    println!(
        "pending changes: {} aggregate(s) with changes",
        uow.changes().len()
    );

    // 模拟写路径：提交变更并生成快照
    let committed: Vec<_> = account.read().changes().to_vec();
    let revision = store.append(id, committed);
    account.write().clear_changes();
    let payload = account.read().take_snapshot()?;
    store.add_snapshot(
        Snapshot::builder()
            .stream_id(id.to_string())
            .stream_revision(revision)
            .payload(payload)
            .build(),
    );
    store.append_events(id, &[MoneyWithdrawn { amount: 15 }])?;

    // 第二次操作：快照 + 尾部
    let repo = SnapshotableRepository::new(
        Account::factory,
        Arc::new(UnitOfWork::new()),
        store.clone(),
    );
    let reloaded = repo.get(id, &cancel).await?;
    let guard = reloaded.read();
    let state = guard.entity().state();
    println!(
        "from snapshot@{revision}: owner={}, balance={}, replayed={} tail event(s)",
        state.owner, state.balance, state.replayed
    );

    match repo.get_optional("acc-missing", &cancel).await? {
        Optional::Value(_) => println!("unexpected account"),
        Optional::Empty => println!("acc-missing: not found"),
    }

    Ok(())
}
