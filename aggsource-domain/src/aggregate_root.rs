//! 聚合根重放契约（AggregateRoot）
//!
//! 每个具体聚合根在构造时建立一张分发表（`EventRouter`），把事件类型标签映射到
//! 折叠处理器。重建时：
//! 1. 若使用快照，先通过可选能力 `Snapshotable::restore_snapshot` 直接恢复状态；
//! 2. 再按提交顺序调用 `initialize` 折叠剩余事件，折叠不会把历史事件记为新变更。
//!
//! 业务变更经 `RootEntity::apply_change` 同时折叠并记录，供独立的写路径读取。
//!
use crate::error::{DomainError, DomainResult};
use crate::event::{Event, EventMessage};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

type Handler<S> = Box<dyn Fn(&mut S, &EventMessage) -> DomainResult<()> + Send + Sync>;

/// 事件分发表：类型标签 -> 折叠处理器
pub struct EventRouter<S> {
    handlers: HashMap<&'static str, Handler<S>>,
}

impl<S> Default for EventRouter<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S> EventRouter<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为事件类型 `E` 注册处理器；同一标签后注册者覆盖先注册者
    #[must_use]
    pub fn on<E, F>(mut self, handler: F) -> Self
    where
        S: 'static,
        E: Event,
        F: Fn(&mut S, E) + Send + Sync + 'static,
    {
        self.handlers.insert(
            E::EVENT_TYPE,
            Box::new(move |state: &mut S, message: &EventMessage| {
                let event = message.to_event::<E>()?;
                handler(state, event);
                Ok(())
            }),
        );
        self
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// 按类型标签折叠单个事件；`root_type` 仅用于错误上下文
    pub fn route(
        &self,
        root_type: &'static str,
        state: &mut S,
        message: &EventMessage,
    ) -> DomainResult<()> {
        let handler = self.handlers.get(message.event_type()).ok_or_else(|| {
            DomainError::UnregisteredEventType {
                root_type,
                event_type: message.event_type().to_string(),
            }
        })?;

        handler(state, message)
    }
}

impl<S> fmt::Debug for EventRouter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&&'static str> = self.handlers.keys().collect();
        tags.sort();
        f.debug_struct("EventRouter").field("handlers", &tags).finish()
    }
}

/// 聚合根实体：状态 + 分发表 + 待提交变更
#[derive(Debug)]
pub struct RootEntity<S> {
    root_type: &'static str,
    state: S,
    router: EventRouter<S>,
    changes: Vec<EventMessage>,
}

impl<S> RootEntity<S> {
    pub fn new(root_type: &'static str, state: S, router: EventRouter<S>) -> Self {
        Self {
            root_type,
            state,
            router,
            changes: Vec::new(),
        }
    }

    pub const fn state(&self) -> &S {
        &self.state
    }

    /// 直接替换状态（快照恢复使用）
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// 按提交顺序折叠历史事件，不记录为变更。
    ///
    /// 任一事件未注册即中止；调用方应丢弃该实例。
    pub fn initialize<I>(&mut self, events: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = EventMessage>,
    {
        if !self.changes.is_empty() {
            return Err(DomainError::InvalidState {
                reason: format!(
                    "cannot initialize {} with {} pending changes",
                    self.root_type,
                    self.changes.len()
                ),
            });
        }

        for message in events {
            self.router.route(self.root_type, &mut self.state, &message)?;
        }
        Ok(())
    }

    /// 业务变更：折叠并记录事件
    pub fn apply_change<E: Event>(&mut self, event: &E) -> DomainResult<()> {
        let message = EventMessage::from_event(event)?;
        self.router.route(self.root_type, &mut self.state, &message)?;
        self.changes.push(message);
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changes(&self) -> &[EventMessage] {
        &self.changes
    }

    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }
}

/// 可选能力：从快照载荷直接恢复状态，绕过分发表
pub trait Snapshotable {
    fn restore_snapshot(&mut self, payload: &Value) -> DomainResult<()>;

    fn take_snapshot(&self) -> DomainResult<Value>;
}

/// 聚合根接口
///
/// 具体聚合根持有一个 `RootEntity`，其余行为由默认实现委托。
pub trait AggregateRoot: Send + Sync + 'static {
    /// 聚合根类型名，用于错误上下文与日志
    const TYPE: &'static str;

    type State: Send + Sync;

    fn entity(&self) -> &RootEntity<Self::State>;

    fn entity_mut(&mut self) -> &mut RootEntity<Self::State>;

    fn initialize<I>(&mut self, events: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = EventMessage>,
        Self: Sized,
    {
        self.entity_mut().initialize(events)
    }

    fn has_changes(&self) -> bool {
        self.entity().has_changes()
    }

    fn changes(&self) -> &[EventMessage] {
        self.entity().changes()
    }

    fn clear_changes(&mut self) {
        self.entity_mut().clear_changes();
    }

    /// 快照能力探测；不支持快照的聚合根保持默认 `None`
    fn as_snapshotable(&mut self) -> Option<&mut dyn Snapshotable> {
        None
    }
}
