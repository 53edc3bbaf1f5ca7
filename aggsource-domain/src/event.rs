//! 事件模型（Event / EventMessage）
//!
//! - `Event`：可注册到分发表的事件载荷类型，携带稳定的类型标签；
//! - `EventMessage`：流中存放的不透明事件体（类型标签 + JSON 载荷 + 头信息），
//!   重放时按类型标签分发并反序列化为具体事件。
//!
use crate::error::{DomainError, DomainResult};
use bon::Builder;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeMap;

/// 事件载荷需要满足的能力边界
///
/// 通常通过 `#[aggsource_macros::event]` 生成实现，而非手写。
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 事件类型标签，用于分发表查找（形如 `Deposited` 或 `account.deposited`）
    const EVENT_TYPE: &'static str;
}

/// 流中的事件体
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct EventMessage {
    /// 事件类型标签
    event_type: String,
    /// 事件负载
    payload: Value,
    /// 头信息（关联 ID、来源等），重放时不参与分发
    #[builder(default)]
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl EventMessage {
    /// 将具体事件序列化为事件体
    pub fn from_event<E: Event>(event: &E) -> DomainResult<Self> {
        Ok(Self {
            event_type: E::EVENT_TYPE.to_string(),
            payload: serde_json::to_value(event)?,
            headers: BTreeMap::new(),
        })
    }

    /// 反序列化为具体事件；类型标签不符时返回 `TypeMismatch`
    pub fn to_event<E: Event>(&self) -> DomainResult<E> {
        if self.event_type != E::EVENT_TYPE {
            return Err(DomainError::TypeMismatch {
                expected: E::EVENT_TYPE.to_string(),
                found: self.event_type.clone(),
            });
        }

        Ok(E::deserialize(&self.payload)?)
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}
