//! 领域层统一错误定义
//!
//! 覆盖聚合重建（rehydration）路径上的最小必要错误集合：构造参数缺失、
//! 聚合不存在、身份映射重复附加、事件未注册、存储协作方失败与取消。
//! 存储侧错误原样透传，本层不做重试也不做瞬时/致命分类。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 构造 ---
    #[error("missing argument: {argument}")]
    MissingArgument { argument: &'static str },

    // --- 检索/身份映射 ---
    #[error("aggregate not found: identifier={identifier}, root_type={root_type}")]
    AggregateNotFound {
        identifier: String,
        root_type: &'static str,
    },
    #[error("aggregate already attached to unit of work: identifier={identifier}")]
    DuplicateAttach { identifier: String },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
    #[error("optional has no value")]
    EmptyOptional,

    // --- 重放 ---
    #[error("unregistered event type: root_type={root_type}, event_type={event_type}")]
    UnregisteredEventType {
        root_type: &'static str,
        event_type: String,
    },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    // --- 存储协作方 ---
    #[error("event store error: {reason}")]
    EventStore { reason: String },
    #[error("snapshot store error: {reason}")]
    SnapshotStore { reason: String },
    #[error("operation cancelled")]
    Cancelled,

    // --- 序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
