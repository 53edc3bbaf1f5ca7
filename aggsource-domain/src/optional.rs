//! 可选结果容器（Optional）
//!
//! 以二元和类型表达“找到/未找到”，在类型层面区分缺失与存在。
//! 与 `Option` 可双向转换；从 `Empty` 中强取值返回 `DomainError::EmptyOptional`。
//!
use crate::error::{DomainError, DomainResult};

/// `Empty` 只等于 `Empty`；`Value(a) == Value(b)` 当且仅当 `a == b`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Optional<T> {
    #[default]
    Empty,
    Value(T),
}

impl<T> Optional<T> {
    pub const fn has_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// 取值引用；调用方需先确认变体，`Empty` 时返回前置条件错误
    pub fn value(&self) -> DomainResult<&T> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Empty => Err(DomainError::EmptyOptional),
        }
    }

    /// 消费容器取值；`Empty` 时返回前置条件错误
    pub fn into_value(self) -> DomainResult<T> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Empty => Err(DomainError::EmptyOptional),
        }
    }

    pub const fn as_ref(&self) -> Optional<&T> {
        match self {
            Self::Value(value) => Optional::Value(value),
            Self::Empty => Optional::Empty,
        }
    }

    pub fn map<U, F>(self, f: F) -> Optional<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Value(value) => Optional::Value(f(value)),
            Self::Empty => Optional::Empty,
        }
    }

    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Empty,
        }
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(value: Optional<T>) -> Self {
        match value {
            Optional::Value(value) => Some(value),
            Optional::Empty => None,
        }
    }
}

impl<T> IntoIterator for Optional<T> {
    type Item = T;
    type IntoIter = std::option::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_option().into_iter()
    }
}
