//! 工作单元（UnitOfWork）/ 身份映射
//!
//! 一次逻辑操作内，每个标识至多对应一个存活的聚合根实例。
//! 纯内存、无 I/O、不挂起；生命周期等于一次逻辑操作，不跨操作共享。
//!
use crate::aggregate::Aggregate;
use crate::error::{DomainError, DomainResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Default)]
pub struct UnitOfWork {
    aggregates: DashMap<String, Aggregate>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询是否已跟踪该标识；无副作用
    pub fn try_get(&self, identifier: &str) -> Option<Aggregate> {
        self.aggregates
            .get(identifier)
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.aggregates.contains_key(identifier)
    }

    /// 附加聚合；同一标识重复附加返回 `DuplicateAttach`，原条目保持不变
    pub fn attach(&self, aggregate: Aggregate) -> DomainResult<()> {
        match self.aggregates.entry(aggregate.identifier().to_string()) {
            Entry::Occupied(occupied) => Err(DomainError::DuplicateAttach {
                identifier: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                tracing::trace!(
                    identifier = aggregate.identifier(),
                    root_type = aggregate.root_type(),
                    version = aggregate.expected_version(),
                    "attached aggregate"
                );
                vacant.insert(aggregate);
                Ok(())
            }
        }
    }

    /// 是否存在记录了业务变更的聚合根；正被写入的聚合根计为有变更
    pub fn has_changes(&self) -> bool {
        self.tracked().iter().any(Aggregate::has_changes)
    }

    /// 记录了业务变更的聚合（无序）；正被写入的聚合根计为有变更
    pub fn changes(&self) -> Vec<Aggregate> {
        self.tracked()
            .into_iter()
            .filter(Aggregate::has_changes)
            .collect()
    }

    // 先释放分片锁，再逐个查询聚合根
    fn tracked(&self) -> Vec<Aggregate> {
        self.aggregates
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.aggregates
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}
