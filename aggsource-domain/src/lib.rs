//! 事件溯源聚合重建库（aggsource-domain）
//!
//! 从事件存储中重建聚合根，并在一次逻辑操作内保证同一标识只对应一个存活实例：
//! - 聚合根重放契约（`aggregate_root`）：分发表、折叠、变更记录与可选的快照能力
//! - 聚合包装与共享句柄（`aggregate`）
//! - 工作单元 / 身份映射（`unit_of_work`）
//! - 事件模型（`event`）与显式可空结果（`optional`）
//! - 事件流、快照与仓储（`persist`）
//!
//! 典型用法：
//! 1. 用 `#[event]` 定义事件，为聚合根实现 `AggregateRoot`（需要快照时再实现 `Snapshotable`）；
//! 2. 为一次逻辑操作创建 `UnitOfWork`，连同工厂与事件存储装配 `Repository` 或 `SnapshotableRepository`；
//! 3. 通过 `AggregateRepository::get`/`get_optional` 取回聚合根，`add` 跟踪新建聚合根；
//! 4. 操作结束后由写路径读取 `UnitOfWork::changes` 提交。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod error;
pub mod event;
pub mod optional;
pub mod persist;
pub mod unit_of_work;

// 允许在本 crate 内部通过 ::aggsource_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::aggsource_domain 路径。
extern crate self as aggsource_domain;
