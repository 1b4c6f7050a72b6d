// crates/cc_runtime/src/lib.rs

//! ConCouple 运行时层
//!
//! 提供耦合器消费的数据管理设施，包括：
//! - [`namespace`]: 命名空间注册表（名称 → 世界秩子集）
//! - [`dofs`]: 连接类型与全局自由度句柄
//! - [`storage`]: 按名称访问的字段套接字存储
//!
//! 所有状态均为内存态，每次运行重建；查询不涉及通信。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dofs;
pub mod error;
pub mod namespace;
pub mod storage;

// 重导出常用类型
pub use dofs::{ConnKind, DofHandle};
pub use error::{RuntimeError, RuntimeResult};
pub use namespace::{Namespace, NamespaceRegistry};
pub use storage::{DataStorage, SocketData};
