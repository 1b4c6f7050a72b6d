// crates/cc_comm/src/lib.rs

//! ConCouple 通信层
//!
//! 提供耦合器所需的集体通信抽象，包括：
//! - [`backend`]: 集体通信后端 trait（barrier / broadcast / allreduce-max / gatherv / 子组派生）
//! - [`local`]: 进程内多线程 SPMD 后端，供测试与单机运行
//! - [`group`]: 命名秩组注册表
//! - `mpi_backend`（`mpi` feature）: 基于 rsmpi 的真实 MPI 后端
//!
//! # 并发模型
//!
//! 严格 SPMD：每个秩单线程驱动集体调用，集体调用是仅有的阻塞点。
//! 指定通信子内的每个秩都必须进入同一个集体调用，遗漏会导致死锁。

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod group;
pub mod local;

#[cfg(feature = "mpi")]
pub mod mpi_backend;

// 重导出常用类型
pub use backend::{CommBackend, CommValue};
pub use error::{CommError, CommResult};
pub use group::{GroupRegistry, RankGroup};
pub use local::{run_spmd, LocalComm};

#[cfg(feature = "mpi")]
pub use mpi_backend::{MpiComm, MpiEnv};
