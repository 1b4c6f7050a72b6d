// crates/cc_coupler/src/lib.rs

//! ConCouple 耦合层
//!
//! 在同一世界通信子下的两个命名空间之间搬运数值场数据：
//! 发送侧分布网格上的场值按全局自由度编号重排后出现在接收侧
//! 分布网格上，可选地经过变量集变换（如守恒↔原始变量）。
//!
//! # 模块概览
//!
//! - [`config`]: 耦合器配置（传输对、连接类型、变换器）
//! - [`context`]: 耦合上下文（注册表与存储的显式注入对象）
//! - [`transform`]: 变量集变换器与名称工厂
//! - [`plan`]: 传输规格解析与传输计划构建
//! - [`driver`]: 顶层驱动（一次性构建、按秩数派发、屏障纪律）
//!
//! # 并发模型
//!
//! 严格 SPMD：计划按配置顺序执行；计划内的顺序为
//! （可选的映射构建）→ 计数全归约 → 数据与编号的聚集或广播 →
//! 本地回填；每条计划后的耦合组屏障建立先行发生边。
//!
//! # 示例
//!
//! ```
//! use cc_comm::{run_spmd, CommBackend};
//! use cc_coupler::{ConcurrentDataTransfer, CouplerConfig, CouplingContext};
//! use cc_runtime::{ConnKind, DataStorage, DofHandle};
//!
//! // 2 个发送秩聚集到 1 个接收秩
//! run_spmd(3, |comm| {
//!     let rank = comm.rank();
//!     let mut ctx = CouplingContext::new(rank, "Coupling");
//!     ctx.namespaces.register("src", vec![0, 1]);
//!     ctx.namespaces.register("dst", vec![2]);
//!     ctx.groups.register("Coupling", vec![0, 1, 2], Some(comm));
//!
//!     if rank < 2 {
//!         let mut ds = DataStorage::new("src");
//!         let ids = vec![rank as u64 * 2, rank as u64 * 2 + 1];
//!         ds.register_dofs("src_states", DofHandle::owned_with_zeros(1, ids.clone()).unwrap());
//!         ds.register_array("src_field", ids.iter().map(|&g| g as f64).collect());
//!         ctx.add_storage(ds);
//!     } else {
//!         let mut ds = DataStorage::new("dst");
//!         ds.register_dofs("dst_states", DofHandle::owned_with_zeros(1, (0..4).collect()).unwrap());
//!         ds.register_array("dst_field", vec![0.0; 4]);
//!         ctx.add_storage(ds);
//!     }
//!
//!     let config = CouplerConfig::new().with_transfer("src_field>dst_field", ConnKind::State);
//!     let mut coupler = ConcurrentDataTransfer::new("DataTransfer", config).unwrap();
//!     coupler.execute(&mut ctx).unwrap();
//!
//!     if rank == 2 {
//!         let array = ctx.storage("dst").unwrap().array("dst_field").unwrap();
//!         assert_eq!(array, &[0.0, 1.0, 2.0, 3.0]);
//!     }
//! });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod plan;
pub mod transform;

mod gather;
mod scatter;

// 重导出常用类型
pub use config::{CouplerConfig, IDENTITY_TRANSFORMER};
pub use context::CouplingContext;
pub use driver::ConcurrentDataTransfer;
pub use error::{CouplerError, CouplerResult};
pub use plan::{TransferPlan, TransferSpec};
pub use transform::{
    available_transformers, get_transformer, ConsToPrimTransformer, IdentityTransformer,
    PrimToConsTransformer, TruncateTransformer, VarSetTransformer,
};
