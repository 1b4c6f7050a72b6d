// crates/cc_coupler/src/context.rs

//! 耦合上下文
//!
//! 将进程级的注册表（命名空间、秩组、各命名空间的数据存储）
//! 收拢为一个显式对象，注入耦合驱动。这样测试可以注入进程内
//! 通信后端，而无需全局单例。

use std::collections::HashMap;

use cc_comm::{CommBackend, GroupRegistry};
use cc_runtime::{DataStorage, NamespaceRegistry, RuntimeError};

use crate::error::{CouplerError, CouplerResult};

/// 耦合上下文
///
/// 每个秩持有一份；`groups` 中必须注册耦合组
/// （名称为 `coupling_group`，通信子覆盖本秩）。
pub struct CouplingContext<C: CommBackend> {
    /// 本进程的世界秩
    pub world_rank: usize,
    /// 耦合组名称（本耦合器所属命名空间的秩集）
    pub coupling_group: String,
    /// 命名空间注册表（各秩内容一致）
    pub namespaces: NamespaceRegistry,
    /// 秩组注册表（命名空间组、耦合组、每传输子组）
    pub groups: GroupRegistry<C>,
    /// 各命名空间的数据存储（仅本秩所属的命名空间）
    pub storages: HashMap<String, DataStorage>,
}

impl<C: CommBackend> CouplingContext<C> {
    /// 创建空上下文
    pub fn new(world_rank: usize, coupling_group: impl Into<String>) -> Self {
        Self {
            world_rank,
            coupling_group: coupling_group.into(),
            namespaces: NamespaceRegistry::new(),
            groups: GroupRegistry::new(),
            storages: HashMap::new(),
        }
    }

    /// 登记一个命名空间的数据存储
    pub fn add_storage(&mut self, storage: DataStorage) {
        self.storages.insert(storage.namespace().to_string(), storage);
    }

    /// 按命名空间读取存储
    pub fn storage(&self, namespace: &str) -> CouplerResult<&DataStorage> {
        self.storages
            .get(namespace)
            .ok_or_else(|| RuntimeError::UnknownNamespace(namespace.to_string()).into())
    }

    /// 按命名空间读取存储（可变）
    pub fn storage_mut(&mut self, namespace: &str) -> CouplerResult<&mut DataStorage> {
        self.storages
            .get_mut(namespace)
            .ok_or_else(|| RuntimeError::UnknownNamespace(namespace.to_string()).into())
    }

    /// 耦合组通信子
    ///
    /// 本秩不属于耦合组时报配置错误：驱动只应在耦合组秩上运行。
    pub fn coupling_comm(&self) -> CouplerResult<&C> {
        let group = self.groups.get(&self.coupling_group)?;
        group.comm().ok_or_else(|| {
            CouplerError::config(format!(
                "秩 {} 不持有耦合组 [{}] 的通信子",
                self.world_rank, self.coupling_group
            ))
        })
    }

    /// 本秩在耦合组内的秩
    pub fn coupling_rank(&self) -> CouplerResult<usize> {
        let group = self.groups.get(&self.coupling_group)?;
        group.local_rank_of(self.world_rank).ok_or_else(|| {
            CouplerError::config(format!(
                "秩 {} 不属于耦合组 [{}]",
                self.world_rank, self.coupling_group
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_comm::{run_spmd, LocalComm};

    #[test]
    fn test_context_accessors() {
        run_spmd(2, |comm| {
            let rank = comm.rank();
            let mut ctx: CouplingContext<LocalComm> = CouplingContext::new(rank, "Coupling");
            ctx.namespaces.register("flow", vec![0, 1]);
            ctx.groups.register("Coupling", vec![0, 1], Some(comm));
            ctx.add_storage(DataStorage::new("flow"));

            assert_eq!(ctx.coupling_rank().unwrap(), rank);
            assert!(ctx.coupling_comm().is_ok());
            assert!(ctx.storage("flow").is_ok());
            assert!(ctx.storage("heat").is_err());
            ctx.storage_mut("flow")
                .unwrap()
                .register_array("flow_p", vec![0.0]);
        });
    }

    #[test]
    fn test_non_member_has_no_coupling_comm() {
        let mut ctx: CouplingContext<LocalComm> = CouplingContext::new(7, "Coupling");
        ctx.groups.register("Coupling", vec![0, 1], None);
        assert!(ctx.coupling_comm().is_err());
        assert!(ctx.coupling_rank().is_err());
    }
}
