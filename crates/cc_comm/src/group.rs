// crates/cc_comm/src/group.rs

//! 命名秩组注册表
//!
//! 维护命名的秩子集（命名空间组、耦合组、每传输子组）及其通信子。
//! 组在进程生命周期内常驻，不做动态销毁。

use std::collections::HashMap;

use crate::backend::CommBackend;
use crate::error::{CommError, CommResult};

/// 一个命名秩组
///
/// `world_ranks` 为组成员的世界秩（升序）；组内秩即成员在该列表中的位置。
/// `comm` 仅在成员秩上为 `Some`。
pub struct RankGroup<C: CommBackend> {
    name: String,
    world_ranks: Vec<usize>,
    comm: Option<C>,
}

impl<C: CommBackend> RankGroup<C> {
    /// 组名
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 成员的世界秩（升序）
    #[inline]
    pub fn world_ranks(&self) -> &[usize] {
        &self.world_ranks
    }

    /// 成员数量
    #[inline]
    pub fn nb_ranks(&self) -> usize {
        self.world_ranks.len()
    }

    /// 本秩持有的通信子（非成员为 `None`）
    #[inline]
    pub fn comm(&self) -> Option<&C> {
        self.comm.as_ref()
    }

    /// 世界秩是否属于本组
    #[inline]
    pub fn contains_world_rank(&self, world_rank: usize) -> bool {
        self.world_ranks.binary_search(&world_rank).is_ok()
    }

    /// 世界秩在组内的秩（位置）
    #[inline]
    pub fn local_rank_of(&self, world_rank: usize) -> Option<usize> {
        self.world_ranks.binary_search(&world_rank).ok()
    }
}

/// 秩组注册表
///
/// 按名称管理所有秩组；注册顺序保留以便诊断输出。
pub struct GroupRegistry<C: CommBackend> {
    groups: HashMap<String, RankGroup<C>>,
    order: Vec<String>,
}

impl<C: CommBackend> GroupRegistry<C> {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// 注册一个组
    ///
    /// `world_ranks` 会被排序去重；重复注册同名组将覆盖旧组。
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mut world_ranks: Vec<usize>,
        comm: Option<C>,
    ) {
        let name = name.into();
        world_ranks.sort_unstable();
        world_ranks.dedup();
        log::debug!(
            "register group [{}] with world ranks {:?}",
            name,
            world_ranks
        );
        if !self.groups.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.groups.insert(
            name.clone(),
            RankGroup {
                name,
                world_ranks,
                comm,
            },
        );
    }

    /// 按名称获取组
    pub fn get(&self, name: &str) -> CommResult<&RankGroup<C>> {
        self.groups
            .get(name)
            .ok_or_else(|| CommError::UnknownGroup(name.to_string()))
    }

    /// 组是否存在
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// 已注册组的数量
    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 所有组名（按注册顺序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }
}

impl<C: CommBackend> Default for GroupRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{run_spmd, LocalComm};

    #[test]
    fn test_register_and_lookup() {
        run_spmd(1, |comm| {
            let mut registry: GroupRegistry<LocalComm> = GroupRegistry::new();
            registry.register("flow", vec![2, 0, 1], Some(comm));
            registry.register("heat", vec![3], None);

            let flow = registry.get("flow").unwrap();
            assert_eq!(flow.world_ranks(), &[0, 1, 2]);
            assert_eq!(flow.nb_ranks(), 3);
            assert!(flow.comm().is_some());
            assert!(flow.contains_world_rank(1));
            assert!(!flow.contains_world_rank(3));
            assert_eq!(flow.local_rank_of(2), Some(2));

            assert!(registry.get("heat").unwrap().comm().is_none());
            assert!(registry.get("missing").is_err());

            let names: Vec<&str> = registry.names().collect();
            assert_eq!(names, vec!["flow", "heat"]);
        });
    }

    #[test]
    fn test_duplicate_registration_overwrites() {
        let mut registry: GroupRegistry<LocalComm> = GroupRegistry::new();
        registry.register("g", vec![0, 1], None);
        registry.register("g", vec![2], None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("g").unwrap().world_ranks(), &[2]);
    }
}
