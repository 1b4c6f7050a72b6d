// crates/cc_runtime/src/namespace.rs

//! 命名空间注册表
//!
//! 命名空间是仿真的命名分区，拥有自己的网格、自由度与秩子集。
//! 注册表在每个秩上由配置构建，内容全局一致，查询不涉及通信。

use std::collections::HashMap;

use crate::error::{RuntimeError, RuntimeResult};

/// 一个命名空间
///
/// `world_ranks` 为该命名空间占有的世界秩（升序）。
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    world_ranks: Vec<usize>,
}

impl Namespace {
    /// 命名空间名称
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 成员的世界秩（升序）
    #[inline]
    pub fn world_ranks(&self) -> &[usize] {
        &self.world_ranks
    }

    /// 成员秩数量
    #[inline]
    pub fn nb_ranks(&self) -> usize {
        self.world_ranks.len()
    }

    /// 世界秩是否属于本命名空间
    #[inline]
    pub fn contains_rank(&self, world_rank: usize) -> bool {
        self.world_ranks.binary_search(&world_rank).is_ok()
    }
}

/// 命名空间注册表
#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    map: HashMap<String, Namespace>,
    order: Vec<String>,
}

impl NamespaceRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命名空间
    ///
    /// 秩列表会被排序去重；重复注册同名空间将覆盖旧条目。
    pub fn register(&mut self, name: impl Into<String>, mut world_ranks: Vec<usize>) {
        let name = name.into();
        world_ranks.sort_unstable();
        world_ranks.dedup();
        if !self.map.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.map.insert(
            name.clone(),
            Namespace { name, world_ranks },
        );
    }

    /// 按名称解析命名空间
    pub fn get(&self, name: &str) -> RuntimeResult<&Namespace> {
        self.map
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownNamespace(name.to_string()))
    }

    /// 世界秩是否属于指定命名空间
    pub fn is_rank_in(&self, name: &str, world_rank: usize) -> RuntimeResult<bool> {
        Ok(self.get(name)?.contains_rank(world_rank))
    }

    /// 命名空间是否存在
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// 命名空间数量
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 所有命名空间名称（按注册顺序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_query() {
        let mut registry = NamespaceRegistry::new();
        registry.register("flow", vec![3, 0, 1, 0]);
        registry.register("heat", vec![4]);

        let flow = registry.get("flow").unwrap();
        assert_eq!(flow.world_ranks(), &[0, 1, 3]);
        assert_eq!(flow.nb_ranks(), 3);
        assert!(flow.contains_rank(3));
        assert!(!flow.contains_rank(2));

        assert!(registry.is_rank_in("heat", 4).unwrap());
        assert!(!registry.is_rank_in("heat", 0).unwrap());
        assert!(registry.is_rank_in("missing", 0).is_err());
    }

    #[test]
    fn test_names_in_order() {
        let mut registry = NamespaceRegistry::new();
        registry.register("b", vec![0]);
        registry.register("a", vec![1]);
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
