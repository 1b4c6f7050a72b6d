// crates/cc_runtime/src/storage.rs

//! 数据套接字存储
//!
//! 每个命名空间在其成员秩上持有一个存储，按名称管理字段缓冲区
//! （套接字）。套接字名称对外拼写为 `命名空间_套接字名`。
//!
//! 两种后备类型：
//! - 稠密数组：`numDofs × stride` 个 `f64`
//! - 全局自由度句柄：携带全局编号与固定宽度分量块
//!
//! # 配对套接字约定
//!
//! 句柄后备的套接字 `X` 伴随两个辅助编号套接字 `X_local`（局部编号）
//! 与 `X_global`（全局编号）；解析端通过两者的存在性识别句柄后备。

use std::collections::HashMap;

use crate::dofs::DofHandle;
use crate::error::{RuntimeError, RuntimeResult};

/// 套接字的后备数据
#[derive(Debug, Clone)]
pub enum SocketData {
    /// 稠密浮点数组
    Array(Vec<f64>),
    /// 全局自由度句柄
    Dofs(DofHandle),
}

/// 一个命名空间的套接字存储
#[derive(Debug, Clone)]
pub struct DataStorage {
    namespace: String,
    sockets: HashMap<String, SocketData>,
    order: Vec<String>,
}

impl DataStorage {
    /// 为指定命名空间创建空存储
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            sockets: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// 所属命名空间
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// 套接字是否存在
    #[inline]
    pub fn check_data(&self, name: &str) -> bool {
        self.sockets.contains_key(name)
    }

    fn insert(&mut self, name: String, data: SocketData) {
        if !self.sockets.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.sockets.insert(name, data);
    }

    /// 注册稠密数组套接字
    pub fn register_array(&mut self, name: impl Into<String>, data: Vec<f64>) {
        self.insert(name.into(), SocketData::Array(data));
    }

    /// 注册自由度句柄套接字（如 `flow_states`）
    pub fn register_dofs(&mut self, name: impl Into<String>, handle: DofHandle) {
        self.insert(name.into(), SocketData::Dofs(handle));
    }

    /// 注册句柄后备的分布式套接字
    ///
    /// 同时写入配对的 `_local` / `_global` 编号套接字，
    /// 供解析端识别句柄后备并查询编号。
    pub fn register_global_socket(&mut self, name: impl Into<String>, handle: DofHandle) {
        let name = name.into();
        let local: Vec<f64> = (0..handle.len()).map(|i| i as f64).collect();
        let global: Vec<f64> = handle.global_ids().iter().map(|&g| g as f64).collect();
        self.insert(format!("{}_local", name), SocketData::Array(local));
        self.insert(format!("{}_global", name), SocketData::Array(global));
        self.insert(name, SocketData::Dofs(handle));
    }

    /// 套接字 `name` 是否具有配对的 `_local` / `_global` 编号套接字
    pub fn has_global_pair(&self, name: &str) -> bool {
        self.check_data(&format!("{}_local", name)) && self.check_data(&format!("{}_global", name))
    }

    fn get(&self, name: &str) -> RuntimeResult<&SocketData> {
        self.sockets
            .get(name)
            .ok_or_else(|| RuntimeError::unknown_socket(&self.namespace, name))
    }

    /// 读取稠密数组套接字
    pub fn array(&self, name: &str) -> RuntimeResult<&[f64]> {
        match self.get(name)? {
            SocketData::Array(data) => Ok(data),
            SocketData::Dofs(_) => Err(RuntimeError::SocketKind {
                socket: name.to_string(),
                expected: "稠密数组",
            }),
        }
    }

    /// 读取稠密数组套接字（可变）
    pub fn array_mut(&mut self, name: &str) -> RuntimeResult<&mut [f64]> {
        let namespace = self.namespace.clone();
        match self
            .sockets
            .get_mut(name)
            .ok_or_else(|| RuntimeError::unknown_socket(namespace, name))?
        {
            SocketData::Array(data) => Ok(data),
            SocketData::Dofs(_) => Err(RuntimeError::SocketKind {
                socket: name.to_string(),
                expected: "稠密数组",
            }),
        }
    }

    /// 读取自由度句柄套接字
    pub fn dofs(&self, name: &str) -> RuntimeResult<&DofHandle> {
        match self.get(name)? {
            SocketData::Dofs(handle) => Ok(handle),
            SocketData::Array(_) => Err(RuntimeError::SocketKind {
                socket: name.to_string(),
                expected: "自由度句柄",
            }),
        }
    }

    /// 读取自由度句柄套接字（可变）
    pub fn dofs_mut(&mut self, name: &str) -> RuntimeResult<&mut DofHandle> {
        let namespace = self.namespace.clone();
        match self
            .sockets
            .get_mut(name)
            .ok_or_else(|| RuntimeError::unknown_socket(namespace, name))?
        {
            SocketData::Dofs(handle) => Ok(handle),
            SocketData::Array(_) => Err(RuntimeError::SocketKind {
                socket: name.to_string(),
                expected: "自由度句柄",
            }),
        }
    }

    /// 所有套接字名称（按注册顺序）
    pub fn socket_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// 套接字数量
    #[inline]
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_socket_roundtrip() {
        let mut ds = DataStorage::new("flow");
        ds.register_array("flow_density", vec![1.0, 2.0, 3.0]);

        assert!(ds.check_data("flow_density"));
        assert_eq!(ds.array("flow_density").unwrap(), &[1.0, 2.0, 3.0]);

        ds.array_mut("flow_density").unwrap()[0] = 9.0;
        assert_eq!(ds.array("flow_density").unwrap()[0], 9.0);
    }

    #[test]
    fn test_missing_socket() {
        let ds = DataStorage::new("flow");
        assert!(!ds.check_data("flow_density"));
        assert!(matches!(
            ds.array("flow_density"),
            Err(RuntimeError::UnknownSocket { .. })
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut ds = DataStorage::new("flow");
        ds.register_array("flow_density", vec![0.0]);
        assert!(matches!(
            ds.dofs("flow_density"),
            Err(RuntimeError::SocketKind { .. })
        ));
    }

    #[test]
    fn test_global_socket_pair() {
        let mut ds = DataStorage::new("flow");
        let handle = DofHandle::owned_with_zeros(2, vec![5, 8]).unwrap();
        ds.register_global_socket("flow_solution", handle);

        assert!(ds.has_global_pair("flow_solution"));
        assert!(ds.check_data("flow_solution_local"));
        assert_eq!(ds.array("flow_solution_global").unwrap(), &[5.0, 8.0]);
        assert_eq!(ds.dofs("flow_solution").unwrap().width(), 2);
    }

    #[test]
    fn test_plain_dofs_have_no_pair() {
        let mut ds = DataStorage::new("flow");
        let handle = DofHandle::owned_with_zeros(1, vec![0]).unwrap();
        ds.register_dofs("flow_states", handle);
        assert!(!ds.has_global_pair("flow_states"));
    }

    #[test]
    fn test_socket_names_in_order() {
        let mut ds = DataStorage::new("flow");
        ds.register_array("b", vec![]);
        ds.register_array("a", vec![]);
        let names: Vec<&str> = ds.socket_names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
