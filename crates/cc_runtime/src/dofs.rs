// crates/cc_runtime/src/dofs.rs

//! 全局自由度句柄
//!
//! 自由度（DOF）可以是状态（State）或节点（Node），由连接类型决定。
//! 每个自由度携带一个全局唯一编号与一个固定宽度的分量块；
//! 在分布式存储下，本地条目分为本秩拥有（owned）与影子（ghost）两类。

use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

// ============================================================
// 连接类型
// ============================================================

/// 连接类型：决定全局编号由哪个自由度句柄提供
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnKind {
    /// 状态自由度（单元/求解变量）
    State,
    /// 节点自由度（网格节点）
    Node,
}

impl ConnKind {
    /// 对应句柄套接字的后缀
    #[inline]
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::State => "states",
            Self::Node => "nodes",
        }
    }

    /// 指定命名空间下句柄套接字的完整名称（如 `flow_states`）
    #[inline]
    pub fn dofs_socket(&self, namespace: &str) -> String {
        format!("{}_{}", namespace, self.suffix())
    }
}

impl std::fmt::Display for ConnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State => write!(f, "State"),
            Self::Node => write!(f, "Node"),
        }
    }
}

// ============================================================
// 自由度句柄
// ============================================================

/// 全局自由度句柄
///
/// 本地条目按存储顺序编号（局部编号即下标）；每个条目携带：
/// - 全局编号 `global_ids[i]`
/// - 所有权标志 `owned[i]`（影子条目不参与发送）
/// - 宽度为 `width` 的分量块 `data[i*width..(i+1)*width]`
#[derive(Debug, Clone)]
pub struct DofHandle {
    width: usize,
    global_ids: Vec<u64>,
    owned: Vec<bool>,
    data: Vec<f64>,
}

impl DofHandle {
    /// 创建句柄
    ///
    /// 校验 `owned` 与 `global_ids` 等长、`data` 长度为条目数乘宽度。
    pub fn new(
        width: usize,
        global_ids: Vec<u64>,
        owned: Vec<bool>,
        data: Vec<f64>,
    ) -> RuntimeResult<Self> {
        if width == 0 {
            return Err(RuntimeError::size_mismatch("dof width", 1, 0));
        }
        if owned.len() != global_ids.len() {
            return Err(RuntimeError::size_mismatch(
                "owned flags",
                global_ids.len(),
                owned.len(),
            ));
        }
        if data.len() != global_ids.len() * width {
            return Err(RuntimeError::size_mismatch(
                "dof data",
                global_ids.len() * width,
                data.len(),
            ));
        }
        Ok(Self {
            width,
            global_ids,
            owned,
            data,
        })
    }

    /// 创建全部本秩拥有的句柄（数据初始化为零）
    pub fn owned_with_zeros(width: usize, global_ids: Vec<u64>) -> RuntimeResult<Self> {
        let n = global_ids.len();
        Self::new(width, global_ids, vec![true; n], vec![0.0; n * width])
    }

    /// 本地条目数（含影子）
    #[inline]
    pub fn len(&self) -> usize {
        self.global_ids.len()
    }

    /// 是否没有本地条目
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.global_ids.is_empty()
    }

    /// 分量宽度
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// 条目的全局编号
    #[inline]
    pub fn global_id(&self, idx: usize) -> u64 {
        self.global_ids[idx]
    }

    /// 条目是否本秩拥有
    #[inline]
    pub fn is_owned(&self, idx: usize) -> bool {
        self.owned[idx]
    }

    /// 本秩拥有的条目数
    pub fn nb_owned(&self) -> usize {
        self.owned.iter().filter(|&&o| o).count()
    }

    /// 全局编号切片
    #[inline]
    pub fn global_ids(&self) -> &[u64] {
        &self.global_ids
    }

    /// 全部分量数据
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// 全部分量数据（可变）
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// 条目的分量块
    #[inline]
    pub fn value(&self, idx: usize) -> &[f64] {
        &self.data[idx * self.width..(idx + 1) * self.width]
    }

    /// 条目的分量块（可变）
    #[inline]
    pub fn value_mut(&mut self, idx: usize) -> &mut [f64] {
        &mut self.data[idx * self.width..(idx + 1) * self.width]
    }
}

// ============================================================
// 测试
// ============================================================
