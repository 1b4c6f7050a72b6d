// crates/cc_comm/src/backend.rs

//! 集体通信后端抽象
//!
//! 提供耦合器所需集体操作的统一接口。所有方法使用 `&self` 实例方法，
//! 后端实例本身即是一个通信子（communicator）的句柄。
//!
//! # 设计说明
//!
//! 耦合器严格遵循 SPMD 模型：指定通信子内的每个秩都必须进入同一个
//! 集体调用，遗漏任何一个秩都会导致死锁。集体调用是仅有的阻塞点。
//!
//! 实现者：
//! - [`crate::local::LocalComm`]: 进程内多线程 SPMD 后端，供测试与单机运行
//! - `MpiComm`（`mpi` feature）: 基于 rsmpi 的真实 MPI 后端
//!
//! # 示例
//!
//! ```
//! use cc_comm::backend::CommBackend;
//! use cc_comm::local::run_spmd;
//!
//! run_spmd(4, |comm| {
//!     let mine = [comm.rank() as u64];
//!     let mut out = [0u64];
//!     comm.allreduce_max(&mine, &mut out).unwrap();
//!     assert_eq!(out[0], 3);
//! });
//! ```

use crate::error::CommResult;
use bytemuck::Pod;

/// 可通过集体调用传输的标量类型
///
/// 所有通信操作对该 trait 泛型，对应 MPI 的基本数据类型。
#[cfg(not(feature = "mpi"))]
pub trait CommValue: Pod + PartialOrd + Send + Sync + 'static {}

/// 可通过集体调用传输的标量类型
///
/// 启用 `mpi` feature 时额外要求 rsmpi 的 `Equivalence`，
/// 以便映射到对应的 MPI 数据类型。
#[cfg(feature = "mpi")]
pub trait CommValue: Pod + PartialOrd + Send + Sync + 'static + mpi::datatype::Equivalence {}

macro_rules! impl_comm_value {
    ($($t:ty),*) => {
        $(impl CommValue for $t {})*
    };
}

impl_comm_value!(f32, f64, i32, i64, u32, u64);

/// 集体通信后端 trait
///
/// 每个实例绑定一个通信子；[`CommBackend::subgroup`] 以集体方式
/// 派生子通信子。错误语义：任何失败都视为致命，由调用方向上传播。
pub trait CommBackend: Sized {
    /// 当前进程在本通信子内的秩
    fn rank(&self) -> usize;

    /// 通信子内的秩数量
    fn size(&self) -> usize;

    /// 栅栏同步
    ///
    /// 所有秩到达后才返回。
    fn barrier(&self) -> CommResult<()>;

    /// 从 `root` 广播 `data` 到所有秩
    ///
    /// 所有秩必须提供等长缓冲区；非根秩的内容被覆盖。
    fn broadcast<T: CommValue>(&self, data: &mut [T], root: usize) -> CommResult<()>;

    /// 逐元素最大值全归约
    ///
    /// `recv[i] = max over ranks of send[i]`，结果在所有秩可见。
    fn allreduce_max<T: CommValue>(&self, send: &[T], recv: &mut [T]) -> CommResult<()>;

    /// 变长聚集到根秩
    ///
    /// 秩 `r` 贡献 `send`（长度必须等于根秩视角的 `recvcounts[r]`），
    /// 根秩将其写入 `recv[displs[r]..displs[r] + recvcounts[r]]`。
    /// 非根秩的 `recv`、`recvcounts`、`displs` 被忽略。
    fn gatherv<T: CommValue>(
        &self,
        send: &[T],
        recv: &mut [T],
        recvcounts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> CommResult<()>;

    /// 以集体方式创建子通信子
    ///
    /// `ranks` 为本通信子内的成员秩，要求升序且无重复；
    /// 所有秩（含非成员）必须以相同参数进入本调用。
    /// 成员秩获得 `Some(子通信子)`，其中秩按 `ranks` 中的位置重新编号；
    /// 非成员秩获得 `None`。
    fn subgroup(&self, ranks: &[usize]) -> CommResult<Option<Self>>;

    /// 标量最大值全归约的便捷变体
    fn allreduce_max_scalar<T: CommValue>(&self, value: T) -> CommResult<T> {
        let send = [value];
        let mut recv = [value];
        self.allreduce_max(&send, &mut recv)?;
        Ok(recv[0])
    }
}

/// 校验子组秩列表：非空、升序、无重复、全部在 `0..size` 内
pub(crate) fn validate_subgroup_ranks(ranks: &[usize], size: usize) -> CommResult<()> {
    use crate::error::CommError;

    if ranks.is_empty() {
        return Err(CommError::InvalidSubgroup {
            message: "秩列表为空".to_string(),
        });
    }
    for w in ranks.windows(2) {
        if w[0] >= w[1] {
            return Err(CommError::InvalidSubgroup {
                message: format!("秩列表必须严格升序: {:?}", ranks),
            });
        }
    }
    let last = *ranks.last().expect("非空已校验");
    if last >= size {
        return Err(CommError::InvalidSubgroup {
            message: format!("秩 {} 超出通信子大小 {}", last, size),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subgroup_ranks() {
        assert!(validate_subgroup_ranks(&[0, 1, 3], 4).is_ok());
        assert!(validate_subgroup_ranks(&[], 4).is_err());
        assert!(validate_subgroup_ranks(&[1, 1, 2], 4).is_err());
        assert!(validate_subgroup_ranks(&[2, 1], 4).is_err());
        assert!(validate_subgroup_ranks(&[0, 4], 4).is_err());
    }
}
