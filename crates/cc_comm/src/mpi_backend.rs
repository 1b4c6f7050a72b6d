// crates/cc_comm/src/mpi_backend.rs

//! 基于 rsmpi 的 MPI 后端
//!
//! 将 [`CommBackend`] 映射到真实的 MPI 集体调用。rsmpi 默认在
//! MPI 出错时中止进程（`MPI_ERRORS_ARE_FATAL`），与本项目的
//! 错误传播策略一致：集体操作没有部分失败语义。

use mpi::collective::SystemOperation;
use mpi::datatype::PartitionMut;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::*;

use crate::backend::{validate_subgroup_ranks, CommBackend, CommValue};
use crate::error::{CommError, CommResult};

/// MPI 运行时环境
///
/// 持有 rsmpi 的 `Universe`，析构时完成 `MPI_Finalize`。
/// 初始化与析构必须发生在同一线程。
pub struct MpiEnv {
    universe: mpi::environment::Universe,
}

impl MpiEnv {
    /// 初始化 MPI（重复初始化返回 `None`）
    pub fn init() -> Option<Self> {
        mpi::initialize().map(|universe| Self { universe })
    }

    /// 世界通信子
    pub fn world(&self) -> MpiComm {
        MpiComm {
            comm: self.universe.world(),
        }
    }
}

/// MPI 通信子句柄
pub struct MpiComm {
    comm: SimpleCommunicator,
}

impl CommBackend for MpiComm {
    #[inline]
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    #[inline]
    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn barrier(&self) -> CommResult<()> {
        self.comm.barrier();
        Ok(())
    }

    fn broadcast<T: CommValue>(&self, data: &mut [T], root: usize) -> CommResult<()> {
        if root >= self.size() {
            return Err(CommError::InvalidRoot {
                root,
                size: self.size(),
            });
        }
        self.comm
            .process_at_rank(root as i32)
            .broadcast_into(data);
        Ok(())
    }

    fn allreduce_max<T: CommValue>(&self, send: &[T], recv: &mut [T]) -> CommResult<()> {
        if send.len() != recv.len() {
            return Err(CommError::buffer_size("allreduce", send.len(), recv.len()));
        }
        self.comm
            .all_reduce_into(send, recv, &SystemOperation::max());
        Ok(())
    }

    fn gatherv<T: CommValue>(
        &self,
        send: &[T],
        recv: &mut [T],
        recvcounts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> CommResult<()> {
        if root >= self.size() {
            return Err(CommError::InvalidRoot {
                root,
                size: self.size(),
            });
        }
        let root_proc = self.comm.process_at_rank(root as i32);
        if self.rank() == root {
            if recvcounts.len() != self.size() || displs.len() != self.size() {
                return Err(CommError::buffer_size(
                    "recvcounts",
                    self.size(),
                    recvcounts.len(),
                ));
            }
            let counts: Vec<i32> = recvcounts.iter().map(|&c| c as i32).collect();
            let displs: Vec<i32> = displs.iter().map(|&d| d as i32).collect();
            let mut partition = PartitionMut::new(recv, &counts[..], &displs[..]);
            root_proc.gather_varcount_into_root(send, &mut partition);
        } else {
            root_proc.gather_varcount_into(send);
        }
        Ok(())
    }

    fn subgroup(&self, ranks: &[usize]) -> CommResult<Option<Self>> {
        validate_subgroup_ranks(ranks, self.size())?;
        // 按颜色切分；成员按旧秩排序重新编号，与 ranks 升序一致
        let color = if ranks.contains(&self.rank()) {
            Color::with_value(0)
        } else {
            Color::undefined()
        };
        Ok(self
            .comm
            .split_by_color(color)
            .map(|comm| MpiComm { comm }))
    }
}
