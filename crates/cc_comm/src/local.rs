// crates/cc_comm/src/local.rs

//! 进程内 SPMD 后端
//!
//! 将 N 个“秩”映射为进程内的 N 个线程，集体操作通过共享的
//! 会合槽（rendezvous slot）实现。语义与阻塞式 MPI 集体调用一致：
//! 每个秩进入同一个集体调用后才能继续，遗漏秩会导致死锁。
//!
//! 本后端用于单机运行与测试：集体调用是真实执行的（而非记录式 mock），
//! 因此在其上运行的耦合逻辑与真实 MPI 后端走同一条代码路径。
//!
//! # 约束
//!
//! 同一通信子内的所有秩必须以相同顺序发起集体调用（SPMD 纪律），
//! 包括 [`LocalComm::subgroup`]：子组派生按调用序号配对。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::backend::{validate_subgroup_ranks, CommBackend, CommValue};
use crate::error::{CommError, CommResult};

// ============================================================
// 会合槽
// ============================================================

/// 单轮集体调用的状态
struct RendezvousState {
    /// 本轮已到达的秩数
    arrived: usize,
    /// 每个秩的贡献（字节载荷）
    slots: Vec<Option<Vec<u8>>>,
    /// 发布的全量结果，所有秩取走后清空
    result: Option<Arc<Vec<Vec<u8>>>>,
    /// 已取走结果的秩数
    taken: usize,
}

/// 通信子的共享状态
struct CommShared {
    size: usize,
    state: Mutex<RendezvousState>,
    cv: Condvar,
    /// 子组缓存：子组派生调用序号 -> 子组共享状态
    groups: Mutex<std::collections::HashMap<u64, Arc<CommShared>>>,
}

impl CommShared {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(RendezvousState {
                arrived: 0,
                slots: vec![None; size],
                result: None,
                taken: 0,
            }),
            cv: Condvar::new(),
            groups: Mutex::new(std::collections::HashMap::new()),
        }
    }
}

// ============================================================
// LocalComm
// ============================================================

/// 进程内通信子句柄
///
/// 每个秩（线程）持有一个实例；实例间通过 [`CommShared`] 会合。
pub struct LocalComm {
    rank: usize,
    shared: Arc<CommShared>,
    /// 子组派生调用计数（秩本地，SPMD 下各秩保持一致）
    group_seq: AtomicU64,
}

impl Clone for LocalComm {
    fn clone(&self) -> Self {
        Self {
            rank: self.rank,
            shared: Arc::clone(&self.shared),
            group_seq: AtomicU64::new(self.group_seq.load(Ordering::Relaxed)),
        }
    }
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

impl LocalComm {
    fn from_parts(rank: usize, shared: Arc<CommShared>) -> Self {
        Self {
            rank,
            shared,
            group_seq: AtomicU64::new(0),
        }
    }

    /// 全交换原语：所有秩存入各自的字节载荷，返回按秩排列的全量载荷
    ///
    /// 所有集体操作都建立在这一原语之上。
    fn exchange(&self, payload: Vec<u8>) -> CommResult<Arc<Vec<Vec<u8>>>> {
        let sh = &self.shared;
        let mut st = sh.state.lock();

        // 等待上一轮结果被全部取走
        while st.result.is_some() {
            sh.cv.wait(&mut st);
        }
        debug_assert!(st.slots[self.rank].is_none(), "同一秩重复进入集体调用");
        st.slots[self.rank] = Some(payload);
        st.arrived += 1;

        if st.arrived == sh.size {
            // 最后到达者发布结果
            let all: Vec<Vec<u8>> = st
                .slots
                .iter_mut()
                .map(|s| s.take().unwrap_or_default())
                .collect();
            st.result = Some(Arc::new(all));
            st.taken = 0;
            st.arrived = 0;
            sh.cv.notify_all();
        } else {
            while st.result.is_none() {
                sh.cv.wait(&mut st);
            }
        }

        let res = Arc::clone(st.result.as_ref().expect("已发布"));
        st.taken += 1;
        if st.taken == sh.size {
            st.result = None;
            sh.cv.notify_all();
        }
        Ok(res)
    }
}

// ============================================================
// 字节编解码
// ============================================================

fn to_bytes<T: CommValue>(data: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(data).to_vec()
}

/// 将字节载荷解码到新分配的向量
///
/// 载荷来自 `Vec<u8>`，对齐无保证，因此复制而非转借。
fn from_bytes<T: CommValue>(bytes: &[u8]) -> CommResult<Vec<T>> {
    let elem = std::mem::size_of::<T>();
    if elem == 0 || bytes.len() % elem != 0 {
        return Err(CommError::buffer_size("payload", 0, bytes.len()));
    }
    let n = bytes.len() / elem;
    let mut out = vec![T::zeroed(); n];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
    Ok(out)
}

fn copy_from_bytes<T: CommValue>(bytes: &[u8], dst: &mut [T]) -> CommResult<()> {
    let expected = std::mem::size_of_val(dst);
    if bytes.len() != expected {
        return Err(CommError::buffer_size("broadcast", expected, bytes.len()));
    }
    bytemuck::cast_slice_mut::<T, u8>(dst).copy_from_slice(bytes);
    Ok(())
}

// ============================================================
// CommBackend 实现
// ============================================================

impl CommBackend for LocalComm {
    #[inline]
    fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) -> CommResult<()> {
        self.exchange(Vec::new())?;
        Ok(())
    }

    fn broadcast<T: CommValue>(&self, data: &mut [T], root: usize) -> CommResult<()> {
        if root >= self.size() {
            return Err(CommError::InvalidRoot {
                root,
                size: self.size(),
            });
        }
        let payload = if self.rank == root {
            to_bytes(data)
        } else {
            Vec::new()
        };
        let all = self.exchange(payload)?;
        if self.rank != root {
            copy_from_bytes(&all[root], data)?;
        }
        Ok(())
    }

    fn allreduce_max<T: CommValue>(&self, send: &[T], recv: &mut [T]) -> CommResult<()> {
        if send.len() != recv.len() {
            return Err(CommError::buffer_size("allreduce", send.len(), recv.len()));
        }
        let all = self.exchange(to_bytes(send))?;
        recv.copy_from_slice(send);
        for (r, payload) in all.iter().enumerate() {
            if r == self.rank {
                continue;
            }
            let vals: Vec<T> = from_bytes(payload)?;
            if vals.len() != recv.len() {
                return Err(CommError::buffer_size("allreduce", recv.len(), vals.len()));
            }
            for (dst, v) in recv.iter_mut().zip(vals) {
                if v > *dst {
                    *dst = v;
                }
            }
        }
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
        let all = self.exchange(to_bytes(send))?;
        if self.rank == root {
            if recvcounts.len() != self.size() || displs.len() != self.size() {
                return Err(CommError::buffer_size(
                    "recvcounts",
                    self.size(),
                    recvcounts.len(),
                ));
            }
            for r in 0..self.size() {
                let vals: Vec<T> = from_bytes(&all[r])?;
                if vals.len() != recvcounts[r] {
                    return Err(CommError::buffer_size("gatherv", recvcounts[r], vals.len()));
                }
                let end = displs[r] + recvcounts[r];
                if end > recv.len() {
                    return Err(CommError::buffer_size("gatherv recv", end, recv.len()));
                }
                recv[displs[r]..end].copy_from_slice(&vals);
            }
        }
        Ok(())
    }

    fn subgroup(&self, ranks: &[usize]) -> CommResult<Option<Self>> {
        validate_subgroup_ranks(ranks, self.size())?;

        let seq = self.group_seq.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "subgroup => seq {} with {} members (parent size {})",
            seq,
            ranks.len(),
            self.size()
        );
        let sub = {
            let mut groups = self.shared.groups.lock();
            Arc::clone(
                groups
                    .entry(seq)
                    .or_insert_with(|| Arc::new(CommShared::new(ranks.len()))),
            )
        };
        if sub.size != ranks.len() {
            return Err(CommError::InvalidSubgroup {
                message: format!(
                    "子组派生参数不一致: 期望 {} 个成员, 实际 {}",
                    sub.size,
                    ranks.len()
                ),
            });
        }
        Ok(ranks
            .iter()
            .position(|&r| r == self.rank)
            .map(|new_rank| LocalComm::from_parts(new_rank, sub)))
    }
}

// ============================================================
// SPMD 运行辅助
// ============================================================

/// 以 `size` 个线程作为 `size` 个秩运行 SPMD 闭包
///
/// 每个线程获得自己的 [`LocalComm`] 句柄（世界通信子）。
/// 任一秩 panic 会在作用域结束时向调用方传播。
///
/// # 示例
///
/// ```
/// use cc_comm::backend::CommBackend;
/// use cc_comm::local::run_spmd;
///
/// run_spmd(3, |comm| {
///     comm.barrier().unwrap();
/// });
/// ```
pub fn run_spmd<F>(size: usize, f: F)
where
    F: Fn(LocalComm) + Send + Sync,
{
    assert!(size > 0, "SPMD 秩数必须为正");
    let shared = Arc::new(CommShared::new(size));
    std::thread::scope(|scope| {
        for rank in 0..size {
            let comm = LocalComm::from_parts(rank, Arc::clone(&shared));
            let f = &f;
            scope.spawn(move || f(comm));
        }
    });
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_and_size() {
        run_spmd(4, |comm| {
            assert_eq!(comm.size(), 4);
            assert!(comm.rank() < 4);
        });
    }

    #[test]
    fn test_barrier_completes() {
        run_spmd(3, |comm| {
            for _ in 0..10 {
                comm.barrier().unwrap();
            }
        });
    }

    #[test]
    fn test_broadcast() {
        run_spmd(4, |comm| {
            let mut data = if comm.rank() == 2 {
                vec![1.5f64, 2.5, 3.5]
            } else {
                vec![0.0f64; 3]
            };
            comm.broadcast(&mut data, 2).unwrap();
            assert_eq!(data, vec![1.5, 2.5, 3.5]);
        });
    }

    #[test]
    fn test_allreduce_max() {
        run_spmd(4, |comm| {
            let send = vec![comm.rank() as u64, 10 - comm.rank() as u64];
            let mut recv = vec![0u64; 2];
            comm.allreduce_max(&send, &mut recv).unwrap();
            assert_eq!(recv, vec![3, 10]);
        });
    }

    #[test]
    fn test_allreduce_max_scalar_with_sentinel() {
        // 根秩发现模式：候选者贡献自己的秩，其余贡献 -1
        run_spmd(4, |comm| {
            let candidate = if comm.rank() == 1 { 1i32 } else { -1 };
            let root = comm.allreduce_max_scalar(candidate).unwrap();
            assert_eq!(root, 1);
        });
    }

    #[test]
    fn test_gatherv() {
        // 秩 r 贡献 r+1 个元素，全部为 r 的值
        run_spmd(3, |comm| {
            let r = comm.rank();
            let send = vec![r as f64; r + 1];
            let counts = vec![1usize, 2, 3];
            let displs = vec![0usize, 1, 3];
            let mut recv = vec![0.0f64; 6];
            comm.gatherv(&send, &mut recv, &counts, &displs, 0).unwrap();
            if r == 0 {
                assert_eq!(recv, vec![0.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
            }
        });
    }

    #[test]
    fn test_gatherv_empty_contribution() {
        // 空贡献的秩：计数为零，载荷为空
        run_spmd(3, |comm| {
            let r = comm.rank();
            let send: Vec<u64> = if r == 1 { vec![] } else { vec![r as u64] };
            let counts = vec![1usize, 0, 1];
            let displs = vec![0usize, 1, 1];
            let mut recv = vec![0u64; 2];
            comm.gatherv(&send, &mut recv, &counts, &displs, 0).unwrap();
            if r == 0 {
                assert_eq!(recv, vec![0, 2]);
            }
        });
    }

    #[test]
    fn test_subgroup_membership() {
        run_spmd(4, |comm| {
            let sub = comm.subgroup(&[1, 3]).unwrap();
            match comm.rank() {
                1 => {
                    let sub = sub.expect("成员应获得子通信子");
                    assert_eq!(sub.rank(), 0);
                    assert_eq!(sub.size(), 2);
                }
                3 => {
                    let sub = sub.expect("成员应获得子通信子");
                    assert_eq!(sub.rank(), 1);
                }
                _ => assert!(sub.is_none()),
            }
        });
    }

    #[test]
    fn test_subgroup_collectives() {
        run_spmd(4, |comm| {
            let sub = comm.subgroup(&[0, 2]).unwrap();
            if let Some(sub) = sub {
                let send = [comm.rank() as u64];
                let mut recv = [0u64];
                sub.allreduce_max(&send, &mut recv).unwrap();
                assert_eq!(recv[0], 2);
            }
            // 非成员不得进入子组集体调用，但可继续父通信子操作
            comm.barrier().unwrap();
        });
    }

    #[test]
    fn test_subgroup_rejects_bad_ranks() {
        run_spmd(2, |comm| {
            assert!(comm.subgroup(&[]).is_err());
            assert!(comm.subgroup(&[0, 5]).is_err());
        });
    }

    #[test]
    fn test_single_rank_world() {
        run_spmd(1, |comm| {
            comm.barrier().unwrap();
            let mut data = vec![7u64];
            comm.broadcast(&mut data, 0).unwrap();
            assert_eq!(data[0], 7);
        });
    }
}
