// crates/cc_coupler/src/gather.rs

//! 聚集引擎（多发送秩 → 单接收秩）
//!
//! 发送侧各秩遍历自由度句柄，对每个本秩拥有的自由度发出一个
//! 变换后的分量块与其全局编号。计数以最大值全归约达成一致，
//! 位移为计数的前缀和；数据与编号各做一次变长聚集。
//! 接收根秩按 `array[g*recv_stride + c] = block[c]` 回填。
//!
//! 编号缓冲区每 `recv_stride` 个数据标量对应一个全局编号
//! （两次聚集的计数按该比例缩放并以断言保证整除）。

use smallvec::{smallvec, SmallVec};

use cc_comm::CommBackend;
use cc_runtime::DataStorage;

use crate::context::CouplingContext;
use crate::error::{CouplerError, CouplerResult};
use crate::plan::{root_process, socket_slice, socket_slice_mut, TransferPlan};
use crate::transform::VarSetTransformer;

/// 发送侧装配：对每个本秩拥有的自由度发出变换后的分量块与全局编号
fn fill_send_data(
    plan: &TransferPlan,
    transformer: &mut dyn VarSetTransformer,
    ds: &DataStorage,
) -> CouplerResult<(Vec<f64>, Vec<u64>)> {
    let dofs = ds.dofs(&plan.dofs_name)?;
    let src = socket_slice(ds, &plan.array_socket)?;
    let send_stride = plan.send_stride;
    let recv_stride = plan.recv_stride;

    let mut sendbuf = Vec::with_capacity(dofs.nb_owned() * recv_stride);
    let mut send_ids = Vec::with_capacity(dofs.nb_owned());
    let mut block: SmallVec<[f64; 8]> = smallvec![0.0; recv_stride];

    for i in 0..dofs.len() {
        if !dofs.is_owned(i) {
            continue;
        }
        let start = i * send_stride;
        if start + send_stride > src.len() {
            return Err(CouplerError::size_mismatch(
                "send socket",
                start + send_stride,
                src.len(),
            ));
        }
        transformer.transform(&src[start..start + send_stride], &mut block);
        sendbuf.extend_from_slice(&block);
        send_ids.push(dofs.global_id(i));
    }
    Ok((sendbuf, send_ids))
}

/// 执行一条聚集计划
///
/// 前置条件：`nb_ranks_send > 1 && nb_ranks_recv == 1`。
/// 子组内的每个秩都必须进入本调用。
pub(crate) fn gather_data<C: CommBackend>(
    plan: &TransferPlan,
    transformer: &mut dyn VarSetTransformer,
    ctx: &mut CouplingContext<C>,
) -> CouplerResult<()> {
    let world_rank = ctx.world_rank;
    let namespaces = &ctx.namespaces;
    let groups = &ctx.groups;
    let storages = &mut ctx.storages;

    log::info!(
        "gather_data from namespace [{}] to namespace [{}] => start",
        plan.nsp_send,
        plan.nsp_recv
    );

    let group = groups.get(&plan.group_name)?;
    let comm = group.comm().ok_or_else(|| {
        CouplerError::config(format!(
            "秩 {} 不持有子组 [{}] 的通信子",
            world_rank, plan.group_name
        ))
    })?;
    let nb_ranks = comm.size();
    let grank = comm.rank();

    let is_sender = namespaces.is_rank_in(&plan.nsp_send, world_rank)?;
    let is_recver = namespaces.is_rank_in(&plan.nsp_recv, world_rank)?;

    // 发送侧装配
    let mut sendbuf: Vec<f64> = Vec::new();
    let mut send_ids: Vec<u64> = Vec::new();
    if is_sender {
        let ds = storages
            .get(&plan.nsp_send)
            .ok_or_else(|| CouplerError::config(format!("缺少命名空间存储: {}", plan.nsp_send)))?;
        let (buf, ids) = fill_send_data(plan, transformer, ds)?;
        sendbuf = buf;
        send_ids = ids;
    }

    // 各秩计数达成一致：每秩在自己的槽位写入计数后取最大值
    let stride = plan.recv_stride;
    let mut counts_in = vec![0u64; nb_ranks];
    counts_in[grank] = sendbuf.len() as u64;
    let mut counts = vec![0u64; nb_ranks];
    comm.allreduce_max(&counts_in, &mut counts)?;
    log::debug!("gather_data => recvcounts = {:?}", counts);

    // 位移为计数的前缀和；编号计数按步长缩放
    let mut recvcounts = vec![0usize; nb_ranks];
    let mut displs = vec![0usize; nb_ranks];
    let mut id_counts = vec![0usize; nb_ranks];
    let mut id_displs = vec![0usize; nb_ranks];
    let mut tot_recv = 0usize;
    for r in 0..nb_ranks {
        let c = counts[r] as usize;
        if c % stride != 0 {
            return Err(CouplerError::size_mismatch("gather count % stride", 0, c % stride));
        }
        recvcounts[r] = c;
        displs[r] = tot_recv;
        id_counts[r] = c / stride;
        id_displs[r] = tot_recv / stride;
        tot_recv += c;
    }
    let tot_ids = tot_recv / stride;

    // 接收命名空间的根秩
    let root = root_process(comm, is_recver)?;

    let mut recvbuf = vec![0.0f64; if grank == root { tot_recv } else { 0 }];
    let mut recv_ids = vec![0u64; if grank == root { tot_ids } else { 0 }];

    // 数据与全局编号各聚集一次，计数与位移按同一比例缩放
    comm.gatherv(&sendbuf, &mut recvbuf, &recvcounts, &displs, root)?;
    comm.gatherv(&send_ids, &mut recv_ids, &id_counts, &id_displs, root)?;

    if grank == root {
        // 将聚集到的数据按全局编号重排进本地缓冲区
        let ds = storages
            .get_mut(&plan.nsp_recv)
            .ok_or_else(|| CouplerError::config(format!("缺少命名空间存储: {}", plan.nsp_recv)))?;
        let array = socket_slice_mut(ds, &plan.array_socket)?;
        if array.len() != tot_recv {
            return Err(CouplerError::size_mismatch(
                "tot_recv_count",
                array.len(),
                tot_recv,
            ));
        }
        for k in 0..tot_ids {
            let g = recv_ids[k] as usize;
            let dst = g * stride;
            if dst + stride > array.len() {
                return Err(CouplerError::Foundation(
                    cc_foundation::CcError::index_out_of_bounds("GlobalId", g, array.len() / stride),
                ));
            }
            array[dst..dst + stride].copy_from_slice(&recvbuf[k * stride..(k + 1) * stride]);
        }
    }

    log::info!(
        "gather_data from namespace [{}] to namespace [{}] => end",
        plan.nsp_send,
        plan.nsp_recv
    );
    Ok(())
}
