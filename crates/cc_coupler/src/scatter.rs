// crates/cc_coupler/src/scatter.rs

//! 散播引擎（单发送秩 → 多接收秩）
//!
//! 发送秩（根秩）持有全局完备的数据，将其自由度序列切分为
//! `nb_ranks` 个连续块。先广播两个计数向量公布各块大小，再逐块
//! 广播数据与全局编号；每个接收秩用懒构建的全局→局部编号映射
//! 过滤出本秩拥有的条目，经变量变换写入接收缓冲区。
//!
//! 采用逐块广播而非变长散发：每个接收秩必须看到全部编号
//! 才能过滤出本秩拥有的部分。映射中不存在的编号被静默丢弃
//! （接收侧不具备全局权威性）。

use std::collections::HashMap;

use cc_comm::CommBackend;

use crate::context::CouplingContext;
use crate::error::{CouplerError, CouplerResult};
use crate::plan::{root_process, socket_slice, socket_slice_mut, TransferPlan};
use crate::transform::VarSetTransformer;

/// 根秩侧计数装配：自由度序列的近似均匀连续切分（余数靠前）
///
/// 切分方式不影响正确性：每个接收秩都会看到全部编号。
fn fill_send_counts(
    plan: &TransferPlan,
    n_dofs: usize,
    counts: &mut [u64],
    id_counts: &mut [u64],
) {
    let nb_ranks = counts.len();
    let base = n_dofs / nb_ranks;
    let rem = n_dofs % nb_ranks;
    for r in 0..nb_ranks {
        let chunk = base + usize::from(r < rem);
        id_counts[r] = chunk as u64;
        counts[r] = (chunk * plan.send_stride) as u64;
    }
}

/// 执行一条散播计划
///
/// 前置条件：`nb_ranks_send == 1`；一对一传输同样走本路径
/// （单接收秩的退化块循环）。子组内的每个秩都必须进入本调用。
/// `global_to_local` 为本条传输的懒构建映射，首次调用时在接收秩
/// 上构建，此后只读。
pub(crate) fn scatter_data<C: CommBackend>(
    plan: &TransferPlan,
    transformer: &mut dyn VarSetTransformer,
    global_to_local: &mut Option<HashMap<u64, usize>>,
    ctx: &mut CouplingContext<C>,
) -> CouplerResult<()> {
    let world_rank = ctx.world_rank;
    let namespaces = &ctx.namespaces;
    let groups = &ctx.groups;
    let storages = &mut ctx.storages;

    log::info!(
        "scatter_data from namespace [{}] to namespace [{}] within group [{}] => start",
        plan.nsp_send,
        plan.nsp_recv,
        plan.group_name
    );

    let group = groups.get(&plan.group_name)?;
    let comm = group.comm().ok_or_else(|| {
        CouplerError::config(format!(
            "秩 {} 不持有子组 [{}] 的通信子",
            world_rank, plan.group_name
        ))
    })?;
    let nb_ranks = comm.size();
    debug_assert!(nb_ranks > 0);
    let grank = comm.rank();

    let is_sender = namespaces.is_rank_in(&plan.nsp_send, world_rank)?;
    let is_recver = namespaces.is_rank_in(&plan.nsp_recv, world_rank)?;
    if !is_sender && !is_recver {
        return Err(CouplerError::Foundation(cc_foundation::CcError::internal(
            format!("秩 {} 既不属于发送也不属于接收命名空间", world_rank),
        )));
    }

    // 懒构建全局→局部编号映射：每条传输每秩至多一次
    if is_recver && global_to_local.is_none() {
        let ds = storages
            .get(&plan.nsp_recv)
            .ok_or_else(|| CouplerError::config(format!("缺少命名空间存储: {}", plan.nsp_recv)))?;
        let dofs = ds.dofs(&plan.dofs_name)?;
        let map: HashMap<u64, usize> = (0..dofs.len())
            .map(|i| (dofs.global_id(i), i))
            .collect();
        log::debug!(
            "scatter_data => built global-to-local map with {} entries",
            map.len()
        );
        *global_to_local = Some(map);
    }

    // 步骤 A：根秩公布逐接收块的计数
    let mut counts = vec![0u64; nb_ranks];
    let mut id_counts = vec![0u64; nb_ranks];
    if is_sender {
        let ds = storages
            .get(&plan.nsp_send)
            .ok_or_else(|| CouplerError::config(format!("缺少命名空间存储: {}", plan.nsp_send)))?;
        let dofs = ds.dofs(&plan.dofs_name)?;
        fill_send_counts(plan, dofs.len(), &mut counts, &mut id_counts);
    }

    let root = root_process(comm, is_sender)?;
    log::debug!("scatter_data => root = {}", root);
    comm.broadcast(&mut counts, root)?;
    comm.broadcast(&mut id_counts, root)?;
    log::debug!(
        "scatter_data => sendcounts = {:?}, sendIDcounts = {:?}",
        counts,
        id_counts
    );

    // 步骤 B：逐块广播并在接收秩过滤回填
    let mut cursor = 0usize;
    let mut id_cursor = 0usize;
    for r in 0..nb_ranks {
        let send_size = counts[r] as usize;
        let id_size = id_counts[r] as usize;
        if id_size == 0 {
            // 空块：所有秩均知计数，一致跳过
            continue;
        }
        if send_size != id_size * plan.send_stride {
            return Err(CouplerError::size_mismatch(
                "sendcounts[r]",
                id_size * plan.send_stride,
                send_size,
            ));
        }
        let stride = send_size / id_size;
        debug_assert!(stride >= 1);

        let mut databuf = vec![0.0f64; send_size];
        let mut idbuf = vec![0u64; id_size];
        if grank == root {
            let ds = storages
                .get(&plan.nsp_send)
                .ok_or_else(|| CouplerError::config(format!("缺少命名空间存储: {}", plan.nsp_send)))?;
            let src = socket_slice(ds, &plan.array_socket)?;
            if cursor + send_size > src.len() {
                return Err(CouplerError::size_mismatch(
                    "send cursor",
                    cursor + send_size,
                    src.len(),
                ));
            }
            databuf.copy_from_slice(&src[cursor..cursor + send_size]);

            let dofs = ds.dofs(&plan.dofs_name)?;
            for (s, id) in idbuf.iter_mut().enumerate() {
                *id = dofs.global_id(id_cursor + s);
            }
        }

        comm.broadcast(&mut databuf, root)?;
        comm.broadcast(&mut idbuf, root)?;

        if grank != root && is_recver {
            // 找到本秩拥有的全局编号时，把数据写进对应的局部位置
            let map = global_to_local
                .as_ref()
                .expect("映射已在本次调用前构建");
            let ds = storages
                .get_mut(&plan.nsp_recv)
                .ok_or_else(|| CouplerError::config(format!("缺少命名空间存储: {}", plan.nsp_recv)))?;
            let dst = socket_slice_mut(ds, &plan.array_socket)?;
            let recv_stride = plan.recv_stride;
            for (j, g) in idbuf.iter().enumerate() {
                if let Some(&local) = map.get(g) {
                    let r0 = local * recv_stride;
                    if r0 + recv_stride > dst.len() {
                        return Err(CouplerError::Foundation(
                            cc_foundation::CcError::index_out_of_bounds(
                                "LocalId",
                                local,
                                dst.len() / recv_stride,
                            ),
                        ));
                    }
                    let s0 = j * stride;
                    transformer
                        .transform(&databuf[s0..s0 + stride], &mut dst[r0..r0 + recv_stride]);
                }
            }
        }

        cursor += send_size;
        id_cursor += id_size;
    }

    log::info!(
        "scatter_data from namespace [{}] to namespace [{}] within group [{}] => end",
        plan.nsp_send,
        plan.nsp_recv,
        plan.group_name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_plan(send_stride: usize) -> TransferPlan {
        TransferPlan {
            nsp_send: "a".to_string(),
            nsp_recv: "b".to_string(),
            send_socket: "a_x".to_string(),
            recv_socket: "b_y".to_string(),
            nb_ranks_send: 1,
            nb_ranks_recv: 3,
            dofs_name: "a_states".to_string(),
            array_socket: "a_x".to_string(),
            array_size: 0,
            send_stride,
            recv_stride: send_stride,
            group_name: "g0".to_string(),
        }
    }

    #[test]
    fn test_fill_send_counts_even_split() {
        let plan = dummy_plan(2);
        let mut counts = vec![0u64; 4];
        let mut id_counts = vec![0u64; 4];
        fill_send_counts(&plan, 6, &mut counts, &mut id_counts);
        assert_eq!(id_counts, vec![2, 2, 1, 1]);
        assert_eq!(counts, vec![4, 4, 2, 2]);
    }

    #[test]
    fn test_fill_send_counts_fewer_dofs_than_ranks() {
        let plan = dummy_plan(1);
        let mut counts = vec![0u64; 4];
        let mut id_counts = vec![0u64; 4];
        fill_send_counts(&plan, 2, &mut counts, &mut id_counts);
        assert_eq!(id_counts, vec![1, 1, 0, 0]);
        assert_eq!(counts, vec![1, 1, 0, 0]);
    }
}
