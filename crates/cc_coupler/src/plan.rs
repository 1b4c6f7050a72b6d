// crates/cc_coupler/src/plan.rs

//! 传输规格解析与传输计划构建
//!
//! 每条配置的发送→接收对经过两步变为一条 [`TransferPlan`]：
//!
//! 1. [`create_transfer_group`]: 在耦合组上以最大值全归约求出参与秩
//!    （发送与接收命名空间秩集的并），据此派生并注册命名子组；
//! 2. [`build_plan`]: 在参与秩上解析套接字后备、求分量步长，并在
//!    子组上以最大值全归约达成两侧步长一致。
//!
//! 计划在首次执行时一次性构建，此后只读。

use cc_comm::CommBackend;
use cc_runtime::{ConnKind, DataStorage};

use crate::context::CouplingContext;
use crate::error::{CouplerError, CouplerResult};

// ============================================================
// 传输规格
// ============================================================

/// 解析后的传输规格
///
/// 原始形式为 `"nsA_sockX>nsB_sockY"`，`>` 两侧不允许空白。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    /// 发送命名空间
    pub nsp_send: String,
    /// 接收命名空间
    pub nsp_recv: String,
    /// 发送套接字完整名称（`nsA_sockX`）
    pub send_socket: String,
    /// 接收套接字完整名称（`nsB_sockY`）
    pub recv_socket: String,
}

impl TransferSpec {
    /// 解析规格字符串
    pub fn parse(spec: &str) -> CouplerResult<Self> {
        let mut sides = spec.split('>');
        let (send, recv) = match (sides.next(), sides.next(), sides.next()) {
            (Some(send), Some(recv), None) => (send, recv),
            _ => {
                return Err(CouplerError::invalid_spec(
                    spec,
                    "期望恰好一个 '>' 分隔符",
                ))
            }
        };
        let nsp_send = Self::namespace_of(spec, send)?;
        let nsp_recv = Self::namespace_of(spec, recv)?;
        Ok(Self {
            nsp_send,
            nsp_recv,
            send_socket: send.to_string(),
            recv_socket: recv.to_string(),
        })
    }

    /// 从 `命名空间_套接字名` 中提取命名空间
    fn namespace_of(spec: &str, socket: &str) -> CouplerResult<String> {
        let parts: Vec<&str> = socket.split('_').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(CouplerError::invalid_spec(
                spec,
                format!("套接字 '{}' 应为 '命名空间_套接字名' 形式", socket),
            ));
        }
        Ok(parts[0].to_string())
    }
}

// ============================================================
// 传输计划
// ============================================================

/// 一条传输的派生记录，构建完成后不可变
///
/// `dofs_name` / `array_socket` / `array_size` 是秩本地的：
/// 发送秩解析发送侧，接收秩解析接收侧（两侧均属时以接收侧为准）。
#[derive(Debug, Clone)]
pub struct TransferPlan {
    /// 发送命名空间
    pub nsp_send: String,
    /// 接收命名空间
    pub nsp_recv: String,
    /// 发送套接字完整名称
    pub send_socket: String,
    /// 接收套接字完整名称
    pub recv_socket: String,
    /// 发送命名空间的秩数
    pub nb_ranks_send: usize,
    /// 接收命名空间的秩数
    pub nb_ranks_recv: usize,
    /// 本秩一侧的自由度句柄套接字名称
    pub dofs_name: String,
    /// 本秩一侧的后备套接字名称
    pub array_socket: String,
    /// 本秩一侧的后备缓冲区长度
    pub array_size: usize,
    /// 发送侧分量步长（子组内一致）
    pub send_stride: usize,
    /// 接收侧分量步长（子组内一致）
    pub recv_stride: usize,
    /// 本传输专用子组名称
    pub group_name: String,
}

// ============================================================
// 套接字后备访问
// ============================================================

/// 读取套接字的后备缓冲区：稠密数组优先，句柄后备回退
pub(crate) fn socket_slice<'a>(
    ds: &'a DataStorage,
    socket: &str,
) -> CouplerResult<&'a [f64]> {
    if let Ok(array) = ds.array(socket) {
        return Ok(array);
    }
    Ok(ds.dofs(socket)?.data())
}

/// 读取套接字的后备缓冲区（可变）
pub(crate) fn socket_slice_mut<'a>(
    ds: &'a mut DataStorage,
    socket: &str,
) -> CouplerResult<&'a mut [f64]> {
    if ds.array(socket).is_ok() {
        return Ok(ds.array_mut(socket)?);
    }
    Ok(ds.dofs_mut(socket)?.data_mut())
}

// ============================================================
// 根秩发现
// ============================================================

/// 在子组内发现目标命名空间的根秩
///
/// 候选秩贡献自己的组内秩，其余秩贡献 -1 哨兵后做最大值全归约；
/// 哨兵为负而秩非负，不会与有效秩混淆。
pub(crate) fn root_process<C: CommBackend>(comm: &C, candidate: bool) -> CouplerResult<usize> {
    let mine: i32 = if candidate { comm.rank() as i32 } else { -1 };
    let root = comm.allreduce_max_scalar(mine)?;
    if root < 0 {
        return Err(CouplerError::config(
            "子组内未找到目标命名空间的任何秩".to_string(),
        ));
    }
    Ok(root as usize)
}

// ============================================================
// 子组创建
// ============================================================

/// 为第 `idx` 条传输创建参与秩子组
///
/// 返回耦合组内每秩的 0/1 参与标志向量（全归约结果），
/// 并将子组以 `<耦合器名><idx>` 注册进秩组注册表。
/// 必须由耦合组的所有秩集体调用。
pub(crate) fn create_transfer_group<C: CommBackend>(
    coupler_name: &str,
    idx: usize,
    spec: &TransferSpec,
    ctx: &mut CouplingContext<C>,
) -> CouplerResult<Vec<u64>> {
    log::trace!("create_transfer_group => start");

    let world_rank = ctx.world_rank;
    let in_send = ctx.namespaces.is_rank_in(&spec.nsp_send, world_rank)?;
    let in_recv = ctx.namespaces.is_rank_in(&spec.nsp_recv, world_rank)?;

    let coupling = ctx.groups.get(&ctx.coupling_group)?;
    let comm = coupling.comm().ok_or_else(|| {
        CouplerError::config(format!(
            "秩 {} 不持有耦合组 [{}] 的通信子",
            world_rank, ctx.coupling_group
        ))
    })?;
    let nsp_size = coupling.nb_ranks();
    let nsp_rank = coupling.local_rank_of(world_rank).ok_or_else(|| {
        CouplerError::config(format!(
            "秩 {} 不属于耦合组 [{}]",
            world_rank, ctx.coupling_group
        ))
    })?;
    debug_assert!(nsp_rank < nsp_size);

    // 参与标志：本秩属于发送或接收命名空间则置 1，最大值全归约取并
    let mut flags = vec![0u64; nsp_size];
    if in_send || in_recv {
        flags[nsp_rank] = 1;
    }
    let mut is_transfer_rank = vec![0u64; nsp_size];
    comm.allreduce_max(&flags, &mut is_transfer_rank)?;

    let ranks: Vec<usize> = is_transfer_rank
        .iter()
        .enumerate()
        .filter(|(_, &f)| f == 1)
        .map(|(r, _)| r)
        .collect();
    if ranks.is_empty() {
        return Err(CouplerError::config(format!(
            "传输 '{}>{}' 没有任何参与秩",
            spec.send_socket, spec.recv_socket
        )));
    }

    let group_name = format!("{}{}", coupler_name, idx);
    log::debug!(
        "create_transfer_group => ranks for group [{}] = {:?}",
        group_name,
        ranks
    );

    // 在耦合组内派生子组，并以世界秩登记
    let sub = comm.subgroup(&ranks)?;
    let world_ranks: Vec<usize> = ranks
        .iter()
        .map(|&r| coupling.world_ranks()[r])
        .collect();
    ctx.groups.register(group_name, world_ranks, sub);

    log::trace!("create_transfer_group => end");
    Ok(is_transfer_rank)
}

// ============================================================
// 计划构建
// ============================================================

/// 解析一侧的套接字后备
///
/// 返回 `(dofs_name, array_socket, array_size, stride)`；
/// 本秩不持有该套接字（或本地为空）时步长贡献为零，由子组
/// 全归约补齐。
fn resolve_side(
    ds: &DataStorage,
    namespace: &str,
    socket: &str,
    conn: ConnKind,
) -> CouplerResult<Option<(String, String, usize, u64)>> {
    // 稠密浮点数组
    if let Ok(array) = ds.array(socket) {
        let dofs_name = conn.dofs_socket(namespace);
        let dofs = ds.dofs(&dofs_name)?;
        let array_size = array.len();
        let stride = if dofs.is_empty() || array_size == 0 {
            0
        } else {
            if array_size % dofs.len() != 0 {
                return Err(CouplerError::size_mismatch(
                    "array_size % dofs",
                    0,
                    array_size % dofs.len(),
                ));
            }
            (array_size / dofs.len()) as u64
        };
        return Ok(Some((dofs_name, socket.to_string(), array_size, stride)));
    }
    // 句柄后备的分布式套接字（配对 `_local` / `_global` 编号套接字）
    if ds.has_global_pair(socket) {
        let handle = ds.dofs(socket)?;
        let array_size = handle.len() * handle.width();
        return Ok(Some((
            socket.to_string(),
            socket.to_string(),
            array_size,
            handle.width() as u64,
        )));
    }
    Ok(None)
}

/// 在参与秩上构建传输计划
///
/// 分量步长通过子组上的最大值全归约达成一致；
/// 不持有套接字的秩贡献零。必须由子组的所有秩集体调用。
pub(crate) fn build_plan<C: CommBackend>(
    spec: &TransferSpec,
    conn: ConnKind,
    group_name: String,
    ctx: &CouplingContext<C>,
) -> CouplerResult<TransferPlan> {
    log::debug!(
        "build_plan => send: {}, recv: {}",
        spec.send_socket,
        spec.recv_socket
    );

    let world_rank = ctx.world_rank;
    let nb_ranks_send = ctx.namespaces.get(&spec.nsp_send)?.nb_ranks();
    let nb_ranks_recv = ctx.namespaces.get(&spec.nsp_recv)?.nb_ranks();

    let mut strides_in = [0u64; 2];
    let mut dofs_name = String::new();
    let mut array_socket = String::new();
    let mut array_size = 0usize;

    // 发送侧解析
    if ctx.namespaces.is_rank_in(&spec.nsp_send, world_rank)? {
        let ds = ctx.storage(&spec.nsp_send)?;
        if let Some((dofs, socket, size, stride)) =
            resolve_side(ds, &spec.nsp_send, &spec.send_socket, conn)?
        {
            log::debug!("build_plan => P{} has socket {}", world_rank, socket);
            dofs_name = dofs;
            array_socket = socket;
            array_size = size;
            strides_in[0] = stride;
        }
    }

    // 接收侧解析（两侧均属的秩以接收侧为准）
    if ctx.namespaces.is_rank_in(&spec.nsp_recv, world_rank)? {
        let ds = ctx.storage(&spec.nsp_recv)?;
        if let Some((dofs, socket, size, stride)) =
            resolve_side(ds, &spec.nsp_recv, &spec.recv_socket, conn)?
        {
            log::debug!("build_plan => P{} has socket {}", world_rank, socket);
            dofs_name = dofs;
            array_socket = socket;
            array_size = size;
            strides_in[1] = stride;
        }
    }

    // 子组内步长达成一致
    let group = ctx.groups.get(&group_name)?;
    let comm = group.comm().ok_or_else(|| {
        CouplerError::config(format!(
            "秩 {} 不持有子组 [{}] 的通信子",
            world_rank, group_name
        ))
    })?;
    let mut strides_out = [0u64; 2];
    comm.allreduce_max(&strides_in, &mut strides_out)?;

    let send_stride = strides_out[0] as usize;
    let recv_stride = strides_out[1] as usize;
    if send_stride == 0 || recv_stride == 0 {
        return Err(CouplerError::config(format!(
            "传输 '{}>{}' 的分量步长必须为正: send={}, recv={}",
            spec.send_socket, spec.recv_socket, send_stride, recv_stride
        )));
    }

    Ok(TransferPlan {
        nsp_send: spec.nsp_send.clone(),
        nsp_recv: spec.nsp_recv.clone(),
        send_socket: spec.send_socket.clone(),
        recv_socket: spec.recv_socket.clone(),
        nb_ranks_send,
        nb_ranks_recv,
        dofs_name,
        array_socket,
        array_size,
        send_stride,
        recv_stride,
        group_name,
    })
}

// ============================================================
// 测试
// ============================================================
