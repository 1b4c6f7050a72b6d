// crates/cc_coupler/src/driver.rs

//! 并发数据传输驱动
//!
//! 顶层编排：首次执行时一次性构建子组与传输计划（构建使用阻塞
//! 集体调用，因此推迟到执行阶段），此后每次执行按配置顺序逐条
//! 派发聚集或散播，并在每条计划后于耦合组上同步。
//!
//! 派发规则（按收发命名空间的秩数）：
//!
//! | 发送秩数 | 接收秩数 | 路径 |
//! |---------|---------|------|
//! | >1 | 1 | 聚集引擎 |
//! | 1 | >1 | 散播引擎 |
//! | >1 | >1 | 致命：未实现 |
//! | 1 | 1 | 散播引擎（单接收秩的退化块循环） |

use std::collections::HashMap;

use cc_comm::CommBackend;

use crate::config::CouplerConfig;
use crate::context::CouplingContext;
use crate::error::{CouplerError, CouplerResult};
use crate::gather::gather_data;
use crate::plan::{build_plan, create_transfer_group, TransferPlan, TransferSpec};
use crate::scatter::scatter_data;
use crate::transform::{get_transformer, VarSetTransformer};

/// 本秩是否为第 `idx` 条传输的参与秩
fn is_active_rank<C: CommBackend>(
    flags: &[u64],
    ctx: &CouplingContext<C>,
) -> CouplerResult<bool> {
    let local = ctx.coupling_rank()?;
    Ok(flags.get(local).copied().unwrap_or(0) == 1)
}

/// 并发数据传输驱动
///
/// 一个实例对应一组配置的传输；计划与子组在首次
/// [`ConcurrentDataTransfer::execute`] 时构建，生命周期内只读。
pub struct ConcurrentDataTransfer {
    name: String,
    config: CouplerConfig,
    specs: Vec<TransferSpec>,
    transformers: Vec<Box<dyn VarSetTransformer>>,
    plans: HashMap<String, TransferPlan>,
    /// 每条传输的懒构建全局→局部编号映射（接收秩）
    global_to_local: Vec<Option<HashMap<u64, usize>>>,
    /// 每条传输的参与标志向量（耦合组内每秩 0/1）
    is_transfer_rank: Vec<Vec<u64>>,
    create_group: bool,
}

impl ConcurrentDataTransfer {
    /// 由配置创建驱动
    ///
    /// 校验配置、解析全部传输规格并实例化变量变换器；
    /// 未知变换器名称回退为恒等变换（带警告）。
    pub fn new(name: impl Into<String>, config: CouplerConfig) -> CouplerResult<Self> {
        config.validate()?;
        if config.sockets_send_recv.is_empty() {
            return Err(CouplerError::config("至少需要一条传输配置".to_string()));
        }

        let specs = config
            .sockets_send_recv
            .iter()
            .map(|s| TransferSpec::parse(s))
            .collect::<CouplerResult<Vec<_>>>()?;

        let nb = config.nb_transfers();
        let transformers = (0..nb)
            .map(|i| {
                let name = config.transformer_name(i);
                log::debug!("configure => variable transformer: {}", name);
                get_transformer(name)
            })
            .collect();

        Ok(Self {
            name: name.into(),
            config,
            specs,
            transformers,
            plans: HashMap::new(),
            global_to_local: (0..nb).map(|_| None).collect(),
            is_transfer_rank: Vec::new(),
            create_group: true,
        })
    }

    /// 驱动名称（也是子组名称前缀）
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 配置
    #[inline]
    pub fn config(&self) -> &CouplerConfig {
        &self.config
    }

    /// 传输条目数量
    #[inline]
    pub fn nb_transfers(&self) -> usize {
        self.config.nb_transfers()
    }

    /// 按规格字符串查询已构建的计划（首次执行前为 `None`）
    pub fn plan(&self, spec: &str) -> Option<&TransferPlan> {
        self.plans.get(spec)
    }

    /// 执行全部传输
    ///
    /// 必须由耦合组的所有秩集体调用。首次调用时构建子组与计划；
    /// 每条计划结束后在耦合组上同步。
    pub fn execute<C: CommBackend>(&mut self, ctx: &mut CouplingContext<C>) -> CouplerResult<()> {
        log::trace!("execute => start");

        // 一次性构建：子组与计划
        // （使用阻塞集体调用，放在执行阶段而非初始化阶段）
        if self.create_group {
            for idx in 0..self.nb_transfers() {
                let flags = create_transfer_group(&self.name, idx, &self.specs[idx], ctx)?;
                let active = is_active_rank(&flags, ctx)?;
                self.is_transfer_rank.push(flags);
                if active {
                    let group_name = format!("{}{}", self.name, idx);
                    let plan = build_plan(
                        &self.specs[idx],
                        self.config.sockets_conn_type[idx],
                        group_name,
                        ctx,
                    )?;
                    self.transformers[idx].setup(plan.send_stride, plan.recv_stride)?;
                    self.plans
                        .insert(self.config.sockets_send_recv[idx].clone(), plan);
                }
            }
            self.create_group = false;
        }

        for idx in 0..self.config.nb_transfers() {
            if is_active_rank(&self.is_transfer_rank[idx], ctx)? {
                let spec_key = &self.config.sockets_send_recv[idx];
                let plan = self.plans.get(spec_key).ok_or_else(|| {
                    CouplerError::Foundation(cc_foundation::CcError::internal(format!(
                        "参与秩缺少计划: {}",
                        spec_key
                    )))
                })?;
                let transformer = self.transformers[idx].as_mut();
                let nb_send = plan.nb_ranks_send;
                let nb_recv = plan.nb_ranks_recv;

                if nb_send > 1 && nb_recv == 1 {
                    gather_data(plan, transformer, ctx)?;
                } else if nb_send == 1 && nb_recv > 1 {
                    scatter_data(plan, transformer, &mut self.global_to_local[idx], ctx)?;
                } else if nb_send > 1 && nb_recv > 1 {
                    return Err(CouplerError::NotImplemented(format!(
                        "many-to-many transfer ({} -> {})",
                        nb_send, nb_recv
                    )));
                } else {
                    // 一对一：等价于单接收秩的散播
                    scatter_data(plan, transformer, &mut self.global_to_local[idx], ctx)?;
                }
            }

            // 每条计划后全体同步：后续计划可能复用相同的秩，
            // 非参与秩不得先行越过参与秩的计划循环
            log::trace!("execute => barrier after transfer {}", idx);
            ctx.coupling_comm()?.barrier()?;
        }

        log::trace!("execute => end");
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cc_runtime::ConnKind;

    #[test]
    fn test_new_rejects_empty_config() {
        let result = ConcurrentDataTransfer::new("DataTransfer", CouplerConfig::new());
        assert!(matches!(result, Err(CouplerError::Config(_))));
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let config = CouplerConfig {
            sockets_send_recv: vec!["a_x>b_y".to_string()],
            sockets_conn_type: vec![],
            send_to_recv_variable_transformer: vec![],
        };
        assert!(ConcurrentDataTransfer::new("DataTransfer", config).is_err());
    }

    #[test]
    fn test_new_rejects_bad_spec() {
        let config = CouplerConfig::new().with_transfer("no-separator", ConnKind::State);
        assert!(matches!(
            ConcurrentDataTransfer::new("DataTransfer", config),
            Err(CouplerError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn test_unknown_transformer_falls_back_to_identity() {
        let config = CouplerConfig::new().with_transformed_transfer(
            "a_x>b_y",
            ConnKind::State,
            "Bogus",
        );
        let coupler = ConcurrentDataTransfer::new("DataTransfer", config).unwrap();
        assert_eq!(coupler.transformers[0].name(), "identity");
    }

    #[test]
    fn test_plan_absent_before_first_execute() {
        let config = CouplerConfig::new().with_transfer("a_x>b_y", ConnKind::State);
        let coupler = ConcurrentDataTransfer::new("DataTransfer", config).unwrap();
        assert!(coupler.plan("a_x>b_y").is_none());
        assert_eq!(coupler.nb_transfers(), 1);
        assert_eq!(coupler.name(), "DataTransfer");
    }
}
