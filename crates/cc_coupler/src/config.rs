// crates/cc_coupler/src/config.rs

//! 耦合器配置
//!
//! 每条传输配置由三个平行列表描述，使用纯字符串/枚举类型以便
//! JSON 序列化：
//!
//! | 选项 | 形式 | 作用 |
//! |------|------|------|
//! | `SocketsSendRecv` | `"nsA_sockX>nsB_sockY"`（`>` 两侧无空格） | 每项声明一条传输 |
//! | `SocketsConnType` | `"State"` 或 `"Node"`，与上同长 | 选择提供全局编号的自由度句柄 |
//! | `SendToRecvVariableTransformer` | 变换器名称，空列表 ⇒ 全部恒等 | 每项的变量变换 |

use serde::{Deserialize, Serialize};

use cc_runtime::ConnKind;

use crate::error::{CouplerError, CouplerResult};

/// 恒等变换器的规范名称
pub const IDENTITY_TRANSFORMER: &str = "identity";

/// 耦合器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CouplerConfig {
    /// 待传输套接字对，如 `"flow_pressure>structure_load"`
    #[serde(default)]
    pub sockets_send_recv: Vec<String>,

    /// 每条传输的连接类型，与 `sockets_send_recv` 等长
    #[serde(default)]
    pub sockets_conn_type: Vec<ConnKind>,

    /// 每条传输的发送到接收变量变换器名称；空列表表示全部恒等
    #[serde(default)]
    pub send_to_recv_variable_transformer: Vec<String>,
}

impl CouplerConfig {
    /// 创建空配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条传输（恒等变换）
    pub fn with_transfer(mut self, spec: impl Into<String>, conn: ConnKind) -> Self {
        self.sockets_send_recv.push(spec.into());
        self.sockets_conn_type.push(conn);
        self
    }

    /// 追加一条带变换器的传输
    ///
    /// 若此前的条目未显式指定变换器，先以恒等变换补齐。
    pub fn with_transformed_transfer(
        mut self,
        spec: impl Into<String>,
        conn: ConnKind,
        transformer: impl Into<String>,
    ) -> Self {
        while self.send_to_recv_variable_transformer.len() < self.sockets_send_recv.len() {
            self.send_to_recv_variable_transformer
                .push(IDENTITY_TRANSFORMER.to_string());
        }
        self.sockets_send_recv.push(spec.into());
        self.sockets_conn_type.push(conn);
        self.send_to_recv_variable_transformer.push(transformer.into());
        self
    }

    /// 传输条目数量
    #[inline]
    pub fn nb_transfers(&self) -> usize {
        self.sockets_send_recv.len()
    }

    /// 第 `idx` 条传输的变换器名称（未指定时为恒等）
    pub fn transformer_name(&self, idx: usize) -> &str {
        self.send_to_recv_variable_transformer
            .get(idx)
            .map(|s| s.as_str())
            .unwrap_or(IDENTITY_TRANSFORMER)
    }

    /// 校验平行列表长度约束
    ///
    /// 违反约束属于配置错误，配置阶段致命。
    pub fn validate(&self) -> CouplerResult<()> {
        if self.sockets_conn_type.len() != self.sockets_send_recv.len() {
            log::error!(
                "configure => SocketsSendRecv.len() != SocketsConnType.len(): {:?} vs {:?}",
                self.sockets_send_recv,
                self.sockets_conn_type
            );
            return Err(CouplerError::config(format!(
                "SocketsSendRecv 与 SocketsConnType 长度不一致: {} vs {}",
                self.sockets_send_recv.len(),
                self.sockets_conn_type.len()
            )));
        }
        if !self.send_to_recv_variable_transformer.is_empty()
            && self.send_to_recv_variable_transformer.len() != self.sockets_send_recv.len()
        {
            log::error!(
                "configure => SendToRecvVariableTransformer.len() != SocketsSendRecv.len(): {:?} vs {:?}",
                self.send_to_recv_variable_transformer,
                self.sockets_send_recv
            );
            return Err(CouplerError::config(format!(
                "SendToRecvVariableTransformer 长度必须为 0 或 {}，实际 {}",
                self.sockets_send_recv.len(),
                self.send_to_recv_variable_transformer.len()
            )));
        }
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================
