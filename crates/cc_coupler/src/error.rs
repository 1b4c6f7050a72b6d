// crates/cc_coupler/src/error.rs
//! 耦合层错误类型
//!
//! 除未知变换器名称（本地回退为恒等变换）外，所有错误都沿调用栈
//! 向上传播并终止运行：集体操作全局失败，不存在部分失败语义。

use cc_comm::CommError;
use cc_foundation::CcError;
use cc_runtime::RuntimeError;
use thiserror::Error;

/// 耦合结果类型
pub type CouplerResult<T> = Result<T, CouplerError>;

/// 耦合错误
#[derive(Debug, Error)]
pub enum CouplerError {
    /// 配置错误（长度不一致等），配置阶段致命
    #[error("配置错误: {0}")]
    Config(String),

    /// 传输规格字符串非法
    #[error("传输规格非法: '{spec}': {reason}")]
    InvalidSpec {
        /// 原始规格字符串
        spec: String,
        /// 非法原因
        reason: String,
    },

    /// 拓扑不支持（多对多传输）
    #[error("功能未实现: {0}")]
    NotImplemented(String),

    /// 尺寸不匹配
    #[error("尺寸不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 通信层错误
    #[error("通信错误: {0}")]
    Comm(#[from] CommError),

    /// 运行时层错误
    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),

    /// 基础层错误
    #[error("基础层错误: {0}")]
    Foundation(#[from] CcError),
}

impl CouplerError {
    /// 创建配置错误
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// 创建规格非法错误
    #[inline]
    pub fn invalid_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// 创建尺寸不匹配错误
    #[inline]
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }
}
