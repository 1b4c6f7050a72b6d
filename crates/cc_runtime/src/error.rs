// crates/cc_runtime/src/error.rs
//! 运行时错误类型
//!
//! 包含命名空间查找、套接字访问、自由度句柄校验等运行时相关的错误。
//! 与 Foundation 层的 CcError 不同，此错误类型面向数据管理层。

use cc_foundation::CcError;
use thiserror::Error;

/// 运行时结果类型
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// 运行时错误（面向数据管理层）
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// 命名空间不存在
    #[error("命名空间不存在: {0}")]
    UnknownNamespace(String),

    /// 套接字不存在
    #[error("套接字不存在: {namespace} 中无 {socket}")]
    UnknownSocket {
        /// 所属命名空间
        namespace: String,
        /// 套接字名称
        socket: String,
    },

    /// 套接字后备类型不符
    #[error("套接字类型不符: {socket} 期望{expected}")]
    SocketKind {
        /// 套接字名称
        socket: String,
        /// 期望的后备类型描述
        expected: &'static str,
    },

    /// 尺寸不匹配错误
    #[error("尺寸不匹配: {field} 需要 {required}，提供 {provided}")]
    SizeMismatch {
        /// 字段名称
        field: String,
        /// 期望尺寸
        required: usize,
        /// 实际尺寸
        provided: usize,
    },

    /// 从 Foundation 层错误转换
    #[error("基础层错误: {0}")]
    Foundation(#[from] CcError),
}

impl RuntimeError {
    /// 创建套接字不存在错误
    pub fn unknown_socket(namespace: impl Into<String>, socket: impl Into<String>) -> Self {
        Self::UnknownSocket {
            namespace: namespace.into(),
            socket: socket.into(),
        }
    }

    /// 创建尺寸不匹配错误
    pub fn size_mismatch(field: impl Into<String>, required: usize, provided: usize) -> Self {
        Self::SizeMismatch {
            field: field.into(),
            required,
            provided,
        }
    }
}

// 转换到 Foundation 层错误
impl From<RuntimeError> for CcError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::UnknownNamespace(name) => CcError::not_found(name),
            RuntimeError::UnknownSocket { namespace, socket } => {
                CcError::not_found(format!("{}/{}", namespace, socket))
            }
            RuntimeError::SocketKind { socket, expected } => {
                CcError::invalid_input(format!("套接字类型不符: {} 期望{}", socket, expected))
            }
            RuntimeError::SizeMismatch {
                field,
                required,
                provided,
            } => CcError::invalid_input(format!(
                "尺寸不匹配: {} 需要 {}，提供 {}",
                field, required, provided
            )),
            RuntimeError::Foundation(e) => e,
        }
    }
}
