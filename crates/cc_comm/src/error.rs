// crates/cc_comm/src/error.rs
//! 通信层错误类型
//!
//! 任何集体调用的失败都是致命的：集体操作全局失败，
//! 不存在部分失败语义，错误沿调用栈向上传播并终止运行。

use cc_foundation::CcError;
use thiserror::Error;

/// 通信结果类型
pub type CommResult<T> = Result<T, CommError>;

/// 通信错误
#[derive(Debug, Error)]
pub enum CommError {
    /// 集体通信调用失败
    #[error("集体调用失败: {call} @ {site}: {message}")]
    Collective {
        /// 集体调用名称（如 "Allreduce", "Gatherv"）
        call: &'static str,
        /// 调用点（函数名）
        site: &'static str,
        /// 错误描述
        message: String,
    },

    /// 缓冲区大小不匹配
    #[error("缓冲区大小不匹配: {name} 期望{expected}, 实际{actual}")]
    BufferSize {
        /// 缓冲区名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 根秩超出通信子范围
    #[error("根秩越界: {root} 超出范围 0..{size}")]
    InvalidRoot {
        /// 请求的根秩
        root: usize,
        /// 通信子大小
        size: usize,
    },

    /// 子组秩列表非法（未排序、重复或越界）
    #[error("无效的子组秩列表: {message}")]
    InvalidSubgroup {
        /// 非法原因
        message: String,
    },

    /// 通信组不存在
    #[error("通信组不存在: {0}")]
    UnknownGroup(String),

    /// 从 Foundation 层错误转换
    #[error("基础层错误: {0}")]
    Foundation(#[from] CcError),
}

impl CommError {
    /// 创建集体调用失败错误
    #[inline]
    pub fn collective(
        call: &'static str,
        site: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Collective {
            call,
            site,
            message: message.into(),
        }
    }

    /// 创建缓冲区大小错误
    #[inline]
    pub fn buffer_size(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::BufferSize {
            name,
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collective_error_display() {
        let err = CommError::collective("Gatherv", "gather_data", "rank exited");
        let msg = err.to_string();
        assert!(msg.contains("Gatherv"));
        assert!(msg.contains("gather_data"));
    }

    #[test]
    fn test_buffer_size_error() {
        let err = CommError::buffer_size("recvbuf", 16, 8);
        assert!(err.to_string().contains("16"));
        assert!(err.to_string().contains("8"));
    }

    #[test]
    fn test_from_foundation() {
        let err: CommError = CcError::invalid_input("bad rank").into();
        assert!(matches!(err, CommError::Foundation(_)));
    }
}
