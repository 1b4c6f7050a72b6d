// crates/cc_foundation/src/error.rs
//! 基础错误类型
//!
//! 定义整个项目的基础错误类型，仅包含与基础设施相关的错误。
//! 本模块是 Layer 1 的核心组件，禁止引入任何通信或耦合领域概念。
//!
//! # 错误分层
//!
//! ```text
//! 耦合层错误 (cc_coupler::CouplerError)
//!        ↓ (转换)
//! 运行时错误 (cc_runtime::RuntimeError)
//!        ↓ (转换)
//! 通信错误 (cc_comm::CommError)
//!        ↓ (转换)
//! 基础错误 ← 你在这里 (cc_foundation::CcError)
//! ```

use std::fmt;

/// 统一结果类型别名
///
/// 用于简化函数签名，等价于 `Result<T, CcError>`。
pub type CcResult<T> = Result<T, CcError>;

/// Foundation 层基础错误
///
/// 包含所有基础设施级别的错误，是错误体系的根基。
/// 高层错误必须通过转换为 [`CcError::Internal`] 来向下兼容。
#[derive(Debug, Clone)]
pub enum CcError {
    /// 数组或集合大小不匹配
    ///
    /// 在需要严格大小一致性的操作中触发（如缓冲区交换）。
    SizeMismatch {
        /// 数据名称（用于调试）
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 索引访问越界
    ///
    /// 当索引值大于等于容器长度时触发。
    IndexOutOfBounds {
        /// 索引类别（如 "Rank", "Dof"）
        index_type: &'static str,
        /// 访问的索引值
        index: usize,
        /// 容器长度（上界）
        len: usize,
    },

    /// 输入数据验证失败
    ///
    /// 用于参数校验、前置条件检查等场景。
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 内部实现错误
    ///
    /// 当程序进入不应到达的状态时使用。
    /// 通常表示 bug 或不变量被破坏。
    Internal {
        /// 内部错误描述
        message: String,
    },

    /// 功能或资源未找到
    ///
    /// 用于注册表、工厂模式等资源查找失败场景。
    NotFound {
        /// 资源名称或标识
        resource: String,
    },

    /// 功能未实现
    ///
    /// 用于拓扑受限或占位场景。
    NotImplemented {
        /// 未实现的功能描述
        feature: String,
    },
}

// ============================================================================
// 便捷构造方法
// ============================================================================

impl CcError {
    /// 创建大小不匹配错误
    #[inline]
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 创建索引越界错误
    #[inline]
    pub fn index_out_of_bounds(index_type: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            index_type,
            index,
            len,
        }
    }

    /// 创建无效输入错误
    #[inline]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 创建内部错误
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 创建功能未实现错误
    #[inline]
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }
}

// ============================================================================
// 验证辅助方法
// ============================================================================

impl CcError {
    /// 验证数组大小是否匹配，不匹配则返回 [`CcError::SizeMismatch`]
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> CcResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 验证索引是否在有效范围内，越界则返回 [`CcError::IndexOutOfBounds`]
    #[inline]
    pub fn check_index(index_type: &'static str, index: usize, len: usize) -> CcResult<()> {
        if index >= len {
            Err(Self::index_out_of_bounds(index_type, index, len))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// 核心 Trait 实现
// ============================================================================

impl fmt::Display for CcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch {
                name,
                expected,
                actual,
            } => {
                write!(f, "数组大小不匹配: {} 期望{}, 实际{}", name, expected, actual)
            }
            Self::IndexOutOfBounds {
                index_type,
                index,
                len,
            } => {
                write!(f, "索引越界: {} 索引{} 超出范围 0..{}", index_type, index, len)
            }
            Self::InvalidInput { message } => write!(f, "无效的输入数据: {}", message),
            Self::Internal { message } => write!(f, "内部错误: {}", message),
            Self::NotFound { resource } => write!(f, "资源未找到: {}", resource),
            Self::NotImplemented { feature } => write!(f, "功能未实现: {}", feature),
        }
    }
}

impl std::error::Error for CcError {}

// ============================================================================
// 测试
// ============================================================================
