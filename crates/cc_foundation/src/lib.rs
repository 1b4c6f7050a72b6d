// crates/cc_foundation/src/lib.rs

//! ConCouple Foundation Layer
//!
//! 零依赖基础层，提供整个项目的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//!
//! # 设计原则
//!
//! 1. **零外部依赖**: 不引入任何第三方 crate
//! 2. **纯净性**: 不包含通信、存储、耦合等高层概念
//! 3. **易用性**: 提供丰富的便捷构造函数和校验辅助

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

// 重导出常用类型
pub use error::{CcError, CcResult};

/// 检查条件，不满足则提前返回给定错误
///
/// # 示例
///
/// ```
/// use cc_foundation::{ensure, CcError, CcResult};
///
/// fn checked_div(a: f64, b: f64) -> CcResult<f64> {
///     ensure!(b != 0.0, CcError::invalid_input("除数不能为零"));
///     Ok(a / b)
/// }
///
/// assert!(checked_div(1.0, 0.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::ensure;
    pub use crate::error::{CcError, CcResult};
}
