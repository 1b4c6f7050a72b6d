// crates/cc_coupler/src/transform.rs

//! 变量集变换器
//!
//! 变换器将发送侧的一个分量块映射为接收侧的一个分量块，
//! 两侧宽度（分量步长）可以不同。变换器是有状态的：
//! 在首次使用前以协商好的收发步长调用一次 [`VarSetTransformer::setup`]。
//!
//! 提供的实现：
//! - `identity`: 恒等复制
//! - `truncate`: 截断为接收侧前若干个分量
//! - `cons-to-prim` / `prim-to-cons`: 浅水守恒变量与原始变量互换
//!   （h, hu, hv ↔ h, u, v，多余分量按位复制）

use crate::error::{CouplerError, CouplerResult};

/// 干判据阈值：水深低于该值时速度取零
const DRY_EPS: f64 = 1e-12;

/// 发送到接收变量集变换器
///
/// `transform` 的输入块宽度为发送步长，输出块宽度为接收步长。
pub trait VarSetTransformer: Send {
    /// 变换器名称
    fn name(&self) -> &'static str;

    /// 以协商好的收发分量步长完成初始化
    ///
    /// 在计划构建阶段调用一次；步长组合非法时返回配置错误。
    fn setup(&mut self, send_stride: usize, recv_stride: usize) -> CouplerResult<()>;

    /// 变换一个自由度的分量块
    fn transform(&mut self, input: &[f64], output: &mut [f64]);
}

// ============================================================
// 恒等变换
// ============================================================

/// 恒等变换器
///
/// 按位复制；两侧步长相等时即普通拷贝语义。
#[derive(Debug, Default)]
pub struct IdentityTransformer;

impl VarSetTransformer for IdentityTransformer {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn setup(&mut self, _send_stride: usize, _recv_stride: usize) -> CouplerResult<()> {
        Ok(())
    }

    fn transform(&mut self, input: &[f64], output: &mut [f64]) {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
    }
}

// ============================================================
// 截断变换
// ============================================================

/// 截断变换器
///
/// 复制发送块的前 `recv_stride` 个分量，要求发送步长不小于接收步长。
#[derive(Debug, Default)]
pub struct TruncateTransformer;

impl VarSetTransformer for TruncateTransformer {
    fn name(&self) -> &'static str {
        "truncate"
    }

    fn setup(&mut self, send_stride: usize, recv_stride: usize) -> CouplerResult<()> {
        if send_stride < recv_stride {
            return Err(CouplerError::config(format!(
                "truncate 变换器要求发送步长 >= 接收步长: {} < {}",
                send_stride, recv_stride
            )));
        }
        Ok(())
    }

    fn transform(&mut self, input: &[f64], output: &mut [f64]) {
        let n = output.len();
        output.copy_from_slice(&input[..n]);
    }
}

// ============================================================
// 浅水守恒/原始变量互换
// ============================================================

/// 守恒变量到原始变量
///
/// `(h, hu, hv, ...) -> (h, u, v, ...)`，干单元速度取零。
#[derive(Debug, Default)]
pub struct ConsToPrimTransformer;

impl VarSetTransformer for ConsToPrimTransformer {
    fn name(&self) -> &'static str {
        "cons-to-prim"
    }

    fn setup(&mut self, send_stride: usize, recv_stride: usize) -> CouplerResult<()> {
        if send_stride != recv_stride || send_stride < 3 {
            return Err(CouplerError::config(format!(
                "cons-to-prim 变换器要求两侧步长相等且 >= 3: {} vs {}",
                send_stride, recv_stride
            )));
        }
        Ok(())
    }

    fn transform(&mut self, input: &[f64], output: &mut [f64]) {
        let h = input[0];
        output[0] = h;
        if h > DRY_EPS {
            output[1] = input[1] / h;
            output[2] = input[2] / h;
        } else {
            output[1] = 0.0;
            output[2] = 0.0;
        }
        let n = input.len().min(output.len());
        output[3..n].copy_from_slice(&input[3..n]);
    }
}

/// 原始变量到守恒变量
///
/// `(h, u, v, ...) -> (h, hu, hv, ...)`。
#[derive(Debug, Default)]
pub struct PrimToConsTransformer;

impl VarSetTransformer for PrimToConsTransformer {
    fn name(&self) -> &'static str {
        "prim-to-cons"
    }

    fn setup(&mut self, send_stride: usize, recv_stride: usize) -> CouplerResult<()> {
        if send_stride != recv_stride || send_stride < 3 {
            return Err(CouplerError::config(format!(
                "prim-to-cons 变换器要求两侧步长相等且 >= 3: {} vs {}",
                send_stride, recv_stride
            )));
        }
        Ok(())
    }

    fn transform(&mut self, input: &[f64], output: &mut [f64]) {
        let h = input[0];
        output[0] = h;
        output[1] = h * input[1];
        output[2] = h * input[2];
        let n = input.len().min(output.len());
        output[3..n].copy_from_slice(&input[3..n]);
    }
}

// ============================================================
// 变换器注册表
// ============================================================

/// 根据名称获取变量集变换器
///
/// 名称不区分大小写，`_`/空格视同 `-`。未知名称回退为恒等变换并
/// 输出警告（仅有的本地恢复路径）。
pub fn get_transformer(name: &str) -> Box<dyn VarSetTransformer> {
    match name.to_lowercase().replace(['_', ' '], "-").as_str() {
        "" | "identity" => Box::new(IdentityTransformer),
        "truncate" => Box::new(TruncateTransformer),
        "cons-to-prim" | "cons2prim" => Box::new(ConsToPrimTransformer),
        "prim-to-cons" | "prim2cons" => Box::new(PrimToConsTransformer),
        _ => {
            log::warn!("Unknown variable transformer '{}', using identity", name);
            Box::new(IdentityTransformer)
        }
    }
}

/// 列出所有可用的变换器名称
pub fn available_transformers() -> Vec<&'static str> {
    vec!["identity", "truncate", "cons-to-prim", "prim-to-cons"]
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equal_strides() {
        let mut t = IdentityTransformer;
        t.setup(3, 3).unwrap();
        let mut out = [0.0; 3];
        t.transform(&[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_truncate() {
        let mut t = TruncateTransformer;
        t.setup(5, 4).unwrap();
        let mut out = [0.0; 4];
        t.transform(&[10.0, 11.0, 12.0, 13.0, 14.0], &mut out);
        assert_eq!(out, [10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_truncate_rejects_widening() {
        let mut t = TruncateTransformer;
        assert!(t.setup(3, 4).is_err());
    }

    #[test]
    fn test_cons_to_prim() {
        let mut t = ConsToPrimTransformer;
        t.setup(3, 3).unwrap();
        let mut out = [0.0; 3];
        t.transform(&[2.0, 4.0, 6.0], &mut out);
        assert_eq!(out, [2.0, 2.0, 3.0]);
    }

    #[test]
    fn test_cons_to_prim_dry_cell() {
        let mut t = ConsToPrimTransformer;
        t.setup(3, 3).unwrap();
        let mut out = [9.0; 3];
        t.transform(&[0.0, 1.0, 1.0], &mut out);
        assert_eq!(out, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_prim_to_cons_roundtrip() {
        let mut fwd = PrimToConsTransformer;
        let mut bwd = ConsToPrimTransformer;
        fwd.setup(4, 4).unwrap();
        bwd.setup(4, 4).unwrap();

        let prim = [2.0, 1.5, -0.5, 35.0];
        let mut cons = [0.0; 4];
        let mut back = [0.0; 4];
        fwd.transform(&prim, &mut cons);
        assert_eq!(cons, [2.0, 3.0, -1.0, 35.0]);
        bwd.transform(&cons, &mut back);
        for (a, b) in prim.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_factory_normalizes_names() {
        assert_eq!(get_transformer("Identity").name(), "identity");
        assert_eq!(get_transformer("CONS_TO_PRIM").name(), "cons-to-prim");
        assert_eq!(get_transformer("prim2cons").name(), "prim-to-cons");
    }

    #[test]
    fn test_factory_falls_back_to_identity() {
        // 未知名称回退为恒等变换并输出警告
        let t = get_transformer("Bogus");
        assert_eq!(t.name(), "identity");
    }

    #[test]
    fn test_available_transformers() {
        let names = available_transformers();
        assert!(names.contains(&"identity"));
        assert!(names.contains(&"truncate"));
    }
}
