//! 计数矩阵 -> 对数几率矩阵的四阶段流水线。
//!
//! ```text
//! ACCEPTED_REPLACEMENT -> OBSERVED_FREQUENCY -> EXPECTED_FREQUENCY
//!                      -> SUBSTITUTION_RATIO -> LOG_ODDS
//! ```
//!
//! 每个阶段都是纯函数，返回新的 [`HalfMatrix`]，可单独调用。

pub mod frequency;
pub mod scoring;

use serde::{Deserialize, Serialize};
use tracing::info_span;

use crate::error::{Result, SubsMatError};
use crate::freq::FrequencyTable;
use crate::matrix::{HalfMatrix, MatrixKind};

pub use frequency::{build_exp_freq_mat, build_obs_freq_mat, exp_freq_table_from_obs_freq};
pub use scoring::{build_log_odds_mat, build_subs_mat, round_to};

/// 对数几率缩放参数
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogOddsOpt {
    /// 对数底
    pub log_base: f64,
    /// 乘在对数值上的系数
    pub scale_factor: f64,
    /// 保留的小数位数，0 表示取整（不是“不取整”）
    pub round_digits: i32,
}

impl Default for LogOddsOpt {
    fn default() -> Self {
        Self {
            log_base: 10.0,
            scale_factor: 10.0,
            round_digits: 0,
        }
    }
}

impl LogOddsOpt {
    pub fn validate(&self) -> Result<()> {
        if !self.log_base.is_finite() || self.log_base <= 0.0 || self.log_base == 1.0 {
            return Err(SubsMatError::invalid_parameter(format!(
                "log base must be positive and not 1, got {}",
                self.log_base
            )));
        }
        if !self.scale_factor.is_finite() {
            return Err(SubsMatError::invalid_parameter(format!(
                "scale factor must be finite, got {}",
                self.scale_factor
            )));
        }
        Ok(())
    }
}

/// 从接受替换计数矩阵生成对数几率矩阵。
///
/// 未提供 `exp_freq_table` 时，由观测频率矩阵推导背景频率。
/// 只返回最终结果；需要中间矩阵时请直接调用各阶段函数。
pub fn make_log_odds_matrix(
    acc_rep: &HalfMatrix,
    exp_freq_table: Option<&FrequencyTable>,
    opt: &LogOddsOpt,
) -> Result<HalfMatrix> {
    let _span = info_span!("make_log_odds_matrix", name = acc_rep.name()).entered();
    opt.validate()?;

    let obs_freq = build_obs_freq_mat(acc_rep)?;
    let derived;
    let table = match exp_freq_table {
        Some(t) => t,
        None => {
            derived = exp_freq_table_from_obs_freq(&obs_freq)?;
            &derived
        }
    };
    let exp_freq = build_exp_freq_mat(table, Some(obs_freq.alphabet()))?;
    let subs = build_subs_mat(&obs_freq, &exp_freq)?;
    build_log_odds_mat(&subs, opt)
}

/// 检查矩阵类型是否为某阶段可接受的输入
pub(crate) fn require_kind(m: &HalfMatrix, operation: &'static str, allowed: &[MatrixKind]) -> Result<()> {
    if allowed.contains(&m.kind()) {
        Ok(())
    } else {
        Err(SubsMatError::UnsupportedOperation {
            operation,
            kind: m.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Alphabet;

    fn toy_counts() -> HalfMatrix {
        HalfMatrix::from_entries(
            [((b'A', b'A'), 10.0), ((b'C', b'C'), 10.0), ((b'A', b'C'), 20.0)],
            None,
            MatrixKind::AcceptedReplacement,
            "toy",
        )
        .unwrap()
    }

    #[test]
    fn end_to_end_uniform_gives_zero_scores() {
        let lo = make_log_odds_matrix(&toy_counts(), None, &LogOddsOpt::default()).unwrap();
        assert_eq!(lo.kind(), MatrixKind::LogOdds);
        assert_eq!(lo.name(), "toy");
        assert_eq!(lo.len(), 3);
        for (_, v) in lo.iter() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn external_table_changes_scores() {
        let table = FrequencyTable::from_frequencies([(b'A', 0.8), (b'C', 0.2)]).unwrap();
        let lo = make_log_odds_matrix(&toy_counts(), Some(&table), &LogOddsOpt::default()).unwrap();
        // AA: 0.25 / 0.64 -> 10*log10(0.390625) = -4.08
        assert_eq!(lo.get(b'A', b'A').unwrap(), -4.0);
        // CC: 0.25 / 0.04 -> 10*log10(6.25) = 7.96
        assert_eq!(lo.get(b'C', b'C').unwrap(), 8.0);
        // AC: 0.5 / 0.32 -> 10*log10(1.5625) = 1.94
        assert_eq!(lo.get(b'A', b'C').unwrap(), 2.0);
    }

    #[test]
    fn external_table_alphabet_mismatch() {
        let table = FrequencyTable::from_frequencies([(b'A', 0.5), (b'G', 0.5)]).unwrap();
        let err = make_log_odds_matrix(&toy_counts(), Some(&table), &LogOddsOpt::default()).unwrap_err();
        assert!(matches!(err, SubsMatError::AlphabetMismatch { .. }));
    }

    #[test]
    fn zero_count_cell_surfaces_domain_error() {
        let ab = Alphabet::new(b"AC").unwrap();
        let mut counts = HalfMatrix::deferred(ab, MatrixKind::AcceptedReplacement, "");
        counts.set(b'A', b'A', 5.0).unwrap();
        counts.set(b'C', b'C', 5.0).unwrap();
        let err = make_log_odds_matrix(&counts, None, &LogOddsOpt::default()).unwrap_err();
        assert!(matches!(err, SubsMatError::Domain { .. }));
    }

    #[test]
    fn require_kind_gates_stage_inputs() {
        let m = toy_counts().with_kind(MatrixKind::ExpectedFrequency);
        assert!(require_kind(&m, "x", &[MatrixKind::ExpectedFrequency]).is_ok());
        assert!(require_kind(&m, "x", &[MatrixKind::LogOdds]).is_err());
    }
}
