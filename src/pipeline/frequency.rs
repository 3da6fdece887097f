use tracing::{debug, info_span};

use super::require_kind;
use crate::error::{Result, SubsMatError};
use crate::freq::FrequencyTable;
use crate::matrix::{Alphabet, HalfMatrix, MatrixKind};

/// 观测频率矩阵：每个单元除以全部计数之和，结果总和为 1。
pub fn build_obs_freq_mat(acc_rep: &HalfMatrix) -> Result<HalfMatrix> {
    require_kind(
        acc_rep,
        "observed frequency",
        &[MatrixKind::AcceptedReplacement, MatrixKind::Untyped],
    )?;
    let _span = info_span!("obs_freq", symbols = acc_rep.alphabet().len()).entered();

    if let Some((pair, v)) = acc_rep.iter().find(|&(_, v)| v < 0.0 || !v.is_finite()) {
        return Err(SubsMatError::invalid_matrix(format!(
            "replacement count {} for {} must be finite and non-negative",
            v, pair
        )));
    }
    let total = acc_rep.total();
    if total == 0.0 {
        return Err(SubsMatError::degenerate("accepted replacement counts sum to zero"));
    }
    // 单元各自有限，但总和可能溢出为 inf
    if !total.is_finite() {
        return Err(SubsMatError::degenerate(format!(
            "accepted replacement counts overflow when summed ({})",
            total
        )));
    }
    debug!(total, "normalizing accepted replacements");

    let mut obs = HalfMatrix::deferred(acc_rep.alphabet().clone(), MatrixKind::ObservedFrequency, acc_rep.name());
    for (pair, v) in acc_rep.iter() {
        obs.set(pair.low(), pair.high(), v / total)?;
    }
    Ok(obs)
}

/// 从观测频率矩阵推导期望频率表：对角单元全额计入该符号，
/// 非对角单元平分给两个符号。
pub fn exp_freq_table_from_obs_freq(obs_freq: &HalfMatrix) -> Result<FrequencyTable> {
    require_kind(
        obs_freq,
        "expected frequency table",
        &[MatrixKind::ObservedFrequency, MatrixKind::Untyped],
    )?;
    let mut obs = obs_freq.clone();
    let totals = obs.all_letter_marginals()?;
    debug!(symbols = totals.len(), "derived background frequencies");
    FrequencyTable::from_frequencies(totals.iter().map(|(&s, &f)| (s, f)))
}

/// 期望频率矩阵：`{a,a} = f(a)^2`，`{a,b} = 2 f(a) f(b)`
/// （因子 2 对应 a->b 与 b->a 两个方向已合并）。
///
/// 给出 `alphabet` 时，频率表的符号集合必须与之完全一致。
pub fn build_exp_freq_mat(table: &FrequencyTable, alphabet: Option<&Alphabet>) -> Result<HalfMatrix> {
    let table_ab = table.alphabet();
    if let Some(ab) = alphabet {
        table_ab.ensure_matches(ab)?;
    }
    let _span = info_span!("exp_freq", symbols = table_ab.len()).entered();

    let mut exp = HalfMatrix::deferred(table_ab.clone(), MatrixKind::ExpectedFrequency, "");
    for pair in table_ab.pairs() {
        let fa = table.get(pair.low())?;
        let v = if pair.is_diagonal() {
            fa * fa
        } else {
            2.0 * fa * table.get(pair.high())?
        };
        exp.set(pair.low(), pair.high(), v)?;
    }
    Ok(exp)
}
