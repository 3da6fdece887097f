use tracing::{debug, info_span};

use super::{require_kind, LogOddsOpt};
use crate::error::{Result, SubsMatError};
use crate::matrix::{HalfMatrix, MatrixKind};

/// 替换比矩阵：`observed / expected`。
///
/// 两个输入的字母表必须逐项相同；期望频率为 0 的单元直接报
/// `DivisionByZero`，不会产生 inf/NaN。
pub fn build_subs_mat(obs_freq: &HalfMatrix, exp_freq: &HalfMatrix) -> Result<HalfMatrix> {
    require_kind(
        obs_freq,
        "substitution ratio",
        &[MatrixKind::ObservedFrequency, MatrixKind::Untyped],
    )?;
    require_kind(
        exp_freq,
        "substitution ratio",
        &[MatrixKind::ExpectedFrequency, MatrixKind::Untyped],
    )?;
    obs_freq.alphabet().ensure_matches(exp_freq.alphabet())?;
    let _span = info_span!("subs", symbols = obs_freq.alphabet().len()).entered();

    let mut subs = obs_freq.with_kind(MatrixKind::SubstitutionRatio);
    for (pair, observed) in obs_freq.iter() {
        let expected = exp_freq.get_pair(pair)?;
        if expected == 0.0 {
            return Err(SubsMatError::DivisionByZero { pair });
        }
        subs.set(pair.low(), pair.high(), observed / expected)?;
    }
    Ok(subs)
}

/// 对数几率矩阵：`round(scale * log(subs) / log(base), digits)`。
///
/// 替换比 <= 0（含 NaN）的单元报 `Domain`。
pub fn build_log_odds_mat(subs: &HalfMatrix, opt: &LogOddsOpt) -> Result<HalfMatrix> {
    require_kind(
        subs,
        "log-odds",
        &[MatrixKind::SubstitutionRatio, MatrixKind::Untyped],
    )?;
    opt.validate()?;
    let _span = info_span!("log_odds", symbols = subs.alphabet().len()).entered();
    debug!(
        log_base = opt.log_base,
        scale_factor = opt.scale_factor,
        round_digits = opt.round_digits,
        "scaling substitution ratios"
    );

    let ln_base = opt.log_base.ln();
    let mut lo = subs.with_kind(MatrixKind::LogOdds);
    for (pair, ratio) in subs.iter() {
        if ratio.is_nan() || ratio <= 0.0 {
            return Err(SubsMatError::Domain { pair, value: ratio });
        }
        let score = round_to(opt.scale_factor * ratio.ln() / ln_base, opt.round_digits);
        lo.set(pair.low(), pair.high(), score)?;
    }
    Ok(lo)
}

/// 四舍五入到 `digits` 位小数（远离零取整；digits 可为负）。
///
/// 位数超出 f64 的表示范围时：正位数原样返回 `x`，负位数返回 0。
pub fn round_to(x: f64, digits: i32) -> f64 {
    let rounded = if digits >= 0 {
        let m = 10f64.powi(digits);
        let scaled = x * m;
        if scaled.is_finite() {
            scaled.round() / m
        } else {
            x
        }
    } else {
        let m = 10f64.powi(digits.saturating_neg());
        if m.is_finite() {
            (x / m).round() * m
        } else {
            0.0
        }
    };
    // + 0.0 把 -0.0 变成 0.0
    rounded + 0.0
}
