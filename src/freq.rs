//! 背景（期望）频率表：符号 -> 频率，总和为 1。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubsMatError};
use crate::matrix::Alphabet;

/// 频率总和允许的偏差
pub const SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    freqs: BTreeMap<u8, f64>,
}

impl FrequencyTable {
    /// 直接给出频率；要求非负、有限且总和为 1。
    pub fn from_frequencies<I>(freqs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, f64)>,
    {
        let freqs = collect_unique(freqs)?;
        let total: f64 = freqs.values().sum();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(SubsMatError::invalid_frequency(format!(
                "frequencies sum to {}, expected 1",
                total
            )));
        }
        Ok(Self { freqs })
    }

    /// 由计数归一化得到频率。
    pub fn from_counts<I>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u8, f64)>,
    {
        let mut freqs = collect_unique(counts)?;
        let total: f64 = freqs.values().sum();
        if total == 0.0 {
            return Err(SubsMatError::degenerate("frequency counts sum to zero"));
        }
        for v in freqs.values_mut() {
            *v /= total;
        }
        Ok(Self { freqs })
    }

    pub fn get(&self, symbol: u8) -> Result<f64> {
        self.freqs
            .get(&symbol)
            .copied()
            .ok_or(SubsMatError::UnknownSymbol { symbol })
    }

    pub fn alphabet(&self) -> Alphabet {
        Alphabet::from_keys(self.freqs.keys().map(|&s| (s, s)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.freqs.iter().map(|(&s, &f)| (s, f))
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }
}

fn collect_unique<I>(items: I) -> Result<BTreeMap<u8, f64>>
where
    I: IntoIterator<Item = (u8, f64)>,
{
    let mut out = BTreeMap::new();
    for (symbol, v) in items {
        if !v.is_finite() || v < 0.0 {
            return Err(SubsMatError::invalid_frequency(format!(
                "value {} for '{}' must be finite and non-negative",
                v, symbol as char
            )));
        }
        if out.insert(symbol, v).is_some() {
            return Err(SubsMatError::DuplicateSymbol { symbol });
        }
    }
    Ok(out)
}
