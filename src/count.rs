//! 从多序列比对统计接受替换计数。
//!
//! 对每一列、每一对序列 (i < j)，若两者都不是空位且都属于字母表，
//! 则对应的无序符号对计数加一。列之间互不依赖，用 rayon 并行统计后求和。

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info_span};

use crate::error::{Result, SubsMatError};
use crate::matrix::{Alphabet, HalfMatrix, MatrixKind, SymbolPair};
use crate::util::seq;

/// 计数参数
#[derive(Clone, Debug, Default)]
pub struct CountOpt {
    /// 只统计这些符号；为 `None` 时使用比对中出现的全部非空位符号
    pub alphabet: Option<Alphabet>,
    /// 统计完成后加到每个单元上的伪计数
    pub pseudocount: f64,
}

pub fn count_replacements(rows: &[Vec<u8>], opt: &CountOpt) -> Result<HalfMatrix> {
    if rows.len() < 2 {
        return Err(SubsMatError::invalid_alignment(format!(
            "need at least two sequences, got {}",
            rows.len()
        )));
    }
    let width = rows[0].len();
    if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(SubsMatError::invalid_alignment(format!(
            "row {} has length {}, expected {}",
            i,
            r.len(),
            width
        )));
    }
    let _span = info_span!("count_replacements", rows = rows.len(), columns = width).entered();

    let norm: Vec<Vec<u8>> = rows.iter().map(|r| seq::normalize_seq(r)).collect();
    let alphabet = match &opt.alphabet {
        Some(ab) => ab.clone(),
        None => {
            let residues = norm.iter().flatten().copied().filter(|&b| !seq::is_gap(b));
            Alphabet::from_keys(residues.map(|b| (b, b)))
        }
    };
    if alphabet.is_empty() {
        return Err(SubsMatError::invalid_alignment("alignment contains no residues"));
    }

    let counts = (0..width)
        .into_par_iter()
        .fold(BTreeMap::new, |mut acc, col| {
            count_column(&norm, col, &alphabet, &mut acc);
            acc
        })
        .reduce(BTreeMap::new, merge_counts);
    debug!(symbols = alphabet.len(), observed_pairs = counts.len(), "counted replacements");

    let mut m = HalfMatrix::deferred(alphabet, MatrixKind::AcceptedReplacement, "");
    for (pair, n) in counts {
        m.set(pair.low(), pair.high(), n)?;
    }
    if opt.pseudocount != 0.0 {
        m = add_pseudocount(&m, opt.pseudocount)?;
    }
    Ok(m)
}

fn count_column(rows: &[Vec<u8>], col: usize, alphabet: &Alphabet, acc: &mut BTreeMap<SymbolPair, f64>) {
    let residues: Vec<u8> = rows
        .iter()
        .map(|r| r[col])
        .filter(|&b| !seq::is_gap(b) && alphabet.contains(b))
        .collect();
    for (i, &a) in residues.iter().enumerate() {
        for &b in &residues[i + 1..] {
            *acc.entry(SymbolPair::new(a, b)).or_insert(0.0) += 1.0;
        }
    }
}

fn merge_counts(
    mut a: BTreeMap<SymbolPair, f64>,
    b: BTreeMap<SymbolPair, f64>,
) -> BTreeMap<SymbolPair, f64> {
    for (pair, n) in b {
        *a.entry(pair).or_insert(0.0) += n;
    }
    a
}

/// 每个单元加上伪计数，避免稀疏计数在取对数时出现 log(0)。
pub fn add_pseudocount(m: &HalfMatrix, pseudocount: f64) -> Result<HalfMatrix> {
    if !pseudocount.is_finite() || pseudocount < 0.0 {
        return Err(SubsMatError::invalid_parameter(format!(
            "pseudocount must be finite and non-negative, got {}",
            pseudocount
        )));
    }
    let mut out = m.with_kind(m.kind());
    for (pair, v) in m.iter() {
        out.set(pair.low(), pair.high(), v + pseudocount)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(seqs: &[&str]) -> Vec<Vec<u8>> {
        seqs.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn counts_every_row_pair_per_column() {
        let aln = rows(&["AC", "AG", "CG"]);
        let m = count_replacements(&aln, &CountOpt::default()).unwrap();
        assert_eq!(m.kind(), MatrixKind::AcceptedReplacement);
        assert_eq!(m.alphabet().letters(), b"ACG");
        assert_eq!(m.len(), 6);
        // 列 0: A,A,C -> {A,A}:1 {A,C}:2
        // 列 1: C,G,G -> {C,G}:2 {G,G}:1
        assert_eq!(m.get(b'A', b'A').unwrap(), 1.0);
        assert_eq!(m.get(b'C', b'A').unwrap(), 2.0);
        assert_eq!(m.get(b'G', b'C').unwrap(), 2.0);
        assert_eq!(m.get(b'G', b'G').unwrap(), 1.0);
        assert_eq!(m.get(b'C', b'C').unwrap(), 0.0);
        assert_eq!(m.total(), 6.0);
    }

    #[test]
    fn gaps_and_case_are_handled() {
        let aln = rows(&["a-C", "A.c", "AGC"]);
        let m = count_replacements(&aln, &CountOpt::default()).unwrap();
        assert_eq!(m.get(b'A', b'A').unwrap(), 3.0);
        assert_eq!(m.get(b'C', b'C').unwrap(), 3.0);
        assert_eq!(m.get(b'G', b'G').unwrap(), 0.0);
    }

    #[test]
    fn explicit_alphabet_skips_other_residues() {
        let aln = rows(&["AX", "AC"]);
        let opt = CountOpt { alphabet: Some(Alphabet::new(b"AC").unwrap()), pseudocount: 0.0 };
        let m = count_replacements(&aln, &opt).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.total(), 1.0);
    }

    #[test]
    fn ragged_alignment_rejected() {
        let aln = rows(&["ACG", "AC"]);
        let err = count_replacements(&aln, &CountOpt::default()).unwrap_err();
        assert!(matches!(err, SubsMatError::InvalidAlignment { .. }));
    }

    #[test]
    fn single_sequence_rejected() {
        let err = count_replacements(&rows(&["ACG"]), &CountOpt::default()).unwrap_err();
        assert!(matches!(err, SubsMatError::InvalidAlignment { .. }));
    }

    #[test]
    fn pseudocount_fills_empty_cells() {
        let aln = rows(&["AC", "AC"]);
        let opt = CountOpt { alphabet: None, pseudocount: 0.5 };
        let m = count_replacements(&aln, &opt).unwrap();
        assert_eq!(m.get(b'A', b'C').unwrap(), 0.5);
        assert_eq!(m.get(b'A', b'A').unwrap(), 1.5);
        assert!(add_pseudocount(&m, -1.0).is_err());
    }
}
