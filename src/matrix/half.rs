use std::collections::BTreeMap;
use std::f64::consts::LN_2;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::alphabet::{Alphabet, SymbolPair};
use crate::error::{Result, SubsMatError};

/// 有序符号对 -> 值，即用户提供的原始全矩阵或半矩阵。
pub type PairTable = BTreeMap<(u8, u8), f64>;

/// 矩阵类型标签，决定哪些操作合法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixKind {
    #[default]
    Untyped,
    AcceptedReplacement,
    ObservedFrequency,
    ExpectedFrequency,
    SubstitutionRatio,
    LogOdds,
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatrixKind::Untyped => "untyped",
            MatrixKind::AcceptedReplacement => "accepted replacement",
            MatrixKind::ObservedFrequency => "observed frequency",
            MatrixKind::ExpectedFrequency => "expected frequency",
            MatrixKind::SubstitutionRatio => "substitution ratio",
            MatrixKind::LogOdds => "log-odds",
        };
        f.write_str(s)
    }
}

/// 将全矩阵折叠为半矩阵。
///
/// - 条目数为 N*(N+1)/2：已是半矩阵，键规范化为 (low, high) 后原样保留；
///   同一无序对以两个方向同时出现视为非法。
/// - 条目数为 N*N：`half[{a,b}] = full[(a,b)] + full[(b,a)]`，对角线不变。
/// - 其余条目数一律报 `InvalidMatrix`。
///
/// 对结果再次折叠不会改变任何值。
pub fn fold(entries: &PairTable, alphabet: &Alphabet) -> Result<BTreeMap<SymbolPair, f64>> {
    for &(a, b) in entries.keys() {
        alphabet.check(a)?;
        alphabet.check(b)?;
    }

    let mut cells = BTreeMap::new();
    if entries.len() == alphabet.half_size() {
        for (&(a, b), &v) in entries {
            let pair = SymbolPair::new(a, b);
            if cells.insert(pair, v).is_some() {
                return Err(SubsMatError::invalid_matrix(format!(
                    "{} given in both orientations of a half matrix",
                    pair
                )));
            }
        }
        return Ok(cells);
    }

    if entries.len() == alphabet.full_size() {
        // 键唯一且都在字母表内，条目数为 N*N 即意味着每个有序对都存在
        for (&(a, b), &v) in entries {
            *cells.entry(SymbolPair::new(a, b)).or_insert(0.0) += v;
        }
        return Ok(cells);
    }

    Err(SubsMatError::invalid_matrix(format!(
        "{} entries, but alphabet [{}] of {} symbols needs {} (full) or {} (half)",
        entries.len(),
        alphabet,
        alphabet.len(),
        alphabet.full_size(),
        alphabet.half_size()
    )))
}

/// 对称的成对打分表，只保存对角线加一个三角。
///
/// 每个流水线阶段都构造新的实例，输入从不就地修改；
/// 构造时总是复制调用方的数据，不持有外部引用。
#[derive(Debug, Clone)]
pub struct HalfMatrix {
    cells: BTreeMap<SymbolPair, f64>,
    alphabet: Alphabet,
    kind: MatrixKind,
    name: String,
    /// 每个符号的边际和缓存，`set` 时失效
    letter_totals: BTreeMap<u8, f64>,
}

impl HalfMatrix {
    /// 从全矩阵或半矩阵条目构建。`alphabet` 为 `None` 时由键推断。
    pub fn from_entries<I>(
        entries: I,
        alphabet: Option<Alphabet>,
        kind: MatrixKind,
        name: impl Into<String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = ((u8, u8), f64)>,
    {
        let mut table = PairTable::new();
        for ((a, b), v) in entries {
            if table.insert((a, b), v).is_some() {
                return Err(SubsMatError::invalid_matrix(format!(
                    "key ({},{}) appears more than once",
                    a as char, b as char
                )));
            }
        }
        Self::from_table(&table, alphabet, kind, name)
    }

    pub fn from_table(
        table: &PairTable,
        alphabet: Option<Alphabet>,
        kind: MatrixKind,
        name: impl Into<String>,
    ) -> Result<Self> {
        let alphabet = alphabet.unwrap_or_else(|| Alphabet::from_keys(table.keys().copied()));
        let cells = fold(table, &alphabet)?;
        Ok(Self {
            cells,
            alphabet,
            kind,
            name: name.into(),
            letter_totals: BTreeMap::new(),
        })
    }

    /// 延迟构建：跳过尺寸检查，所有半矩阵单元置零，之后用 `set` 填充。
    pub fn deferred(alphabet: Alphabet, kind: MatrixKind, name: impl Into<String>) -> Self {
        let cells = alphabet.pairs().map(|p| (p, 0.0)).collect();
        Self {
            cells,
            alphabet,
            kind,
            name: name.into(),
            letter_totals: BTreeMap::new(),
        }
    }

    /// 复制全部单元（值拷贝），换上新的类型标签。
    pub fn with_kind(&self, kind: MatrixKind) -> Self {
        Self {
            cells: self.cells.clone(),
            alphabet: self.alphabet.clone(),
            kind,
            name: self.name.clone(),
            letter_totals: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 对称查找：`get(a, b) == get(b, a)`。
    pub fn get(&self, a: u8, b: u8) -> Result<f64> {
        self.alphabet.check(a)?;
        self.alphabet.check(b)?;
        self.get_pair(SymbolPair::new(a, b))
    }

    pub fn get_pair(&self, pair: SymbolPair) -> Result<f64> {
        match self.cells.get(&pair) {
            Some(&v) => Ok(v),
            None => {
                self.alphabet.check(pair.low())?;
                self.alphabet.check(pair.high())?;
                Err(SubsMatError::invalid_matrix(format!("missing cell {}", pair)))
            }
        }
    }

    pub fn set(&mut self, a: u8, b: u8, value: f64) -> Result<()> {
        self.alphabet.check(a)?;
        self.alphabet.check(b)?;
        self.cells.insert(SymbolPair::new(a, b), value);
        self.letter_totals.clear();
        Ok(())
    }

    /// 按规范符号对顺序遍历所有单元
    pub fn iter(&self) -> impl Iterator<Item = (SymbolPair, f64)> + '_ {
        self.cells.iter().map(|(&p, &v)| (p, v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.values().copied()
    }

    pub fn total(&self) -> f64 {
        self.values().sum()
    }

    /// 相对熵（以 bit 为单位），需要同一字母表上的观测频率矩阵。
    ///
    /// - 对数几率矩阵：`Σ F[pair] * self[pair] / ln 2`
    /// - 替换比矩阵：`Σ F[pair] * ln(self[pair]) / ln 2`
    ///
    /// 两式都只对半矩阵的每个单元求和一次，非对角项不加倍；
    /// 这与 [`letter_marginal`](Self::letter_marginal) 对非对角项取一半的约定不同，
    /// 此处保持原有定义。
    pub fn entropy(&self, obs_freq: &HalfMatrix) -> Result<f64> {
        match self.kind {
            MatrixKind::LogOdds | MatrixKind::SubstitutionRatio => {}
            kind => {
                return Err(SubsMatError::UnsupportedOperation {
                    operation: "entropy",
                    kind,
                })
            }
        }
        self.alphabet.ensure_matches(&obs_freq.alphabet)?;

        let mut ent = 0.0;
        for (pair, v) in self.iter() {
            let f = obs_freq.get_pair(pair)?;
            let term = if self.kind == MatrixKind::LogOdds {
                v
            } else {
                if v.is_nan() || v <= 0.0 {
                    return Err(SubsMatError::Domain { pair, value: v });
                }
                v.ln()
            };
            ent += f * term / LN_2;
        }
        Ok(ent)
    }

    /// 单个符号的边际和：对角单元计全值，非对角单元计一半
    /// （半矩阵已把两个方向的替换合并到一个单元里）。
    pub fn letter_marginal(&self, symbol: u8) -> Result<f64> {
        self.alphabet.check(symbol)?;
        let sum = self
            .iter()
            .filter(|(p, _)| p.contains(symbol))
            .map(|(p, v)| if p.is_diagonal() { v } else { v / 2.0 })
            .sum();
        Ok(sum)
    }

    /// 为字母表中每个符号计算边际和并写入缓存。
    pub fn all_letter_marginals(&mut self) -> Result<&BTreeMap<u8, f64>> {
        let mut totals = BTreeMap::new();
        for &symbol in self.alphabet.letters() {
            totals.insert(symbol, self.letter_marginal(symbol)?);
        }
        self.letter_totals = totals;
        Ok(&self.letter_totals)
    }

    /// 最近一次 `all_letter_marginals` 的结果；矩阵修改后为空。
    pub fn letter_totals(&self) -> &BTreeMap<u8, f64> {
        &self.letter_totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn full_ac() -> PairTable {
        [
            ((b'A', b'A'), 5.0),
            ((b'A', b'C'), 13.0),
            ((b'C', b'A'), 20.0),
            ((b'C', b'C'), 7.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn full_matrix_is_folded_by_summing() {
        let m = HalfMatrix::from_table(&full_ac(), None, MatrixKind::AcceptedReplacement, "").unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(b'A', b'C').unwrap(), 33.0);
        assert_eq!(m.get(b'C', b'A').unwrap(), 33.0);
        assert_eq!(m.get(b'A', b'A').unwrap(), 5.0);
        assert_eq!(m.get(b'C', b'C').unwrap(), 7.0);
    }

    #[test]
    fn fold_is_idempotent() {
        let ab = Alphabet::new(b"AC").unwrap();
        let once = fold(&full_ac(), &ab).unwrap();
        let again_input: PairTable = once.iter().map(|(p, &v)| ((p.low(), p.high()), v)).collect();
        let twice = fold(&again_input, &ab).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn half_matrix_keys_are_canonicalized() {
        let m = HalfMatrix::from_entries(
            [((b'C', b'A'), 4.0), ((b'A', b'A'), 1.0), ((b'C', b'C'), 2.0)],
            None,
            MatrixKind::Untyped,
            "",
        )
        .unwrap();
        assert_eq!(m.get(b'A', b'C').unwrap(), 4.0);
    }

    #[test]
    fn half_matrix_with_both_orientations_rejected() {
        // 3 个条目 = 半矩阵大小，但 {A,C} 出现两次而 {C,C} 缺失
        let err = HalfMatrix::from_entries(
            [((b'A', b'C'), 1.0), ((b'C', b'A'), 1.0), ((b'A', b'A'), 1.0)],
            None,
            MatrixKind::Untyped,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, SubsMatError::InvalidMatrix { .. }));
    }

    #[test]
    fn wrong_entry_count_rejected() {
        let err = HalfMatrix::from_entries(
            [((b'A', b'A'), 1.0), ((b'A', b'C'), 1.0)],
            None,
            MatrixKind::Untyped,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, SubsMatError::InvalidMatrix { .. }));
    }

    #[test]
    fn key_outside_explicit_alphabet_rejected() {
        let ab = Alphabet::new(b"AC").unwrap();
        let err = HalfMatrix::from_entries(
            [((b'A', b'A'), 1.0), ((b'A', b'G'), 1.0), ((b'C', b'C'), 1.0)],
            Some(ab),
            MatrixKind::Untyped,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, SubsMatError::UnknownSymbol { symbol: b'G' }));
    }

    #[test]
    fn deferred_is_zero_filled_half_matrix() {
        let ab = Alphabet::new(b"ACGT").unwrap();
        let mut m = HalfMatrix::deferred(ab, MatrixKind::Untyped, "tmp");
        assert_eq!(m.len(), 10);
        assert!(m.values().all(|v| v == 0.0));
        m.set(b'T', b'A', 3.5).unwrap();
        assert_eq!(m.get(b'A', b'T').unwrap(), 3.5);
        assert_eq!(m.len(), 10);
        assert!(matches!(m.set(b'X', b'A', 1.0), Err(SubsMatError::UnknownSymbol { symbol: b'X' })));
    }

    #[test]
    fn symmetric_lookup_for_every_pair() {
        let m = HalfMatrix::from_table(&full_ac(), None, MatrixKind::Untyped, "").unwrap();
        for &a in m.alphabet().letters() {
            for &b in m.alphabet().letters() {
                assert_eq!(m.get(a, b).unwrap(), m.get(b, a).unwrap());
            }
        }
    }

    #[test]
    fn letter_marginal_halves_off_diagonal() {
        let mut m = HalfMatrix::from_entries(
            [((b'A', b'A'), 0.25), ((b'A', b'C'), 0.5), ((b'C', b'C'), 0.25)],
            None,
            MatrixKind::ObservedFrequency,
            "",
        )
        .unwrap();
        assert!(close(m.letter_marginal(b'A').unwrap(), 0.5));
        assert!(matches!(m.letter_marginal(b'Z'), Err(SubsMatError::UnknownSymbol { symbol: b'Z' })));

        let totals = m.all_letter_marginals().unwrap().clone();
        assert!(close(totals[&b'A'], 0.5));
        assert!(close(totals[&b'C'], 0.5));
        m.set(b'A', b'A', 0.0).unwrap();
        assert!(m.letter_totals().is_empty());
    }

    #[test]
    fn entropy_requires_scoring_kind() {
        let obs = HalfMatrix::from_entries(
            [((b'A', b'A'), 0.25), ((b'A', b'C'), 0.5), ((b'C', b'C'), 0.25)],
            None,
            MatrixKind::ObservedFrequency,
            "",
        )
        .unwrap();
        let err = obs.entropy(&obs).unwrap_err();
        assert!(matches!(
            err,
            SubsMatError::UnsupportedOperation { kind: MatrixKind::ObservedFrequency, .. }
        ));
    }

    #[test]
    fn entropy_sums_half_matrix_cells_once() {
        let obs = HalfMatrix::from_entries(
            [((b'A', b'A'), 0.25), ((b'A', b'C'), 0.5), ((b'C', b'C'), 0.25)],
            None,
            MatrixKind::ObservedFrequency,
            "",
        )
        .unwrap();
        let subs = HalfMatrix::from_entries(
            [((b'A', b'A'), 2.0), ((b'A', b'C'), 0.5), ((b'C', b'C'), 2.0)],
            None,
            MatrixKind::SubstitutionRatio,
            "",
        )
        .unwrap();
        // 0.25*1 + 0.5*(-1) + 0.25*1 = 0
        assert!(close(subs.entropy(&obs).unwrap(), 0.0));

        let lo = subs.with_kind(MatrixKind::LogOdds);
        let expected = (0.25 * 2.0 + 0.5 * 0.5 + 0.25 * 2.0) / LN_2;
        assert!(close(lo.entropy(&obs).unwrap(), expected));
    }

    #[test]
    fn entropy_rejects_nonpositive_ratio() {
        let obs = HalfMatrix::deferred(Alphabet::new(b"A").unwrap(), MatrixKind::ObservedFrequency, "");
        let subs = HalfMatrix::deferred(Alphabet::new(b"A").unwrap(), MatrixKind::SubstitutionRatio, "");
        assert!(matches!(subs.entropy(&obs), Err(SubsMatError::Domain { .. })));
    }

    #[test]
    fn entropy_rejects_nan_ratio() {
        let obs = HalfMatrix::deferred(Alphabet::new(b"A").unwrap(), MatrixKind::ObservedFrequency, "");
        let mut subs = HalfMatrix::deferred(Alphabet::new(b"A").unwrap(), MatrixKind::SubstitutionRatio, "");
        subs.set(b'A', b'A', f64::NAN).unwrap();
        match subs.entropy(&obs) {
            Err(SubsMatError::Domain { pair, value }) => {
                assert_eq!(pair.to_string(), "{A,A}");
                assert!(value.is_nan());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn with_kind_copies_values() {
        let m = HalfMatrix::from_table(&full_ac(), None, MatrixKind::AcceptedReplacement, "ARM").unwrap();
        let mut copy = m.with_kind(MatrixKind::Untyped);
        copy.set(b'A', b'A', 100.0).unwrap();
        assert_eq!(m.get(b'A', b'A').unwrap(), 5.0);
        assert_eq!(copy.name(), "ARM");
        assert_eq!(copy.kind(), MatrixKind::Untyped);
    }
}
