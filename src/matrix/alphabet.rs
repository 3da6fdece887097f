use std::fmt;

use crate::error::{Result, SubsMatError};

/// 无序符号对，规范化为 (low, high)。
/// 半矩阵中每个无序对恰好对应一个存储单元。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolPair(u8, u8);

impl SymbolPair {
    #[inline]
    pub fn new(a: u8, b: u8) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    #[inline]
    pub fn low(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn high(&self) -> u8 {
        self.1
    }

    #[inline]
    pub fn is_diagonal(&self) -> bool {
        self.0 == self.1
    }

    #[inline]
    pub fn contains(&self, symbol: u8) -> bool {
        self.0 == symbol || self.1 == symbol
    }
}

impl fmt::Display for SymbolPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.0 as char, self.1 as char)
    }
}

/// 有序、无重复的符号集合。
///
/// 内部始终按字节序排序保存，因此两个字母表的列表相等即集合相等。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alphabet {
    letters: Vec<u8>,
}

impl Alphabet {
    /// 由用户给出的符号构建字母表；出现重复符号时报错。
    pub fn new(letters: &[u8]) -> Result<Self> {
        let mut sorted = letters.to_vec();
        sorted.sort_unstable();
        if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(SubsMatError::DuplicateSymbol { symbol: w[0] });
        }
        Ok(Self { letters: sorted })
    }

    /// 从矩阵的键推断字母表：所有键中出现过的符号的有序并集。
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = (u8, u8)>,
    {
        let mut letters: Vec<u8> = Vec::new();
        for (a, b) in keys {
            letters.push(a);
            letters.push(b);
        }
        letters.sort_unstable();
        letters.dedup();
        Self { letters }
    }

    pub fn letters(&self) -> &[u8] {
        &self.letters
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn contains(&self, symbol: u8) -> bool {
        self.letters.binary_search(&symbol).is_ok()
    }

    pub fn index_of(&self, symbol: u8) -> Option<usize> {
        self.letters.binary_search(&symbol).ok()
    }

    pub fn check(&self, symbol: u8) -> Result<()> {
        if self.contains(symbol) {
            Ok(())
        } else {
            Err(SubsMatError::UnknownSymbol { symbol })
        }
    }

    /// 两个字母表必须逐项相同（有序列表相等）。
    pub fn ensure_matches(&self, other: &Alphabet) -> Result<()> {
        if self.letters == other.letters {
            Ok(())
        } else {
            Err(SubsMatError::AlphabetMismatch {
                left: self.to_string(),
                right: other.to_string(),
            })
        }
    }

    /// 全矩阵条目数 N*N
    pub fn full_size(&self) -> usize {
        self.len() * self.len()
    }

    /// 半矩阵条目数 N*(N+1)/2
    pub fn half_size(&self) -> usize {
        self.len() * (self.len() + 1) / 2
    }

    /// 按行优先顺序枚举半矩阵的所有规范符号对（含对角线）。
    pub fn pairs(&self) -> impl Iterator<Item = SymbolPair> + '_ {
        self.letters.iter().enumerate().flat_map(move |(i, &a)| {
            self.letters[i..].iter().map(move |&b| SymbolPair::new(a, b))
        })
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.letters {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}
