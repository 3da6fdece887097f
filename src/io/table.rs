//! 纯文本表格：
//!
//! - 符号对计数表，每行 `A C 10`，可为全矩阵或半矩阵
//! - 频率表，每行 `A 0.25`
//!
//! 空行与 `#` 开头的行被忽略。

use std::io::{BufRead, Write};

use crate::error::{Result, SubsMatError};
use crate::freq::FrequencyTable;
use crate::matrix::{Alphabet, HalfMatrix, MatrixKind, PairTable};

/// 频率表中数值的含义
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreqMode {
    /// 已是频率，总和须为 1
    Frequencies,
    /// 计数，读入后归一化
    Counts,
}

pub fn read_pair_table<R: BufRead>(reader: R) -> Result<PairTable> {
    let mut table = PairTable::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        let fields: Vec<&str> = match data_fields(&line) {
            Some(f) => f,
            None => continue,
        };
        if fields.len() != 3 {
            return Err(SubsMatError::parse(lineno, format!("expected 3 fields, got {}", fields.len())));
        }
        let a = parse_symbol(fields[0], lineno)?;
        let b = parse_symbol(fields[1], lineno)?;
        let v = parse_value(fields[2], lineno)?;
        if table.insert((a, b), v).is_some() {
            return Err(SubsMatError::parse(
                lineno,
                format!("pair ({},{}) listed twice", a as char, b as char),
            ));
        }
    }
    Ok(table)
}

/// 读取接受替换计数表并折叠为半矩阵。
pub fn read_count_matrix<R: BufRead>(
    reader: R,
    alphabet: Option<Alphabet>,
    name: impl Into<String>,
) -> Result<HalfMatrix> {
    let table = read_pair_table(reader)?;
    HalfMatrix::from_table(&table, alphabet, MatrixKind::AcceptedReplacement, name)
}

pub fn read_frequency_table<R: BufRead>(reader: R, mode: FreqMode) -> Result<FrequencyTable> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        let fields = match data_fields(&line) {
            Some(f) => f,
            None => continue,
        };
        if fields.len() != 2 {
            return Err(SubsMatError::parse(lineno, format!("expected 2 fields, got {}", fields.len())));
        }
        entries.push((parse_symbol(fields[0], lineno)?, parse_value(fields[1], lineno)?));
    }
    match mode {
        FreqMode::Frequencies => FrequencyTable::from_frequencies(entries),
        FreqMode::Counts => FrequencyTable::from_counts(entries),
    }
}

/// 按半矩阵顺序写出 `A C value`，可被 [`read_pair_table`] 读回。
pub fn write_pair_table<W: Write>(m: &HalfMatrix, out: &mut W) -> Result<()> {
    if !m.name().is_empty() {
        writeln!(out, "# {}", m.name())?;
    }
    writeln!(out, "# {} matrix over {}", m.kind(), m.alphabet())?;
    for (pair, v) in m.iter() {
        writeln!(out, "{} {} {}", pair.low() as char, pair.high() as char, v)?;
    }
    Ok(())
}

fn data_fields(line: &str) -> Option<Vec<&str>> {
    let t = line.trim();
    if t.is_empty() || t.starts_with('#') {
        None
    } else {
        Some(t.split_whitespace().collect())
    }
}

fn parse_symbol(s: &str, lineno: usize) -> Result<u8> {
    match s.as_bytes() {
        [b] if b.is_ascii_graphic() => Ok(*b),
        _ => Err(SubsMatError::parse(lineno, format!("'{}' is not a single-character symbol", s))),
    }
}

fn parse_value(s: &str, lineno: usize) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|e| SubsMatError::parse(lineno, format!("bad value '{}': {}", s, e)))
}
