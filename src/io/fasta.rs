use std::io::BufRead;

use crate::error::{Result, SubsMatError};
use crate::util::seq;

/// 比对中的一行：`>id desc` 加上对齐后的残基串
#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

/// 比对格式 FASTA 读取器。
///
/// 残基统一为大写，空位 ('-', '.', '~') 统一为 '-'，行内空白忽略；
/// 第一个 '>' 之前出现残基视为格式错误。
pub struct FastaReader<R: BufRead> {
    reader: R,
    line: String,
    line_no: usize,
    pending: Option<(usize, String)>,
    done: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
            pending: None,
            done: false,
        }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line)?;
        if n == 0 {
            self.done = true;
            return Ok(false);
        }
        self.line_no += 1;
        Ok(true)
    }

    /// 下一条记录的头部：(行号, '>' 之后的文本)
    fn next_header(&mut self) -> Result<Option<(usize, String)>> {
        if let Some(h) = self.pending.take() {
            return Ok(Some(h));
        }
        while !self.done && self.read_line()? {
            let text = self.line.trim();
            if let Some(rest) = text.strip_prefix('>') {
                return Ok(Some((self.line_no, rest.trim().to_string())));
            }
            if !text.is_empty() {
                return Err(SubsMatError::parse(self.line_no, "sequence data before first '>' header"));
            }
        }
        Ok(None)
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        let Some((header_line, header)) = self.next_header()? else {
            return Ok(None);
        };

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        if id.is_empty() {
            return Err(SubsMatError::parse(header_line, "empty sequence id"));
        }
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut residues = Vec::new();
        while !self.done && self.read_line()? {
            if self.line.starts_with('>') {
                self.pending = Some((self.line_no, self.line[1..].trim().to_string()));
                break;
            }
            residues.extend(
                self.line
                    .bytes()
                    .filter(|b| !b.is_ascii_whitespace())
                    .map(seq::normalize_residue),
            );
        }

        Ok(Some(FastaRecord { id, desc, seq: residues }))
    }
}

/// 读取整个比对，检查各行等长。
pub fn read_alignment<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut r = FastaReader::new(reader);
    let mut records = Vec::new();
    while let Some(rec) = r.next_record()? {
        records.push(rec);
    }
    if let Some(first) = records.first() {
        let width = first.seq.len();
        if let Some(bad) = records.iter().find(|rec| rec.seq.len() != width) {
            return Err(SubsMatError::invalid_alignment(format!(
                "sequence '{}' has length {}, expected {}",
                bad.id,
                bad.seq.len(),
                width
            )));
        }
    }
    Ok(records)
}
