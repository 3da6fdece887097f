//! 统一错误类型。
//!
//! 库内部所有可失败操作都返回 [`Result`]；每个错误都携带出错的符号、
//! 符号对或字母表，便于调用方定位问题。CLI 层再用 `anyhow` 包装上下文。

use thiserror::Error;

use crate::matrix::{MatrixKind, SymbolPair};

#[derive(Error, Debug)]
pub enum SubsMatError {
    /// 条目数与字母表大小不符，或条目本身不合法（负计数、重复键等）
    #[error("invalid matrix: {message}")]
    InvalidMatrix { message: String },

    #[error("unknown symbol '{}'", as_char(.symbol))]
    UnknownSymbol { symbol: u8 },

    #[error("duplicate symbol '{}' in alphabet", as_char(.symbol))]
    DuplicateSymbol { symbol: u8 },

    /// 二元阶段的两个输入字母表不一致
    #[error("alphabet mismatch: [{left}] vs [{right}]")]
    AlphabetMismatch { left: String, right: String },

    /// 归一化时总量为零
    #[error("degenerate input: {message}")]
    DegenerateInput { message: String },

    #[error("{operation} is not supported on {kind} matrices")]
    UnsupportedOperation {
        operation: &'static str,
        kind: MatrixKind,
    },

    #[error("division by zero: expected frequency of {pair} is 0")]
    DivisionByZero { pair: SymbolPair },

    /// log 的参数 <= 0
    #[error("log undefined for {pair}: value {value}")]
    Domain { pair: SymbolPair, value: f64 },

    #[error("invalid frequency table: {message}")]
    InvalidFrequency { message: String },

    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("invalid alignment: {message}")]
    InvalidAlignment { message: String },

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SubsMatError>;

fn as_char(symbol: &u8) -> char {
    *symbol as char
}

impl SubsMatError {
    pub fn invalid_matrix(message: impl Into<String>) -> Self {
        Self::InvalidMatrix { message: message.into() }
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateInput { message: message.into() }
    }

    pub fn invalid_frequency(message: impl Into<String>) -> Self {
        Self::InvalidFrequency { message: message.into() }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter { message: message.into() }
    }

    pub fn invalid_alignment(message: impl Into<String>) -> Self {
        Self::InvalidAlignment { message: message.into() }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse { line, message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let e = SubsMatError::UnknownSymbol { symbol: b'Z' };
        assert_eq!(e.to_string(), "unknown symbol 'Z'");

        let e = SubsMatError::DivisionByZero { pair: SymbolPair::new(b'C', b'A') };
        assert_eq!(e.to_string(), "division by zero: expected frequency of {A,C} is 0");

        let e = SubsMatError::UnsupportedOperation { operation: "entropy", kind: MatrixKind::ObservedFrequency };
        assert_eq!(e.to_string(), "entropy is not supported on observed frequency matrices");
    }
}
