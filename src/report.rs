use serde::Serialize;

use crate::matrix::{HalfMatrix, MatrixKind};
use crate::pipeline::LogOddsOpt;

/// 结果来源信息
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportMeta {
    pub source_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

impl ReportMeta {
    /// 记录当前命令行与 UTC 时间戳
    pub fn capture(source_file: Option<&str>) -> Self {
        Self {
            source_file: source_file.map(str::to_string),
            build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
            build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportCell {
    pub a: char,
    pub b: char,
    pub value: f64,
}

/// 矩阵的 JSON 输出形式
#[derive(Debug, Clone, Serialize)]
pub struct MatrixReport {
    pub name: String,
    pub kind: MatrixKind,
    pub alphabet: String,
    pub params: LogOddsOpt,
    /// 相对熵（bit）
    pub entropy: Option<f64>,
    pub cells: Vec<ReportCell>,
    pub meta: ReportMeta,
}

impl MatrixReport {
    pub fn new(m: &HalfMatrix, params: LogOddsOpt, entropy: Option<f64>, meta: ReportMeta) -> Self {
        let cells = m
            .iter()
            .map(|(p, value)| ReportCell {
                a: p.low() as char,
                b: p.high() as char,
                value,
            })
            .collect();
        Self {
            name: m.name().to_string(),
            kind: m.kind(),
            alphabet: m.alphabet().to_string(),
            params,
            entropy,
            cells,
            meta,
        }
    }
}
