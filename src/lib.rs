//! # subsmat-rust
//!
//! 从观测到的替换计数构建 BLOSUM/PAM 风格的对数几率替换矩阵。
//!
//! 计算流程（每一步都返回新的 [`HalfMatrix`]）：
//!
//! - **观测频率**：接受替换计数归一化为频率
//! - **期望频率**：由背景频率表按独立假设生成
//! - **替换比**：观测 / 期望
//! - **对数几率**：缩放、取对数并四舍五入
//!
//! ## 快速示例
//!
//! ```rust
//! use subsmat_rust::matrix::{HalfMatrix, MatrixKind};
//! use subsmat_rust::pipeline::{make_log_odds_matrix, LogOddsOpt};
//!
//! let counts = HalfMatrix::from_entries(
//!     [((b'A', b'A'), 10.0), ((b'C', b'C'), 10.0), ((b'A', b'C'), 20.0)],
//!     None,
//!     MatrixKind::AcceptedReplacement,
//!     "toy",
//! )
//! .unwrap();
//! let lo = make_log_odds_matrix(&counts, None, &LogOddsOpt::default()).unwrap();
//! assert_eq!(lo.get(b'C', b'A').unwrap(), 0.0);
//! ```
//!
//! ## 模块说明
//!
//! - [`matrix`] — 字母表、符号对、半矩阵与三角表输出
//! - [`freq`] — 背景频率表
//! - [`pipeline`] — 四个计算阶段与总入口 `make_log_odds_matrix`
//! - [`count`] — 从多序列比对统计接受替换计数
//! - [`io`] — 比对 FASTA、计数表与频率表读写
//! - [`report`] — JSON 输出
//! - [`util`] — 残基与空位处理

pub mod count;
pub mod error;
pub mod freq;
pub mod io;
pub mod matrix;
pub mod pipeline;
pub mod report;
pub mod util;

pub use error::{Result, SubsMatError};
pub use freq::FrequencyTable;
pub use matrix::{Alphabet, HalfMatrix, MatrixKind, SymbolPair};
pub use pipeline::{make_log_odds_matrix, LogOddsOpt};
