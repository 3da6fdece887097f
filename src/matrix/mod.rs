//! 半矩阵数据结构及其字母表。

pub mod alphabet;
pub mod half;
pub mod render;

pub use alphabet::{Alphabet, SymbolPair};
pub use half::{fold, HalfMatrix, MatrixKind, PairTable};
pub use render::RenderOpt;
