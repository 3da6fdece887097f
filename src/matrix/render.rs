use std::io::Write;

use super::alphabet::Alphabet;
use super::half::HalfMatrix;
use crate::error::Result;

/// 三角表输出格式：单元宽度与小数位数
#[derive(Clone, Copy, Debug)]
pub struct RenderOpt {
    pub cell_width: usize,
    pub precision: usize,
}

impl Default for RenderOpt {
    fn default() -> Self {
        Self { cell_width: 4, precision: 0 }
    }
}

impl HalfMatrix {
    /// 输出下三角表：每行以行符号开头，最后一行为列标题。
    ///
    /// `order` 可给出字母表的任意排列作为坐标轴顺序，
    /// 但必须恰好覆盖矩阵的符号集合。
    pub fn render<W: Write>(&self, out: &mut W, order: Option<&[u8]>, opt: &RenderOpt) -> Result<()> {
        let order: Vec<u8> = match order {
            Some(o) => {
                Alphabet::new(o)?.ensure_matches(self.alphabet())?;
                o.to_vec()
            }
            None => self.alphabet().letters().to_vec(),
        };
        let w = opt.cell_width;
        let p = opt.precision;

        for (i, &row) in order.iter().enumerate() {
            let mut line = String::with_capacity(1 + (i + 1) * w);
            line.push(row as char);
            for &col in &order[..=i] {
                let val = self.get(col, row)?;
                line.push_str(&format!("{:>w$.p$}", val, w = w, p = p));
            }
            writeln!(out, "{}", line)?;
        }

        let mut bottom = String::from(" ");
        for &col in &order {
            bottom.push_str(&format!("{:>w$}", col as char, w = w));
        }
        writeln!(out, "{}", bottom)?;
        Ok(())
    }

    pub fn render_to_string(&self, order: Option<&[u8]>, opt: &RenderOpt) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        self.render(&mut buf, order, opt)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
