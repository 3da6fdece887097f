//! 演示如何在 library 模式下从比对构建对数几率矩阵。
//!
//! 运行方式：
//! ```bash
//! cargo run --example build_matrix
//! ```

use subsmat_rust::count::{self, CountOpt};
use subsmat_rust::matrix::RenderOpt;
use subsmat_rust::pipeline::{self, LogOddsOpt};

fn main() -> subsmat_rust::Result<()> {
    // 1. 一个小的核苷酸比对
    let aln: Vec<Vec<u8>> = [
        "ACGTACGTAC",
        "ACGTTCGTAC",
        "ACGAACG-AC",
        "TCGTACGTAG",
    ]
    .iter()
    .map(|s| s.as_bytes().to_vec())
    .collect();
    println!("比对: {} 条序列, {} 列", aln.len(), aln[0].len());

    // 2. 统计接受替换（加伪计数避免 log(0)）
    let opt = CountOpt { alphabet: None, pseudocount: 1.0 };
    let counts = count::count_replacements(&aln, &opt)?;
    println!("字母表: {}, 单元数: {}", counts.alphabet(), counts.len());

    // 3. 逐阶段计算
    let obs = pipeline::build_obs_freq_mat(&counts)?;
    let table = pipeline::exp_freq_table_from_obs_freq(&obs)?;
    for (s, f) in table.iter() {
        println!("  背景频率 {} = {:.3}", s as char, f);
    }
    let exp = pipeline::build_exp_freq_mat(&table, Some(obs.alphabet()))?;
    let subs = pipeline::build_subs_mat(&obs, &exp)?;
    let lo = pipeline::build_log_odds_mat(&subs, &LogOddsOpt { log_base: 2.0, scale_factor: 2.0, round_digits: 0 })?;

    // 4. 输出
    println!("\n对数几率矩阵（半 bit）:");
    print!("{}", lo.render_to_string(None, &RenderOpt::default())?);
    println!("相对熵: {:.4} bits", lo.entropy(&obs)?);
    Ok(())
}
