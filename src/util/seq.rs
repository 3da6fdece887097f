/// 比对中的空位符号
pub const GAP: u8 = b'-';

#[inline]
pub fn is_gap(b: u8) -> bool {
    matches!(b, b'-' | b'.' | b'~')
}

/// 残基统一为大写；'.'、'~' 统一为 '-'
#[inline]
pub fn normalize_residue(b: u8) -> u8 {
    if is_gap(b) {
        GAP
    } else {
        b.to_ascii_uppercase()
    }
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        out.push(normalize_residue(b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_uppercases_and_unifies_gaps() {
        assert_eq!(normalize_seq(b"ac.Gt~-"), b"AC-GT--");
    }

    #[test]
    fn gap_detection() {
        assert!(is_gap(b'-'));
        assert!(is_gap(b'.'));
        assert!(!is_gap(b'N'));
    }
}
