use std::fmt;

use crate::layout::Layout;
use crate::record::InstructionRecord;

/// 再構成した行が元の行と一致しなかったもの。
///
/// パーサのバグとは限らない。逆アセンブラの空白の入れ方が `Layout` と違うだけでも発生する。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mismatch {
    /// 比較した列の中での位置 (0 始まり)。
    pub index: usize,

    /// トランスクリプト上の行番号 (1 始まり)。分かる場合のみ。
    pub lineno: Option<usize>,

    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lineno {
            Some(lineno) => write!(f, "line {} (record {}): ", lineno, self.index)?,
            None => write!(f, "record {}: ", self.index)?,
        }
        write!(f, "expected {:?}, got {:?}", self.expected, self.actual)
    }
}

/// `records[i]` の生表示を `lines[i]` と比較し、一致しなかったものを返す。
///
/// 長さが食い違う場合は短い方に合わせて比較する。
pub fn verify<S: AsRef<str>>(
    lines: &[S],
    records: &[InstructionRecord],
    layout: &Layout,
) -> Vec<Mismatch> {
    if lines.len() != records.len() {
        log::warn!(
            "line count ({}) differs from record count ({}), comparing common prefix",
            lines.len(),
            records.len()
        );
    }

    lines
        .iter()
        .zip(records)
        .enumerate()
        .filter_map(|(index, (line, record))| {
            let expected = line.as_ref();
            let actual = record.display_raw(layout).to_string();
            (actual != expected).then(|| Mismatch {
                index,
                lineno: None,
                expected: expected.to_owned(),
                actual,
            })
        })
        .collect()
}
