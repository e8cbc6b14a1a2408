use std::fmt;

use crate::layout::Layout;

/// 逆アセンブラ出力の 1 行分。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstructionRecord {
    address: u32,

    // 整形を完全に再現するため、バイト列にはデコードせずテキストのまま持つ。
    raw_bytes: String,

    text: String,

    // mnemonic と operands は text から同時に導出されるので、両方あるか両方ないかのどちらか。
    // operands は先頭の空白を含む。
    split: Option<(String, String)>,
}

impl InstructionRecord {
    pub fn new(address: u32, raw_bytes: impl Into<String>, text: impl Into<String>) -> Self {
        let raw_bytes = raw_bytes.into();
        let text = text.into();

        let split = text
            .find(' ')
            .map(|pos| (text[..pos].to_owned(), text[pos..].to_owned()));

        Self {
            address,
            raw_bytes,
            text,
            split,
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn raw_bytes(&self) -> &str {
        &self.raw_bytes
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mnemonic(&self) -> Option<&str> {
        self.split.as_ref().map(|(mnemonic, _)| mnemonic.as_str())
    }

    pub fn operands(&self) -> Option<&str> {
        self.split.as_ref().map(|(_, operands)| operands.as_str())
    }

    /// 機械語バイト列をデコードする。
    pub fn bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.raw_bytes)
    }

    /// 構造化表示。ニーモニックがなければ生表示と同じになる。
    pub fn display(&self, layout: &Layout) -> Structured<'_> {
        Structured {
            record: self,
            layout: *layout,
        }
    }

    /// 逆アセンブラの出力形式での表示。
    pub fn display_raw(&self, layout: &Layout) -> Raw<'_> {
        Raw {
            record: self,
            layout: *layout,
        }
    }
}

/// レコードの機械語バイト数の合計。デコードできないレコードは警告を出して数えない。
pub fn decoded_len(records: &[InstructionRecord]) -> usize {
    records
        .iter()
        .filter_map(|record| match record.bytes() {
            Ok(bytes) => Some(bytes.len()),
            Err(e) => {
                log::warn!("{:08X}: {}", record.address(), e);
                None
            }
        })
        .sum()
}

impl fmt::Display for InstructionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display(&Layout::default()).fmt(f)
    }
}

#[derive(Debug)]
pub struct Structured<'a> {
    record: &'a InstructionRecord,
    layout: Layout,
}

impl fmt::Display for Structured<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.record.mnemonic(), self.record.operands()) {
            (Some(mnemonic), Some(operands)) => write!(
                f,
                "{:08X}  {:<width$}{}",
                self.record.address,
                mnemonic,
                operands,
                width = self.layout.mnemonic_width()
            ),
            _ => self.record.display_raw(&self.layout).fmt(f),
        }
    }
}

#[derive(Debug)]
pub struct Raw<'a> {
    record: &'a InstructionRecord,
    layout: Layout,
}

impl fmt::Display for Raw<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}  {:<width$}{}",
            self.record.address,
            self.record.raw_bytes,
            self.record.text,
            width = self.layout.raw_bytes_width()
        )
    }
}
