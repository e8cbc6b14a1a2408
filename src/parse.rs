use std::ops::Range;

use logos::Logos;
use thiserror::Error;

use crate::layout::Layout;
use crate::record::InstructionRecord;
use crate::verify::{verify, Mismatch};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {lineno}: invalid address: {token}")]
    Address {
        lineno: usize,
        token: String,
        #[source]
        source: AddressError,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum AddressError {
    #[error("not a hexadecimal number")]
    NotHex,

    #[error("does not fit in 32 bits")]
    Overflow,
}

/// 16 進数のアドレスを読む。`0x`/`0X` 接頭辞は許すが、符号は許さない。
pub fn parse_address(token: &str) -> Result<u32, AddressError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::NotHex);
    }

    // 全て 16 進数字なので、ここで失敗するのは桁あふれのみ。
    u32::from_str_radix(digits, 16).map_err(|_| AddressError::Overflow)
}

#[derive(Debug, Logos)]
enum Token {
    #[regex(r"[^ ]+")]
    Field,

    // 区切りは半角空白のみ。タブはフィールドの一部として扱う。
    #[error]
    #[regex(r" +", logos::skip)]
    Error,
}

/// 行内の 1 フィールドと、その行内でのバイト位置。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field<'a> {
    pub text: &'a str,
    pub span: Range<usize>,
}

pub fn tokenize(line: &str) -> Vec<Field<'_>> {
    Token::lexer(line)
        .spanned()
        .filter(|(token, _)| matches!(token, Token::Field))
        .map(|(_, span)| Field {
            text: &line[span.clone()],
            span,
        })
        .collect()
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineOutcome {
    Record(InstructionRecord),

    /// フィールドが 3 個未満。
    Malformed,
}

/// 1 行を解析する。`lineno` はエラー報告用。
pub fn parse_line(lineno: usize, line: &str) -> ParseResult<LineOutcome> {
    let fields = tokenize(line);
    if fields.len() < 3 {
        return Ok(LineOutcome::Malformed);
    }

    let address = parse_address(fields[0].text).map_err(|e| ParseError::Address {
        lineno,
        token: fields[0].text.to_owned(),
        source: e,
    })?;
    let raw_bytes = fields[1].text;

    // テキスト部は元の空白を保つため、再結合せず第 3 フィールドの開始位置から行末までを取る。
    let text = &line[fields[2].span.start..];

    Ok(LineOutcome::Record(InstructionRecord::new(
        address, raw_bytes, text,
    )))
}

/// アドレスが 16 進数として読めない行の扱い。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressPolicy {
    /// トランスクリプト全体をエラーにする。
    Abort,

    /// その行を `skipped` に記録して続行する。
    Skip,
}

impl Default for AddressPolicy {
    fn default() -> Self {
        Self::Abort
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    TooFewFields,
    BadAddress(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkippedLine {
    pub lineno: usize,
    pub line: String,
    pub reason: SkipReason,
}

/// トランスクリプトの解析結果。
///
/// `records[i]` は `lines[i]` (トランスクリプトの `linenos[i]` 行目) から得られたもの。
/// スキップされた行はどれにも含まれない。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Parsed {
    pub records: Vec<InstructionRecord>,
    pub lines: Vec<String>,
    pub linenos: Vec<usize>,
    pub skipped: Vec<SkippedLine>,
}

impl Parsed {
    /// 各レコードを元の行と照合する。不一致には元の行番号を付ける。
    pub fn verify(&self, layout: &Layout) -> Vec<Mismatch> {
        verify(&self.lines, &self.records, layout)
            .into_iter()
            .map(|mismatch| {
                let lineno = self.linenos.get(mismatch.index).copied();
                Mismatch { lineno, ..mismatch }
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Parser {
    address_policy: AddressPolicy,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address_policy(mut self, policy: AddressPolicy) -> Self {
        self.address_policy = policy;
        self
    }

    pub fn parse(&self, transcript: &str) -> ParseResult<Parsed> {
        let mut parsed = Parsed::default();

        // 空行は捨てる。行番号は元のトランスクリプト上の番号 (1 始まり)。
        for (i, line) in transcript.lines().enumerate() {
            let lineno = i + 1;
            if line.is_empty() {
                continue;
            }

            match parse_line(lineno, line) {
                Ok(LineOutcome::Record(record)) => {
                    parsed.records.push(record);
                    parsed.lines.push(line.to_owned());
                    parsed.linenos.push(lineno);
                }
                Ok(LineOutcome::Malformed) => {
                    log::warn!("line {}: unexpected line: {}", lineno, line);
                    parsed.skipped.push(SkippedLine {
                        lineno,
                        line: line.to_owned(),
                        reason: SkipReason::TooFewFields,
                    });
                }
                Err(e) => match self.address_policy {
                    AddressPolicy::Abort => return Err(e),
                    AddressPolicy::Skip => {
                        log::warn!("{}", e);
                        let ParseError::Address { token, .. } = e;
                        parsed.skipped.push(SkippedLine {
                            lineno,
                            line: line.to_owned(),
                            reason: SkipReason::BadAddress(token),
                        });
                    }
                },
            }
        }

        log::debug!(
            "parsed {} records, skipped {} lines",
            parsed.records.len(),
            parsed.skipped.len()
        );

        Ok(parsed)
    }
}

/// 既定の設定 (不正なアドレスで中断) でトランスクリプトを解析する。
pub fn parse(transcript: &str) -> ParseResult<Parsed> {
    Parser::new().parse(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn record(line: &str) -> InstructionRecord {
        match parse_line(1, line).unwrap() {
            LineOutcome::Record(record) => record,
            LineOutcome::Malformed => panic!("malformed: {}", line),
        }
    }

    #[test]
    fn tokenize_keeps_spans() {
        let fields = tokenize("0000000A  E879BBFA70  call");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].text, "E879BBFA70");
        assert_eq!(fields[2].span, 22..26);
    }

    #[test]
    fn tokenize_does_not_split_on_tabs() {
        let fields = tokenize("00000000\t55 push");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].text, "00000000\t55");
    }

    #[test]
    fn parse_push() {
        let record = record("00000000  55                push ebp");
        assert_eq!(record.address(), 0);
        assert_eq!(record.raw_bytes(), "55");
        assert_eq!(record.text(), "push ebp");
        assert_eq!(record.mnemonic(), Some("push"));
        assert_eq!(record.operands(), Some(" ebp"));
    }

    #[test]
    fn parse_call() {
        let record = record("0000000A  E879BBFA70        call dword 0x70fabb88");
        assert_eq!(record.address(), 0xA);
        assert_eq!(record.raw_bytes(), "E879BBFA70");
        assert_eq!(record.mnemonic(), Some("call"));
        assert_eq!(record.operands(), Some(" dword 0x70fabb88"));
    }

    #[test]
    fn text_keeps_inner_spacing() {
        let record = record("00000003  57                rep  movsd");
        assert_eq!(record.text(), "rep  movsd");
        assert_eq!(record.operands(), Some("  movsd"));
    }

    #[test]
    fn text_starts_at_third_field_even_if_it_occurs_earlier() {
        // 第 3 フィールドと同じ文字列がそれより前に現れても位置は取り違えない。
        let record = record("00000055  55                55");
        assert_eq!(record.text(), "55");
    }

    #[test]
    fn malformed_line() {
        assert_eq!(parse_line(1, "bogus line").unwrap(), LineOutcome::Malformed);
    }

    #[test]
    fn bad_address() {
        let err = parse_line(7, "zz  90  nop").unwrap_err();
        assert!(matches!(err, ParseError::Address { lineno: 7, ref token, .. } if token == "zz"));
    }

    #[test]
    fn address_overflow() {
        assert!(parse_line(1, "100000000  90  nop").is_err());
        assert_eq!(parse_address("100000000"), Err(AddressError::Overflow));
        assert_eq!(parse_address("FFFFFFFF"), Ok(0xFFFF_FFFF));
    }

    #[test]
    fn address_prefix_and_sign() {
        assert_eq!(parse_address("0x1F"), Ok(0x1F));
        assert_eq!(parse_address("0X1f"), Ok(0x1F));
        assert_eq!(parse_address("+55"), Err(AddressError::NotHex));
        assert_eq!(parse_address("-1"), Err(AddressError::NotHex));
        assert_eq!(parse_address("0x"), Err(AddressError::NotHex));

        let err = parse_line(3, "+55  90  nop").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Address {
                lineno: 3,
                source: AddressError::NotHex,
                ..
            }
        ));
    }

    #[test]
    fn parse_skips_malformed_lines() {
        let parsed = parse(
            "00000000  55                push ebp\n\
             bogus line\n\
             00000001  8BEC              mov ebp,esp\n",
        )
        .unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].address(), 1);
        assert_eq!(parsed.lines[1], "00000001  8BEC              mov ebp,esp");
        assert_eq!(parsed.linenos, vec![1, 3]);
        assert_eq!(
            parsed.skipped,
            vec![SkippedLine {
                lineno: 2,
                line: "bogus line".to_owned(),
                reason: SkipReason::TooFewFields,
            }]
        );
    }

    #[test]
    fn parse_handles_crlf_and_empty_lines() {
        let parsed = parse("00000000  55                push ebp\r\n\r\n00000001  C3                ret\r\n").unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].text(), "ret");
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn mismatch_after_skipped_line_points_at_source_line() {
        let parsed = parse("bogus line\n00000000  55 push ebp\n").unwrap();
        assert_eq!(parsed.skipped[0].lineno, 1);

        let mismatches = parsed.verify(&Layout::default());
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].index, 0);
        assert_eq!(mismatches[0].lineno, Some(2));
        assert!(mismatches[0].to_string().starts_with("line 2 (record 0): "));
    }

    #[test]
    fn empty_transcript() {
        assert_eq!(parse("").unwrap(), Parsed::default());
    }

    #[test]
    fn bad_address_aborts_by_default() {
        let transcript = "00000000  55  push ebp\nXYZ  90  nop\n";
        assert!(parse(transcript).is_err());
    }

    #[test]
    fn bad_address_can_be_skipped() {
        let transcript = "00000000  55  push ebp\nXYZ  90  nop\n00000002  C3  ret\n";
        let parsed = Parser::new()
            .address_policy(AddressPolicy::Skip)
            .parse(transcript)
            .unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].lineno, 2);
        assert_eq!(parsed.skipped[0].reason, SkipReason::BadAddress("XYZ".to_owned()));
    }

    proptest! {
        #[test]
        fn fewer_than_three_fields_never_produce_a_record(line in "[A-Za-z0-9]{1,8}( +[A-Za-z0-9]{1,8})?") {
            prop_assert_eq!(parse_line(1, &line).unwrap(), LineOutcome::Malformed);
        }

        #[test]
        fn mnemonic_and_operands_coexist(line in "[0-9A-F]{8}  [0-9A-F]{2,16} +[a-z]{2,6}( [a-z0-9,]{1,12})?") {
            let record = record(&line);
            prop_assert_eq!(record.mnemonic().is_some(), record.operands().is_some());
        }

        #[test]
        fn well_formed_lines_round_trip(
            address in any::<u32>(),
            raw_bytes in "([0-9A-F]{2}){1,8}",
            text in "[a-z]{2,6}( [a-z0-9,\\[\\]+]{1,16})?",
        ) {
            let layout = Layout::default();
            let line = format!("{:08X}  {:<18}{}", address, raw_bytes, text);
            let record = record(&line);
            prop_assert_eq!(record.display_raw(&layout).to_string(), line);
        }

        #[test]
        fn reparse_of_raw_rendering_is_stable(line in "[0-9a-fA-F]{1,8} +[0-9A-F]{2,16} +[a-z]{2,6}( [a-z0-9,]{1,12})?") {
            let first = record(&line);
            let second = record(&first.display_raw(&Layout::default()).to_string());
            prop_assert_eq!(first.address(), second.address());
            prop_assert_eq!(first.raw_bytes(), second.raw_bytes());
        }

        #[test]
        fn order_is_preserved(addresses in proptest::collection::vec(any::<u32>(), 0..32)) {
            let transcript: String = addresses
                .iter()
                .map(|addr| format!("{:08X}  90                nop\n", addr))
                .collect();
            let parsed = parse(&transcript).unwrap();
            let got: Vec<u32> = parsed.records.iter().map(InstructionRecord::address).collect();
            prop_assert_eq!(got, addresses);
        }
    }
}
