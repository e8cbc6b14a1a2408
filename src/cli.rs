//! バイナリ共通のオプション。

use structopt::StructOpt;

use crate::layout::{Layout, MNEMONIC_WIDTH, RAW_BYTES_WIDTH};

#[derive(Debug, StructOpt)]
pub struct LayoutOpt {
    /// Minimum width of the mnemonic column in structured output
    #[structopt(long, default_value = "12")]
    pub mnemonic_width: usize,

    /// Minimum width of the raw bytes column in disassembler output
    #[structopt(long, default_value = "18")]
    pub raw_bytes_width: usize,
}

impl LayoutOpt {
    pub fn layout(&self) -> Layout {
        Layout::new(self.mnemonic_width, self.raw_bytes_width)
    }
}

impl Default for LayoutOpt {
    fn default() -> Self {
        Self {
            mnemonic_width: MNEMONIC_WIDTH,
            raw_bytes_width: RAW_BYTES_WIDTH,
        }
    }
}

/// `-v` の数に応じたログレベルでロガーを初期化する。`RUST_LOG` があればそちらを優先。
pub fn init_logger(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}
