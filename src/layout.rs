/// 構造化表示でニーモニック欄を埋める幅。
pub const MNEMONIC_WIDTH: usize = 12;

/// 生表示で機械語バイト欄を埋める幅 (ndisasm の出力に合わせている)。
pub const RAW_BYTES_WIDTH: usize = 18;

/// 命令行を再構成するときのカラム幅。
///
/// 幅はあくまで最小値で、それより長いフィールドは切り詰めずにそのまま出力する。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Layout {
    mnemonic_width: usize,
    raw_bytes_width: usize,
}

impl Layout {
    pub fn new(mnemonic_width: usize, raw_bytes_width: usize) -> Self {
        Self {
            mnemonic_width,
            raw_bytes_width,
        }
    }

    pub fn mnemonic_width(self) -> usize {
        self.mnemonic_width
    }

    pub fn raw_bytes_width(self) -> usize {
        self.raw_bytes_width
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(MNEMONIC_WIDTH, RAW_BYTES_WIDTH)
    }
}
