//! 機械語のダンプを外部の逆アセンブラにかけ、結果を解析して表示する。

use std::time::Duration;

use structopt::StructOpt;

use machinecode_listing as listing;

#[derive(Debug, StructOpt)]
struct Opt {
    /// Verbosity (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Disassembler executable
    #[structopt(long, default_value = "ndisasm", parse(from_os_str))]
    disassembler: std::path::PathBuf,

    /// Instruction width passed to the disassembler
    #[structopt(long, default_value = "32", possible_values = &["16", "32", "64"])]
    bits: u32,

    #[structopt(long, default_value = "250")]
    timeout_ms: u64,

    #[structopt(flatten)]
    layout: listing::LayoutOpt,

    /// Raw instruction bytes dumped from the target process
    #[structopt(parse(from_os_str))]
    path_in: std::path::PathBuf,
}

fn main() -> eyre::Result<()> {
    let opt = Opt::from_args();
    listing::init_logger(opt.verbose);

    let blob_len = std::fs::metadata(&opt.path_in)?.len();
    log::info!("{}: {} bytes", opt.path_in.display(), blob_len);

    let captured = listing::run_disassembler(
        &opt.disassembler,
        listing::ndisasm_args(opt.bits, &opt.path_in),
        Duration::from_millis(opt.timeout_ms),
    )?;
    if captured.timed_out {
        eprintln!("warning: disassembler timed out, output may be truncated");
    }
    if !captured.stderr.is_empty() {
        log::warn!("disassembler stderr:\n{}", captured.stderr.trim_end());
    }

    let parsed = listing::parse(&captured.stdout)?;

    let layout = opt.layout.layout();
    for mismatch in parsed.verify(&layout) {
        log::warn!("{}", mismatch);
    }

    for record in &parsed.records {
        println!("{}", record.display(&layout));
    }

    let decoded_len = listing::decoded_len(&parsed.records) as u64;
    if decoded_len != blob_len {
        log::warn!(
            "disassembly covers {} bytes, but the dump has {}",
            decoded_len,
            blob_len
        );
    }

    Ok(())
}
