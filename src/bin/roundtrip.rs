//! トランスクリプトを解析 -> 再構成して元の行に戻るかテストする。

use structopt::StructOpt;

use machinecode_listing as listing;

#[derive(Debug, StructOpt)]
struct Opt {
    /// Verbosity (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Exit with an error if any line fails to round-trip
    #[structopt(long)]
    strict: bool,

    #[structopt(flatten)]
    layout: listing::LayoutOpt,

    #[structopt(parse(from_os_str))]
    path_in: std::path::PathBuf,
}

fn main() -> eyre::Result<()> {
    let opt = Opt::from_args();
    listing::init_logger(opt.verbose);

    let transcript = std::fs::read_to_string(&opt.path_in)?;
    let parsed = listing::parse(&transcript)?;

    let mismatches = parsed.verify(&opt.layout.layout());
    for mismatch in &mismatches {
        println!("{}", mismatch);
    }

    log::info!(
        "{} records, {} skipped, {} mismatches",
        parsed.records.len(),
        parsed.skipped.len(),
        mismatches.len()
    );

    if opt.strict && !mismatches.is_empty() {
        eyre::bail!("{} lines failed to round-trip", mismatches.len());
    }

    Ok(())
}
