use std::io::{Read, Write};

use structopt::StructOpt;

use machinecode_listing as listing;

#[derive(Debug, StructOpt)]
struct Opt {
    /// Verbosity (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Skip lines whose address is not hexadecimal instead of failing
    #[structopt(long)]
    skip_bad_addresses: bool,

    #[structopt(flatten)]
    layout: listing::LayoutOpt,

    /// Disassembler transcript ("-" for stdin)
    #[structopt(parse(from_os_str))]
    path_in: std::path::PathBuf,
}

fn main() -> eyre::Result<()> {
    let opt = Opt::from_args();
    listing::init_logger(opt.verbose);

    let transcript = if opt.path_in.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&opt.path_in)?
    };

    let policy = if opt.skip_bad_addresses {
        listing::AddressPolicy::Skip
    } else {
        listing::AddressPolicy::Abort
    };
    let parsed = listing::Parser::new()
        .address_policy(policy)
        .parse(&transcript)?;

    let layout = opt.layout.layout();
    let wtr = std::io::stdout();
    let mut wtr = std::io::BufWriter::new(wtr.lock());
    for record in &parsed.records {
        writeln!(wtr, "{}", record.display(&layout))?;
    }

    Ok(())
}
