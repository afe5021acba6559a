use anyhow::Result;
use clap::Parser;
use unmangle_core::{cli::Opts, Unmangle};

pub fn main() -> Result<()> {
    let opts = Unmangle::from(Opts::parse());

    let mut builder = env_logger::Builder::from_default_env();
    if opts.verbose && std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    unmangle_core::run(&opts, &unmangle_passes::catalogue())
}
