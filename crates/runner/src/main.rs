//! The `inlist` binary.

use clap::Parser;
use inlist_runner::cli::Cli;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);
	cli.execute()?;
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("inlist_runner=debug,inlist_access=debug,info")
		} else {
			EnvFilter::new("info")
		}
	});
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(verbose)
		.with_writer(std::io::stderr)
		.init();
}
