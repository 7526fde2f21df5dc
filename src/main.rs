mod args;
mod report;

use clap::Parser;
use snafu::ErrorCompat;

use crate::args::Args;
use crate::report::run_report;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run_report(&args) {
        eprintln!("pollboard: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("{}", bt);
        }
        std::process::exit(1);
    }
}
