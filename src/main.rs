//! Portico CLI — deployment definitions and template synthesis.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "portico",
    version,
    about = "Deployment definitions and template synthesis for a photography-portfolio platform"
)]
struct Cli {
    #[command(subcommand)]
    command: portico::cli::Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = portico::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
