//! Flowgraph CLI - inspect and edit flow-chart canvas documents

mod cli;
mod script;
mod settings;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    let mut app = cli::FlowgraphApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
