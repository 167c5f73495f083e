// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::{error, info};

use api_buddy::config::Config;
use api_buddy::credential::flow::TerminalPrompt;
use api_buddy::error::EXIT_INTERRUPTED;
use api_buddy::prefs::PrefsFile;
use api_buddy::run::{init_tracing, run};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(&config);

    let store = PrefsFile::new(config.prefs_path());
    let prompt = TerminalPrompt;
    let color = config.color();
    let mut stdout = std::io::stdout();

    let result = tokio::select! {
        result = run(&config.command, &store, &prompt, &mut stdout, color) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            eprintln!("\nInterrupted.");
            std::process::exit(EXIT_INTERRUPTED);
        }
    };

    if let Err(e) = result {
        error!(err = e.as_str(), "{}", e.title());
        eprint!("{}", e.report());
        std::process::exit(e.exit_code());
    }
}
