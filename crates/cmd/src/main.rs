// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, bail};
use clap::Parser;
use cmd::cli::Cli;
use cmd::prompt::collect_scripts;
use cmd::runner::run_scripts;
use diagnostics::log_info;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init_diagnostics();

    let cli = Cli::parse();

    let scripts = if cli.scripts.is_empty() {
        collect_scripts(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?
    } else {
        cli.scripts.clone()
    };
    if scripts.is_empty() {
        bail!("no command scripts given");
    }

    let fs = cli.file_system().await?;
    let reports = run_scripts(&fs, &scripts, &cli.output_dir).await?;
    let workers = reports.len();
    log_info!("All {workers} workers finished", workers: workers);
    Ok(())
}
