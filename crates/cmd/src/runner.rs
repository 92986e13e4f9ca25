// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Runs one worker per command script against a shared file system.

use anyhow::{Context, Result};
use diagnostics::{log_debug, log_info};
use pagefs::{FileSystem, Interpreter, OpenerId, RunSummary};
use std::path::{Path, PathBuf};
use tokio::io::BufWriter;
use tokio::task::JoinSet;

/// Outcome of one worker.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub opener: OpenerId,
    pub script: PathBuf,
    pub output: PathBuf,
    pub summary: RunSummary,
}

/// Output file for the worker at `index` (zero based).
pub fn output_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("output_thread{}.txt", index + 1))
}

/// Reads every script, truncates every output file, then runs all
/// workers concurrently. Reports come back in script order.
pub async fn run_scripts(fs: &FileSystem, scripts: &[PathBuf], output_dir: &Path) -> Result<Vec<WorkerReport>> {
    let mut jobs = Vec::with_capacity(scripts.len());
    for (index, script) in scripts.iter().enumerate() {
        let text = tokio::fs::read_to_string(script)
            .await
            .with_context(|| format!("reading script {}", script.display()))?;
        let output = output_path(output_dir, index);
        let file = tokio::fs::File::create(&output)
            .await
            .with_context(|| format!("creating {}", output.display()))?;
        jobs.push((index, script.clone(), output, text, file));
    }

    let mut workers = JoinSet::new();
    for (index, script, output, text, file) in jobs {
        let fs = fs.clone();
        _ = workers.spawn(async move {
            let opener = OpenerId(index);
            let mut interpreter = Interpreter::new(&fs, opener, BufWriter::new(file));
            let summary = interpreter.run(text.lines()).await;
            (index, script, output, opener, summary)
        });
    }

    let mut reports = Vec::with_capacity(scripts.len());
    while let Some(joined) = workers.join_next().await {
        let (index, script, output, opener, summary) = joined.context("worker task failed")?;
        let summary = summary.with_context(|| format!("writing {}", output.display()))?;
        let executed = summary.executed;
        let failed = summary.failed;
        let name = output.display().to_string();
        log_info!(
            "Worker {index} finished: {executed} commands, {failed} failed, output in {name}",
            index: index,
            executed: executed,
            failed: failed,
            name: name
        );
        if let Some(word) = summary.halted_on.as_deref() {
            log_debug!("Worker {index} stopped at unknown command {word}", index: index, word: word);
        }
        reports.push(WorkerReport {
            opener,
            script,
            output,
            summary,
        });
    }
    reports.sort_by_key(|r| r.opener);
    Ok(reports)
}
