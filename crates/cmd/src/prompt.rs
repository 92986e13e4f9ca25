// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Interactive collection of command script filenames.

use anyhow::Result;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const PROMPT: &str = "Enter a filename or 'x' to exit:  ";
const DONE: &str = "x";

/// Reads filenames until `x` or end of input. Names that are not existing
/// regular files are reported and skipped.
pub async fn collect_scripts<R, W>(input: R, mut output: W) -> Result<Vec<PathBuf>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut scripts = Vec::new();
    let mut lines = input.lines();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let name = line.trim();
        if name == DONE {
            break;
        }
        let is_file = tokio::fs::metadata(name).await.map(|m| m.is_file()).unwrap_or(false);
        if is_file {
            scripts.push(PathBuf::from(name));
        } else {
            output.write_all(b"File not found.\n").await?;
        }
    }
    Ok(scripts)
}
