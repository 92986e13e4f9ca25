// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Line-oriented command interpreter, one per worker.
//!
//! Each line is one command of space-separated tokens. The outcome of every
//! command is written to the worker's output sink; an unknown command word
//! ends the stream.

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::gft::{AccessMode, OpenerId};
use crate::session::Session;
use crate::wd::WD;
use diagnostics::{log_debug, log_error, log_info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// A decoded command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir(String),
    Chdir(String),
    Mv(String, String),
    Pwd,
    Print,
    ShowMemoryMap,
    Save(String),
    Create(String),
    Delete(String),
    Open(String, AccessMode),
    Close(String),
    Read(String),
    ReadFrom { path: String, start: usize, size: usize },
    Append { path: String, text: String },
    WriteAt { path: String, text: String, pos: usize },
    Move { path: String, start: usize, size: usize, target: usize },
    Truncate { path: String, size: usize },
}

/// Result of decoding one line.
#[derive(Debug)]
pub enum Parsed {
    Blank,
    Command(Command),
    /// A known command word with unusable arguments
    Malformed(Error),
    /// Not in the grammar; ends the stream
    Unknown(String),
}

fn number(token: &str, what: &str) -> Result<usize> {
    token
        .parse()
        .map_err(|_| Error::invalid_command(format!("{what} must be a non-negative integer, got '{token}'")))
}

fn arg<'a>(tokens: &[&'a str], index: usize, usage: &str) -> Result<&'a str> {
    tokens
        .get(index)
        .copied()
        .ok_or_else(|| Error::invalid_command(format!("usage: {usage}")))
}

impl Command {
    pub fn parse(line: &str) -> Parsed {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&word) = tokens.first() else {
            return Parsed::Blank;
        };
        let decoded = match word {
            "mkdir" => arg(&tokens, 1, "mkdir <path>").map(|p| Command::Mkdir(p.into())),
            "chdir" => arg(&tokens, 1, "chdir <path>").map(|p| Command::Chdir(p.into())),
            "mv" => Self::exact(&tokens, 3, "mv <src> <dst>").map(|t| Command::Mv(t[1].into(), t[2].into())),
            "pwd" => Ok(Command::Pwd),
            "print" => Ok(Command::Print),
            "show_memory_map" => Ok(Command::ShowMemoryMap),
            "save" => arg(&tokens, 1, "save <host path>").map(|p| Command::Save(p.into())),
            "create" => arg(&tokens, 1, "create <path>").map(|p| Command::Create(p.into())),
            "delete" => arg(&tokens, 1, "delete <path>").map(|p| Command::Delete(p.into())),
            "open" => Self::exact(&tokens, 3, "open <path> r|w")
                .and_then(|t| Ok(Command::Open(t[1].into(), t[2].parse()?))),
            "close" => arg(&tokens, 1, "close <path>").map(|p| Command::Close(p.into())),
            "read" => arg(&tokens, 1, "read <path>").map(|p| Command::Read(p.into())),
            "read_from" => Self::exact(&tokens, 4, "read_from <path> <start> <size>").and_then(|t| {
                Ok(Command::ReadFrom {
                    path: t[1].into(),
                    start: number(t[2], "start")?,
                    size: number(t[3], "size")?,
                })
            }),
            "append" => arg(&tokens, 1, "append <path> <text...>").map(|p| Command::Append {
                path: p.into(),
                text: tokens[2..].join(" "),
            }),
            "write_at" => {
                if tokens.len() < 3 {
                    Err(Error::invalid_command("usage: write_at <path> <text...> <pos>"))
                } else {
                    number(tokens[tokens.len() - 1], "pos").map(|pos| Command::WriteAt {
                        path: tokens[1].into(),
                        text: tokens[2..tokens.len() - 1].join(" "),
                        pos,
                    })
                }
            }
            "move" => Self::exact(&tokens, 5, "move <path> <start> <size> <target>").and_then(|t| {
                Ok(Command::Move {
                    path: t[1].into(),
                    start: number(t[2], "start")?,
                    size: number(t[3], "size")?,
                    target: number(t[4], "target")?,
                })
            }),
            "tr" => Self::exact(&tokens, 3, "tr <path> <size>").and_then(|t| {
                Ok(Command::Truncate {
                    path: t[1].into(),
                    size: number(t[2], "size")?,
                })
            }),
            other => return Parsed::Unknown(other.to_string()),
        };
        match decoded {
            Ok(command) => Parsed::Command(command),
            Err(err) => Parsed::Malformed(err),
        }
    }

    fn exact<'t, 'a>(tokens: &'t [&'a str], count: usize, usage: &str) -> Result<&'t [&'a str]> {
        if tokens.len() == count {
            Ok(tokens)
        } else {
            Err(Error::invalid_command(format!("usage: {usage}")))
        }
    }
}

/// What a worker did with its stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands executed, failed ones included
    pub executed: usize,
    /// Commands that produced an error message
    pub failed: usize,
    /// The unknown command word that ended the stream early
    pub halted_on: Option<String>,
}

/// Executes commands for one opener against a shared file system.
pub struct Interpreter<W> {
    wd: WD,
    opener: OpenerId,
    sessions: BTreeMap<PathBuf, Session>,
    out: W,
}

impl<W: AsyncWrite + Unpin + Send> Interpreter<W> {
    pub fn new(fs: &FileSystem, opener: OpenerId, out: W) -> Self {
        Self {
            wd: fs.root(),
            opener,
            sessions: BTreeMap::new(),
            out,
        }
    }

    pub fn opener(&self) -> OpenerId {
        self.opener
    }

    pub fn wd(&self) -> &WD {
        &self.wd
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs a whole command stream, then closes anything left open.
    ///
    /// Only a failing output sink aborts the run; command failures are
    /// reported in the output.
    pub async fn run<I, S>(&mut self, lines: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = RunSummary::default();
        let id = self.opener.0;
        for line in lines {
            let line = line.as_ref();
            log_debug!("Opener {id} executing {line}", id: id, line: line);
            let message = match Command::parse(line) {
                Parsed::Blank => continue,
                Parsed::Unknown(word) => {
                    let word = summary.halted_on.insert(word).as_str();
                    log_info!("Opener {id} stopped at unknown command {word}", id: id, word: word);
                    break;
                }
                Parsed::Malformed(err) => Err(err),
                Parsed::Command(command) => self.execute(command).await,
            };
            summary.executed += 1;
            match message {
                Ok(text) => self.emit(&text).await?,
                Err(err) => {
                    summary.failed += 1;
                    if let Error::Inconsistent(detail) = &err {
                        let detail = detail.as_str();
                        log_error!("Opener {id} hit an inconsistency: {detail}", id: id, detail: detail);
                    }
                    self.emit(&err.to_string()).await?;
                }
            }
        }
        self.finish().await?;
        self.out.flush().await?;
        Ok(summary)
    }

    /// Closes every session still open, committing pending edits.
    pub async fn finish(&mut self) -> Result<()> {
        let sessions = std::mem::take(&mut self.sessions);
        for (path, session) in sessions {
            let message = match self.wd.close(session).await {
                Ok(_) => Self::closed_message(&path),
                Err(err) => err.to_string(),
            };
            self.emit(&message).await?;
        }
        Ok(())
    }

    async fn emit(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        if !text.ends_with('\n') {
            self.out.write_all(b"\n").await?;
        }
        Ok(())
    }

    fn closed_message(path: &Path) -> String {
        format!("{} has been closed and any changes made were saved.", path.display())
    }

    fn session(&mut self, path: &str) -> Result<&mut Session> {
        let key = self.wd.resolve(path)?.absolute;
        self.sessions.get_mut(&key).ok_or_else(|| Error::not_open(&key))
    }

    /// Executes one command and returns the text to report.
    pub async fn execute(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Mkdir(path) => {
                self.wd.mkdir(&path).await?;
                Ok(self.wd.fs().print().await)
            }
            Command::Chdir(path) => Ok(self.wd.chdir(&path).await?.display().to_string()),
            Command::Mv(src, dst) => {
                self.wd.rename(&src, &dst).await?;
                Ok(self.wd.fs().print().await)
            }
            Command::Pwd => Ok(self.wd.pwd().display().to_string()),
            Command::Print => Ok(self.wd.fs().print().await),
            Command::ShowMemoryMap => {
                let lines: Vec<String> = self.wd.fs().memory_map().await.iter().map(ToString::to_string).collect();
                Ok(lines.join("\n"))
            }
            Command::Save(dst) => {
                self.wd.fs().save(&dst).await?;
                Ok(format!("Filesystem saved at {dst}"))
            }
            Command::Create(path) => {
                self.wd.create(&path).await?;
                Ok(self.wd.fs().print().await)
            }
            Command::Delete(path) => {
                self.wd.delete(&path).await?;
                Ok(self.wd.fs().print().await)
            }
            Command::Open(path, mode) => {
                let session = self.wd.open(&path, self.opener, mode).await?;
                let key = session.path().to_path_buf();
                self.sessions.insert(key.clone(), session);
                Ok(format!("{} opened for {mode}", key.display()))
            }
            Command::Close(path) => {
                let key = self.wd.resolve(&path)?.absolute;
                let session = self.sessions.remove(&key).ok_or_else(|| Error::not_open(&key))?;
                _ = self.wd.close(session).await?;
                Ok(Self::closed_message(&key))
            }
            Command::Read(path) => {
                let session = self.session(&path)?;
                let text = session.read().await?;
                Ok(format!("Contents of {}: {text}", session.path().display()))
            }
            Command::ReadFrom { path, start, size } => {
                let session = self.session(&path)?;
                let text = session.read_from(start, size).await?;
                Ok(format!("Contents of {}: {text}", session.path().display()))
            }
            Command::Append { path, text } => {
                let session = self.session(&path)?;
                session.append(&text).await?;
                Ok(format!(
                    "Append text {text} to {} committed as transaction.",
                    session.path().display()
                ))
            }
            Command::WriteAt { path, text, pos } => {
                let session = self.session(&path)?;
                session.write_at(pos, &text).await?;
                Ok(format!(
                    "Write text {text} at {pos} in {} committed as transaction.",
                    session.path().display()
                ))
            }
            Command::Move { path, start, size, target } => {
                let session = self.session(&path)?;
                session.move_range(start, size, target).await?;
                Ok(format!(
                    "Move text in {} from {start} till {} to {target} committed as transaction.",
                    session.path().display(),
                    start.saturating_add(size)
                ))
            }
            Command::Truncate { path, size } => {
                let session = self.session(&path)?;
                session.truncate(size).await?;
                Ok(format!(
                    "Truncate contents of {} to {size} committed as transaction.",
                    session.path().display()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Command {
        match Command::parse(line) {
            Parsed::Command(c) => c,
            other => panic!("expected command for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_text_commands() {
        assert_eq!(
            parsed("append /f hello  big world"),
            Command::Append {
                path: "/f".into(),
                text: "hello big world".into()
            }
        );
        assert_eq!(
            parsed("write_at f some text 12"),
            Command::WriteAt {
                path: "f".into(),
                text: "some text".into(),
                pos: 12
            }
        );
        assert_eq!(
            parsed("move f 5 3 20"),
            Command::Move {
                path: "f".into(),
                start: 5,
                size: 3,
                target: 20
            }
        );
        assert_eq!(parsed("open a/b w"), Command::Open("a/b".into(), AccessMode::Write));
        assert_eq!(parsed("tr f 4"), Command::Truncate { path: "f".into(), size: 4 });
        assert_eq!(parsed("show_memory_map"), Command::ShowMemoryMap);
    }

    #[test]
    fn test_parse_blank_unknown_malformed() {
        assert!(matches!(Command::parse("   "), Parsed::Blank));
        assert!(matches!(Command::parse("frobnicate x"), Parsed::Unknown(w) if w == "frobnicate"));
        assert!(matches!(Command::parse("open f rw"), Parsed::Malformed(Error::InvalidCommand(_))));
        assert!(matches!(Command::parse("read_from f -1 3"), Parsed::Malformed(_)));
        assert!(matches!(Command::parse("mv onlyone"), Parsed::Malformed(_)));
        assert!(matches!(Command::parse("mkdir"), Parsed::Malformed(_)));
        assert!(matches!(Command::parse("write_at f"), Parsed::Malformed(_)));
    }
}
