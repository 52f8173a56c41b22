//! Error types for override loading.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    path::{Path, PathBuf},
    result::Result as StdResult,
};

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while reading, parsing, or interpreting an override file.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// The document as a whole could not be parsed.
    Parse {
        /// Optional path associated with the parse error.
        path: Option<PathBuf>,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
        /// Rendered excerpt including a caret at the error location.
        excerpt: String,
    },
    #[error("override for {command:?} is malformed: {message}")]
    /// One command's entry is not a list of binding specs; that entry is skipped.
    Malformed {
        /// Command the entry belongs to.
        command: String,
        /// Human-readable error message.
        message: String,
    },
    #[error("could not write overrides: {message}")]
    /// The map could not be rendered for writing.
    Serialize {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Parse {
                path,
                line,
                col,
                message,
                excerpt,
            } => match path {
                Some(p) => format!(
                    "Override parse error at {}:{}:{}\n{}\n{}",
                    p.display(),
                    line,
                    col,
                    message,
                    excerpt
                ),
                None => format!(
                    "Override parse error at line {}, column {}\n{}\n{}",
                    line, col, message, excerpt
                ),
            },
            Self::Malformed { command, message } => {
                format!("Skipping override for {command}: {message}")
            }
            Self::Serialize { message } => format!("Serialize error: {message}"),
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path.as_deref(),
            Self::Malformed { .. } | Self::Serialize { .. } => None,
        }
    }
}

/// Build a small 2-3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(1));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let gutter = format!(" {:>4} | ", n).len();
            let _ignored = writeln!(out, "{}^", " ".repeat(gutter + col_no.saturating_sub(1)));
        }
    }
    out
}

/// Split a leading `line:col` location off a RON error message.
///
/// Messages without a location map to line 1, column 1.
pub(crate) fn split_location(msg: &str) -> (usize, usize, String) {
    let Some((loc, rest)) = msg.split_once(": ") else {
        return (1, 1, msg.to_string());
    };
    let mut nums = loc
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().unwrap_or(1));
    match (nums.next(), nums.next()) {
        (Some(line), Some(col)) => (line.max(1), col.max(1), rest.to_string()),
        _ => (1, 1, msg.to_string()),
    }
}
