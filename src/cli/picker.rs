//! Choosing a price spreadsheet when `-d`/`FUEL_DATA` was not given.
//!
//! Spreadsheets are looked up below the working directory, a few levels
//! deep, and offered as a numbered menu. Typing a path works as well.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::io::has_data_extension;

/// How many directory levels below the working directory are searched.
const MAX_DEPTH: usize = 4;

/// Directories that never hold input data.
const IGNORED_DIRS: [&str; 3] = [".git", "target", "node_modules"];

/// What the user typed at the menu prompt.
#[derive(Debug, PartialEq, Eq)]
enum Reply<'a> {
    Pick(usize),
    OutOfRange(usize),
    Path(&'a str),
    Quit,
}

fn parse_reply(line: &str, choices: usize) -> Reply<'_> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Reply::Quit;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=choices).contains(&n) => Reply::Pick(n - 1),
        Ok(n) => Reply::OutOfRange(n),
        Err(_) => Reply::Path(line),
    }
}

/// Show the spreadsheets found under the working directory and read a choice.
pub fn prompt_for_data_path() -> Result<PathBuf, AppError> {
    let candidates = spreadsheets_under(Path::new("."), MAX_DEPTH);
    if candidates.is_empty() {
        return Err(AppError::usage(
            "No price spreadsheets under the current directory; pass one with -d or FUEL_DATA.",
        ));
    }

    let mut stdout = io::stdout();
    let write_err = |e: io::Error| AppError::io(format!("Cannot write to the terminal: {e}"));
    writeln!(stdout, "Price spreadsheets:").map_err(write_err)?;
    for (n, path) in candidates.iter().enumerate() {
        writeln!(stdout, "  [{}] {}", n + 1, display_relative(path)).map_err(write_err)?;
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "Number, path, or q to cancel: ").map_err(write_err)?;
        stdout.flush().map_err(write_err)?;

        let Some(line) = lines.next() else {
            return Err(AppError::usage("Input closed before a spreadsheet was chosen."));
        };
        let line = line.map_err(|e| AppError::io(format!("Cannot read the terminal: {e}")))?;

        let picked = match parse_reply(&line, candidates.len()) {
            Reply::Quit => return Err(AppError::usage("No spreadsheet chosen.")),
            Reply::Pick(idx) => check_data_path(&candidates[idx]),
            Reply::Path(typed) => check_data_path(Path::new(typed)),
            Reply::OutOfRange(n) => {
                writeln!(stdout, "There is no entry {n}; the list ends at {}.", candidates.len())
                    .map_err(write_err)?;
                continue;
            }
        };
        match picked {
            Ok(path) => return Ok(path),
            Err(err) => writeln!(stdout, "{err}").map_err(write_err)?,
        }
    }
}

/// Accept `path` only if it is an existing file with a spreadsheet extension.
pub fn check_data_path(path: &Path) -> Result<PathBuf, AppError> {
    let meta = fs::metadata(path).map_err(|_| {
        AppError::data_unavailable(format!("No such data file: {}", path.display()))
    })?;
    if meta.is_dir() {
        return Err(AppError::usage(format!("{} is a directory.", path.display())));
    }
    if !has_data_extension(path) {
        return Err(AppError::usage(format!(
            "{} is not a .csv, .xlsx, .xls or .ods file.",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// Spreadsheets at most `max_depth` levels below `root`, sorted by display path.
fn spreadsheets_under(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![(root.to_path_buf(), 0usize)];

    while let Some((dir, depth)) = pending.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => {
                    if depth < max_depth && !IGNORED_DIRS.contains(&&*name) {
                        pending.push((path, depth + 1));
                    }
                }
                // `~$book.xlsx` is the lock file Office keeps next to an open workbook.
                Ok(kind) if kind.is_file() => {
                    if has_data_extension(&path) && !name.starts_with("~$") {
                        found.push(path);
                    }
                }
                _ => {}
            }
        }
    }

    found.sort_by_cached_key(|p| display_relative(p));
    found
}

fn display_relative(path: &Path) -> String {
    path.strip_prefix(".").unwrap_or(path).display().to_string()
}
