//! Tagged console logging with per-module debug gating.
//!
//! Debug output is off by default and enabled per tag from the command
//! line: `--debug-market`, `--debug-convert`, `--debug-all`, etc.
//! Errors are always shown. Call [`init`] once at startup before logging.

use chrono::Utc;
use colored::*;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Market,
    Convert,
    Search,
    Store,
    Api,
    System,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Market => "MARKET",
            LogTag::Convert => "CONVERT",
            LogTag::Search => "SEARCH",
            LogTag::Store => "STORE",
            LogTag::Api => "API",
            LogTag::System => "SYSTEM",
        }
    }

    fn debug_key(&self) -> &'static str {
        match self {
            LogTag::Market => "market",
            LogTag::Convert => "convert",
            LogTag::Search => "search",
            LogTag::Store => "store",
            LogTag::Api => "api",
            LogTag::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

struct LoggerConfig {
    debug_all: bool,
    debug_tags: HashSet<String>,
}

static CONFIG: OnceCell<LoggerConfig> = OnceCell::new();

/// Initialize the logger from command-line arguments.
///
/// Scans for `--debug-all` and `--debug-<tag>` flags. Safe to call more
/// than once; only the first call takes effect.
pub fn init() {
    init_with_args(env::args().collect());
}

pub fn init_with_args(args: Vec<String>) {
    let debug_all = args.iter().any(|a| a == "--debug-all");
    let debug_tags = args
        .iter()
        .filter_map(|a| a.strip_prefix("--debug-"))
        .map(|t| t.to_string())
        .collect();

    let _ = CONFIG.set(LoggerConfig { debug_all, debug_tags });
}

fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level != LogLevel::Debug {
        return true;
    }
    match CONFIG.get() {
        Some(config) => config.debug_all || config.debug_tags.contains(tag.debug_key()),
        None => false,
    }
}

pub fn error(tag: LogTag, message: &str) {
    write(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    write(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    write(tag, LogLevel::Info, message);
}

/// Only shown when the matching `--debug-<tag>` flag is set.
pub fn debug(tag: LogTag, message: &str) {
    write(tag, LogLevel::Debug, message);
}

fn write(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    let timestamp = Utc::now().format("%H:%M:%S").to_string();
    let level_str = match level {
        LogLevel::Error => level.as_str().red().bold(),
        LogLevel::Warning => level.as_str().yellow().bold(),
        LogLevel::Info => level.as_str().green(),
        LogLevel::Debug => level.as_str().purple(),
    };

    println!(
        "{} {} {} {}",
        format!("[{}]", timestamp).dimmed(),
        level_str,
        tag.as_str().cyan().bold(),
        highlight_numbers(message)
    );
}

static NUMBER_RE: OnceCell<Regex> = OnceCell::new();

// Bold dollar values and percentages so they stand out in the stream.
fn highlight_numbers(message: &str) -> String {
    let re = NUMBER_RE.get_or_init(|| Regex::new(r"(\$[\d,]+\.?\d*|[\d,]+\.?\d*%)").unwrap());
    re.replace_all(message, |caps: &regex::Captures| {
        caps[1].bright_white().bold().to_string()
    })
    .to_string()
}
