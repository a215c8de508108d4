//! Console progress logging.
//!
//! Progress lines are printed with a colored, level-tagged prefix and are
//! mirrored to the `log` facade so they also reach whatever logger the host
//! binary installs. Set `TRADE_SCANNER_SILENT` to suppress console output
//! (useful in tests).

use colored::Colorize;

/// Environment variable that silences console output when set.
pub const SILENT_ENV: &str = "TRADE_SCANNER_SILENT";

/// Severity of a console log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    fn tag(self) -> colored::ColoredString {
        match self {
            LogLevel::Info => "[INFO]".cyan().bold(),
            LogLevel::Success => "[ OK ]".green().bold(),
            LogLevel::Warning => "[WARN]".yellow().bold(),
            LogLevel::Error => "[FAIL]".red().bold(),
            LogLevel::Debug => "[DBUG]".dimmed(),
        }
    }

    fn facade_level(self) -> log::Level {
        match self {
            LogLevel::Info | LogLevel::Success => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

fn is_silent() -> bool {
    std::env::var_os(SILENT_ENV).is_some()
}

/// Logs a single progress line.
pub fn log(level: LogLevel, message: &str) {
    log::log!(target: "solana_trade_scanner", level.facade_level(), "{message}");

    if is_silent() || level == LogLevel::Debug {
        return;
    }

    match level {
        LogLevel::Warning | LogLevel::Error => eprintln!("{} {}", level.tag(), message),
        _ => println!("{} {}", level.tag(), message),
    }
}

/// Prints a section banner.
pub fn log_section(title: &str) {
    log::info!(target: "solana_trade_scanner", "== {title} ==");

    if is_silent() {
        return;
    }

    let rule = "=".repeat(title.len() + 8);
    println!("\n{}", rule.blue());
    println!("{}", format!("    {title}").blue().bold());
    println!("{}", rule.blue());
}
