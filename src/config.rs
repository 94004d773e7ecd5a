use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Personal income and expense tracker.
#[derive(Debug, Parser)]
#[command(name = "gastos", version, about)]
pub struct Config {
    /// SQLite database file
    #[arg(long, env = "GASTOS_DB", default_value = "misgastos.db")]
    pub database: PathBuf,

    /// JSON file remembering the last category used per kind
    #[arg(long, env = "GASTOS_PREFS", default_value = "misgastos_prefs.json")]
    pub preferences: PathBuf,

    /// Log filter, e.g. "info" or "misgastos=debug". RUST_LOG takes precedence.
    #[arg(long, env = "GASTOS_LOG", default_value = "warn")]
    pub log_level: String,

    /// Number of months shown by the `balance` command
    #[arg(long, default_value_t = 5)]
    pub recent_months: usize,
}

impl Config {
    /// Logs go to stderr so they never mix with command output.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["gastos"]).unwrap();
        assert_eq!(config.database, PathBuf::from("misgastos.db"));
        assert_eq!(config.preferences, PathBuf::from("misgastos_prefs.json"));
        assert_eq!(config.recent_months, 5);
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "gastos",
            "--database",
            "/tmp/x.db",
            "--recent-months",
            "12",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.recent_months, 12);
        assert_eq!(config.log_level, "debug");
    }
}
