use std::error::Error;

use tracing_subscriber::EnvFilter;

/// Full `EnvFilter` directive; wins over `--log-level` when set.
pub const LOG_ENV: &str = "OFFPLAN_LOG";

/// Install the stderr subscriber. stdout carries only command output.
pub fn init(log_level: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env.as_deref(), log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .compact()
        .try_init()
}

/// `OFFPLAN_LOG` if set and non-empty, otherwise the `--log-level` flag.
fn build_filter(env: Option<&str>, log_level: &str) -> Result<EnvFilter, String> {
    match env.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| format!("{LOG_ENV}={directive} is not a valid log filter: {e}")),
        None => EnvFilter::try_new(log_level)
            .map_err(|e| format!("--log-level {log_level} is not a valid log filter: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_flag_used_without_env() {
        let filter = build_filter(None, "debug").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_env_wins_over_flag() {
        let filter = build_filter(Some("offplan_core=trace"), "warn").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_blank_env_falls_back_to_flag() {
        let filter = build_filter(Some("  "), "info").unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_bad_filter_names_its_source() {
        let err = build_filter(Some("offplan_core=loud"), "warn").unwrap_err();
        assert!(err.starts_with(LOG_ENV));
        let err = build_filter(None, "offplan_core=loud").unwrap_err();
        assert!(err.starts_with("--log-level"));
    }
}
