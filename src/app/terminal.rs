//! Terminal detection and tracing setup.

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_use_progress(
    stdout_is_terminal: bool,
    quiet: bool,
    no_progress: bool,
    dumb_terminal: bool,
) -> bool {
    stdout_is_terminal && !quiet && !no_progress && !dumb_terminal
}

/// Default filter directive when `RUST_LOG` is unset.
///
/// Info-level lines would tear the progress bars, so the default drops to
/// `warn` while they are shown. Explicit `-v` always wins.
pub(crate) fn default_log_level(verbose: u8, quiet: bool, progress_active: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 if progress_active => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

pub(crate) fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_use_progress_requires_terminal() {
        assert!(should_use_progress(true, false, false, false));
        assert!(!should_use_progress(false, false, false, false));
    }

    #[test]
    fn test_should_use_progress_respects_opt_outs() {
        assert!(!should_use_progress(true, true, false, false));
        assert!(!should_use_progress(true, false, true, false));
        assert!(!should_use_progress(true, false, false, true));
    }

    #[test]
    fn test_default_log_level_quiet_wins() {
        assert_eq!(default_log_level(2, true, false), "error");
    }

    #[test]
    fn test_default_log_level_by_verbosity() {
        assert_eq!(default_log_level(0, false, false), "info");
        assert_eq!(default_log_level(1, false, false), "debug");
        assert_eq!(default_log_level(3, false, false), "trace");
    }

    #[test]
    fn test_default_log_level_drops_to_warn_under_progress() {
        assert_eq!(default_log_level(0, false, true), "warn");
        assert_eq!(default_log_level(1, false, true), "debug");
    }
}
