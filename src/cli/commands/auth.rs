use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RATE_LIMIT_MAX_REQUESTS: &str = "rate-limit-max-requests";
pub const ARG_RATE_LIMIT_WINDOW_SECONDS: &str = "rate-limit-window-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Idle session lifetime in seconds")
                .env("PUSTAKA_SESSION_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_MAX_REQUESTS)
                .long(ARG_RATE_LIMIT_MAX_REQUESTS)
                .help("Requests allowed per rate-limit window and key")
                .env("PUSTAKA_RATE_LIMIT_MAX_REQUESTS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .long(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .help("Rate-limit window length in seconds")
                .env("PUSTAKA_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub session_ttl_seconds: u64,
    pub rate_limit_max_requests: u64,
    pub rate_limit_window_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .context("missing session-ttl-seconds")?,
            rate_limit_max_requests: matches
                .get_one::<u64>(ARG_RATE_LIMIT_MAX_REQUESTS)
                .copied()
                .context("missing rate-limit-max-requests")?,
            rate_limit_window_seconds: matches
                .get_one::<u64>(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .copied()
                .context("missing rate-limit-window-seconds")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_pick_up_defaults() {
        temp_env::with_vars(
            [
                ("PUSTAKA_SESSION_TTL_SECONDS", None::<&str>),
                ("PUSTAKA_RATE_LIMIT_MAX_REQUESTS", None::<&str>),
                ("PUSTAKA_RATE_LIMIT_WINDOW_SECONDS", None::<&str>),
            ],
            || {
                let matches = with_args(Command::new("pustaka"))
                    .try_get_matches_from(["pustaka"])
                    .expect("parse matches");
                let options = Options::parse(&matches).expect("parse options");
                assert_eq!(options.session_ttl_seconds, 1800);
                assert_eq!(options.rate_limit_max_requests, 60);
                assert_eq!(options.rate_limit_window_seconds, 60);
            },
        );
    }

    #[test]
    fn options_honor_overrides() {
        let matches = with_args(Command::new("pustaka"))
            .try_get_matches_from([
                "pustaka",
                "--session-ttl-seconds",
                "60",
                "--rate-limit-max-requests",
                "5",
                "--rate-limit-window-seconds",
                "10",
            ])
            .expect("parse matches");
        let options = Options::parse(&matches).expect("parse options");
        assert_eq!(options.session_ttl_seconds, 60);
        assert_eq!(options.rate_limit_max_requests, 5);
        assert_eq!(options.rate_limit_window_seconds, 10);
    }
}
