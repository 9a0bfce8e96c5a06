pub mod auth;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Cross-argument validation clap cannot express on its own.
///
/// # Errors
/// Returns an error string if the postgres store is selected without a DSN.
pub fn validate(matches: &clap::ArgMatches) -> Result<(), String> {
    let store = matches
        .get_one::<String>("store")
        .map_or("postgres", String::as_str);
    if store == "postgres" && !matches.contains_id("dsn") {
        return Err(
            "Missing required argument: --dsn (required for the postgres store)".to_string(),
        );
    }
    Ok(())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("pustaka")
        .about("School library service")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("PUSTAKA_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "Database connection string. Required for the postgres store backend; ignored by the memory backend.",
                )
                .env("PUSTAKA_DSN"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .help("Persistence backend, selected explicitly (no fallback)")
                .env("PUSTAKA_STORE")
                .default_value("postgres")
                .value_parser(["postgres", "memory"]),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("Public base URL of the service")
                .env("PUSTAKA_BASE_URL")
                .default_value("http://localhost:8080"),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();
        command.debug_assert();
    }

    #[test]
    fn validate_requires_dsn_for_postgres() {
        temp_env::with_vars(
            [
                ("PUSTAKA_DSN", None::<&str>),
                ("PUSTAKA_STORE", None::<&str>),
            ],
            || {
                let matches = new()
                    .try_get_matches_from(["pustaka"])
                    .expect("parse matches");
                assert!(validate(&matches).is_err());

                let matches = new()
                    .try_get_matches_from(["pustaka", "--store", "memory"])
                    .expect("parse matches");
                assert!(validate(&matches).is_ok());

                let matches = new()
                    .try_get_matches_from([
                        "pustaka",
                        "--dsn",
                        "postgres://localhost:5432/pustaka",
                    ])
                    .expect("parse matches");
                assert!(validate(&matches).is_ok());
            },
        );
    }
}
