//! Command-line interface of the `scene-migrate` binary
//!
//! Every flag is optional; with none the run uses the built-in defaults and
//! takes the credential from `SCENE_MIGRATE_TOKEN`.

use crate::config::{parse_position, ConfigLayer, MigratorConfig};
use crate::error::ConfigError;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scene_api::{Credential, Position};
use std::path::PathBuf;

/// Environment variable holding the bearer token
pub const TOKEN_ENV: &str = "SCENE_MIGRATE_TOKEN";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "SCENE_MIGRATE_BASE_URL";

/// Build the argument parser
#[must_use]
pub fn command() -> Command {
    Command::new("scene-migrate")
        .version(crate::VERSION)
        .about("Replace unset scene object positions with a fallback coordinate")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with migrator settings"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .value_name("URL")
                .env(BASE_URL_ENV)
                .help("Scene service base URL [default: http://localhost:5000/api]"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .env(TOKEN_ENV)
                .hide_env_values(true)
                .help("Bearer token for the scene service"),
        )
        .arg(
            Arg::new("fallback")
                .long("fallback")
                .value_name("X,Y,Z")
                .allow_hyphen_values(true)
                .value_parser(parse_position)
                .help("Position written to unset objects [default: 116.397128,39.908802,100]"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .value_parser(value_parser!(u64))
                .help("Per-request timeout in seconds"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("List objects that would be updated without changing them"),
        )
        .arg(
            Arg::new("keep-origin")
                .long("keep-origin")
                .action(ArgAction::SetTrue)
                .help("Only update objects without a position; keep explicit [0, 0, 0]"),
        )
}

/// Layer holding the settings given as flags or environment variables
#[must_use]
pub fn overrides(matches: &ArgMatches) -> ConfigLayer {
    ConfigLayer {
        base_url: matches.get_one::<String>("base-url").cloned(),
        credential: matches
            .get_one::<String>("token")
            .map(|token| Credential::new(token.as_str())),
        fallback_position: matches.get_one::<Position>("fallback").copied(),
        request_timeout_secs: matches.get_one::<u64>("timeout").copied(),
        dry_run: matches.get_flag("dry-run").then_some(true),
        treat_origin_as_unset: matches.get_flag("keep-origin").then_some(false),
    }
}

/// Resolve defaults, config file, environment and flags into one config
///
/// # Errors
/// Any `ConfigError` from loading the file or validating the result
pub fn resolve_config(matches: &ArgMatches) -> Result<MigratorConfig, ConfigError> {
    let file = match matches.get_one::<PathBuf>("config") {
        Some(path) => ConfigLayer::load(path)?,
        None => ConfigLayer::default(),
    };
    file.merge(overrides(matches)).resolve()
}
