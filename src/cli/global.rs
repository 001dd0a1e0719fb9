use std::path::PathBuf;

use clap::{ArgAction, Args};
use url::Url;

use crate::cli::MaybeEnv;

/// Global options that are always relevant.
#[derive(Clone, Debug, Args)]
#[command(version, next_help_heading = "Global")]
pub struct GlobalOptions {
    /// The config file with the local templates and includes directories.
    ///
    /// To use an environment variable instead, use the `env:` scheme. For
    /// example, `env:STSYNC_CONFIG` will use the value of the environment
    /// variable `STSYNC_CONFIG` as the path.
    #[arg(global = true, long, short = 'c', default_value = "config/config.json")]
    pub config: MaybeEnv<PathBuf>,

    /// The credentials file with the API key and secret of every account.
    ///
    /// Supports the `env:` scheme, like --config.
    #[arg(global = true, long, default_value = "config/credentials.json")]
    pub credentials: MaybeEnv<PathBuf>,

    /// The placeholder file used by `--type generate`.
    ///
    /// Every `{{key}}` in this file is replaced with the matching value from
    /// the account's `data` in the credentials file.
    #[arg(global = true, long, default_value = "config/template_placeholder.html")]
    pub placeholder: MaybeEnv<PathBuf>,

    /// The Sailthru API endpoint.
    ///
    /// By default this is read from `STSYNC_API_URL`, falling back to
    /// https://api.sailthru.com if that variable isn't set.
    #[arg(global = true, long, default_value = "env:STSYNC_API_URL")]
    pub api_url: MaybeEnv<Url>,

    /// Enable more verbose output (repeatable up to 3 times).
    ///
    /// Output is emitted via stderr.
    #[arg(global = true, long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}
