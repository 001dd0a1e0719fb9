use clap::{Parser, Subcommand};
use clap_cargo::style::CLAP_STYLING;

use crate::cli::{BeaconOptions, CompletionsOptions, GlobalOptions, SyncOptions};

/// Synchronize local HTML files with Sailthru templates and includes.
///
/// Without --filename, the existing templates or includes in the account are
/// listed. With --filename, that file is uploaded as a template or include,
/// creating or updating it remotely.
///
/// Account keys and secrets are read from the credentials file.
#[derive(Clone, Debug, Parser)]
#[command(
    styles = CLAP_STYLING,
    disable_help_subcommand = true,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true,
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// An optional subcommand to execute instead.
    #[command(subcommand)]
    pub subcommand: Option<CliCommand>,

    /// Options for listing, uploading and generating.
    #[command(flatten)]
    pub sync: SyncOptions,

    /// Global options relevant to all subcommands.
    #[command(flatten)]
    pub global: GlobalOptions,
}

/// A subcommand to execute.
#[derive(Clone, Debug, Subcommand)]
pub enum CliCommand {
    /// Generate shell completions.
    ///
    /// Completions are written to stdout. Save them to the appropriate place
    /// for your shell.
    Completions(CompletionsOptions),

    /// Replace the beacon image of an account.
    Beacon(BeaconOptions),
}

const AFTER_HELP: &str = concat!(
    "Examples:\n",
    "  stsync -a <account> -f daily.html -n 'Daily News'\n",
    "  stsync -t include -a all -f footer.html -n Footer\n",
    "  stsync -t generate -a <account>\n",
    "\n",
    env!("CARGO_PKG_REPOSITORY"),
    "\n",
    "License: ",
    env!("CARGO_PKG_LICENSE"),
);
