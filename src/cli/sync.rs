use std::path::PathBuf;

use clap::{Args, ValueEnum};

/// Options for listing, uploading and generating templates and includes.
#[derive(Clone, Debug, Args)]
pub struct SyncOptions {
    /// What to work with.
    #[arg(long = "type", short = 't', value_enum, default_value_t)]
    pub item_type: SyncType,

    /// The account to use from the credentials file.
    ///
    /// When uploading an include, `all` uploads it to every account in the
    /// credentials file, one after another.
    #[arg(long, short = 'a', required = true)]
    pub account: Option<String>,

    /// The file to upload, relative to the configured templates or includes
    /// directory.
    ///
    /// If missing, the existing templates or includes are listed instead.
    #[arg(long, short = 'f')]
    pub filename: Option<PathBuf>,

    /// The name of the template or include to create or update.
    ///
    /// If missing, templates are named after the comment on the first line of
    /// the file (for example `{* Daily News *}`).
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

/// What the sync options act on.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, ValueEnum)]
pub enum SyncType {
    /// List or upload templates.
    #[default]
    #[value(name = "template")]
    Template,

    /// List or upload includes.
    #[value(name = "include")]
    Include,

    /// Generate a new local template for the account from the placeholder
    /// file.
    #[value(name = "generate")]
    Generate,
}
