use std::path::PathBuf;

use clap::Args;

/// Options for replacing an account's beacon image.
#[derive(Clone, Debug, Args)]
pub struct BeaconOptions {
    /// The account to use from the credentials file.
    #[arg(long, short = 'a')]
    pub account: String,

    /// The image to upload.
    pub image: PathBuf,
}
