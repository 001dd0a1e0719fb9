use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{sailthru::ApiError, sync::ItemType};

/// Errors produced by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("account not found in credentials: {account}")]
    AccountNotFound { account: String },

    #[error("invalid credentials for account {account}: {reason}")]
    MalformedAccount { account: String, reason: String },

    #[error("failed to read {}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the {item_type} name is missing")]
    MissingName { item_type: ItemType },

    #[error("file already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    #[error("failed to upload {item_type} {name:?} for {account}")]
    RemoteUpload {
        item_type: ItemType,
        account: String,
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to list {item_type}s for {account}")]
    RemoteList {
        item_type: ItemType,
        account: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to set beacon image for {account}")]
    RemoteSettings {
        account: String,
        #[source]
        source: ApiError,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;
