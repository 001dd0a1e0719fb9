use anyhow::Context;
use url::Url;

use crate::{
    cli::GlobalOptions,
    config::{Config, Credentials, Settings},
    sailthru::{DEFAULT_API_URL, HttpConnector},
};

impl GlobalOptions {
    /// Load the config and credentials files.
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let config_path = self.config.resolve()?;
        Ok(Settings {
            config: Config::from_path(&config_path)?,
            credentials: self.load_credentials()?,
        })
    }

    /// Load only the credentials file.
    pub fn load_credentials(&self) -> anyhow::Result<Credentials> {
        let path = self.credentials.resolve()?;
        Credentials::from_path(&path)
    }

    /// Create a connector for the configured API endpoint.
    pub fn connector(&self) -> anyhow::Result<HttpConnector> {
        let url = match self.api_url.resolve_optional()? {
            Some(url) => url.into_owned(),
            None => Url::parse(DEFAULT_API_URL)?,
        };
        HttpConnector::new(url).context("Failed to create HTTP client")
    }
}
