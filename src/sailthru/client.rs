use md5::{Digest, Md5};
use reqwest::{
    Client, Response,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use crate::sailthru::{ApiError, ApiResult, Attachment, Connector, SailthruApi};

/// The production Sailthru API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.sailthru.com";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Creates [`SailthruClient`]s that share one HTTP connection pool.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    http: Client,
    base_url: Url,
}

impl HttpConnector {
    pub fn new(base_url: Url) -> ApiResult<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, base_url })
    }
}

impl Connector for HttpConnector {
    type Client = SailthruClient;

    fn connect(&self, key: &str, secret: &str) -> Self::Client {
        SailthruClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            key: key.to_string(),
            secret: secret.to_string(),
        }
    }
}

/// A Sailthru API client for a single account.
#[derive(Clone)]
pub struct SailthruClient {
    http: Client,
    base_url: Url,
    key: String,
    secret: String,
}

impl SailthruClient {
    fn url(&self, resource: &str) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidRequest(format!("bad base URL: {}", self.base_url)))?
            .pop_if_empty()
            .push(resource);
        Ok(url)
    }

    /// Builds the signed request parameters for the given options.
    fn signed_params(&self, options: &Map<String, Value>) -> ApiResult<Vec<(&'static str, String)>> {
        let json = serde_json::to_string(options)
            .map_err(|error| ApiError::InvalidRequest(error.to_string()))?;
        let mut params = vec![
            ("api_key", self.key.clone()),
            ("format", "json".to_string()),
            ("json", json),
        ];
        let sig = signature(&self.secret, params.iter().map(|(_, value)| value.as_str()));
        params.push(("sig", sig));
        Ok(params)
    }
}

impl SailthruApi for SailthruClient {
    async fn api_get(&self, resource: &str, params: Map<String, Value>) -> ApiResult<Value> {
        let url = self.url(resource)?;
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .query(&self.signed_params(&params)?)
            .send()
            .await?;
        read_response(response).await
    }

    async fn api_post(&self, resource: &str, options: Map<String, Value>) -> ApiResult<Value> {
        let url = self.url(resource)?;
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .form(&self.signed_params(&options)?)
            .send()
            .await?;
        read_response(response).await
    }

    async fn api_post_file(
        &self,
        resource: &str,
        options: Map<String, Value>,
        attachment: Attachment,
    ) -> ApiResult<Value> {
        let url = self.url(resource)?;
        debug!(%url, file = %attachment.file_name, "POST (multipart)");

        // Files aren't part of the signature
        let form = self
            .signed_params(&options)?
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));
        let part = Part::bytes(attachment.bytes).file_name(attachment.file_name);
        let form = form.part(attachment.field, part);

        let response = self.http.post(url).multipart(form).send().await?;
        read_response(response).await
    }
}

/// Computes the request signature.
///
/// This is the hex MD5 digest of the secret followed by every parameter
/// value, sorted.
pub fn signature<'a>(secret: &str, values: impl IntoIterator<Item = &'a str>) -> String {
    let mut values: Vec<_> = values.into_iter().collect();
    values.sort_unstable();

    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    for value in values {
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

async fn read_response(response: Response) -> ApiResult<Value> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    trace!(status, %body, "response");
    parse_body(status, &body)
}

/// Error body returned by the service.
#[derive(Deserialize)]
struct ServiceError {
    error: i64,
    #[serde(default)]
    errormsg: String,
}

fn parse_body(status: u16, body: &str) -> ApiResult<Value> {
    let value: Option<Value> = serde_json::from_str(body).ok();

    // The service reports errors in the body, sometimes with a 200 status
    if let Some(error) = value
        .as_ref()
        .and_then(|value| ServiceError::deserialize(value).ok())
    {
        return Err(ApiError::Api {
            status,
            code: Some(error.error),
            message: error.errormsg,
        });
    }

    if !(200..300).contains(&status) {
        return Err(ApiError::Api {
            status,
            code: None,
            message: body.to_string(),
        });
    }

    value.ok_or_else(|| ApiError::InvalidResponse(body.to_string()))
}
