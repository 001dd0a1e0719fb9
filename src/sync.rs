use std::{
    fmt::{Display, Formatter},
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use console::style;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    config::Credentials,
    error::{SyncError, SyncResult},
    sailthru::{
        ApiError, ApiResult, Attachment, Connector, ItemSummary, SailthruApi, item_list,
    },
    template,
};

/// Pause after each successful upload in a batch.
pub const UPLOAD_DELAY: Duration = Duration::from_millis(2000);

/// `content_html` sent with every template. The real markup lives in `setup`.
pub const TEMPLATE_CONTENT_HTML: &str =
    "{* Flexible Content Module include for existing feeds *}\n{include 'CoreModule'}";

/// Subject line sent with every template.
pub const TEMPLATE_SUBJECT: &str = "{subject_line}";

/// Suffix of files created by [`SyncEngine::generate_template`].
pub const GENERATED_SUFFIX: &str = "-daily-news.html";

/// A kind of remote item.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ItemType {
    Template,
    Include,
}

impl ItemType {
    /// The API resource for this kind of item.
    pub fn resource(self) -> &'static str {
        match self {
            ItemType::Template => "template",
            ItemType::Include => "include",
        }
    }

    /// The field holding the item list in a list response.
    fn list_field(self) -> &'static str {
        match self {
            ItemType::Template => "templates",
            ItemType::Include => "includes",
        }
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.resource())
    }
}

/// Options sent when saving a template.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct TemplatePayload {
    pub content_html: String,
    pub from_name: String,
    pub public_name: String,
    pub is_link_tracking: u8,
    pub is_google_analytics: u8,
    pub subject: String,
    pub setup: String,
}

/// Options sent when saving an include.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct IncludePayload {
    pub include: String,
    pub content_html: String,
}

/// An item ready to be uploaded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Item {
    Template {
        name: String,
        payload: TemplatePayload,
    },
    Include(IncludePayload),
}

impl Item {
    /// Build the upload payload for an item.
    pub fn new(item_type: ItemType, account: &str, name: String, source: String) -> Self {
        match item_type {
            ItemType::Template => Item::Template {
                payload: TemplatePayload {
                    content_html: TEMPLATE_CONTENT_HTML.to_string(),
                    from_name: account.to_string(),
                    public_name: name.clone(),
                    is_link_tracking: 1,
                    is_google_analytics: 1,
                    subject: TEMPLATE_SUBJECT.to_string(),
                    setup: source,
                },
                name,
            },
            ItemType::Include => Item::Include(IncludePayload {
                include: name,
                content_html: source,
            }),
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            Item::Template { .. } => ItemType::Template,
            Item::Include(_) => ItemType::Include,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Template { name, .. } => name,
            Item::Include(payload) => &payload.include,
        }
    }
}

/// A request to upload one local file to one account.
#[derive(Clone, Copy, Debug)]
pub struct UploadJob<'a> {
    pub item_type: ItemType,
    pub account: &'a str,

    /// The item name. If empty, templates take their name from the first line
    /// of the source file.
    pub name: &'a str,

    pub source_path: &'a Path,
}

/// The outcome of [`SyncEngine::upload_multiple`].
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Confirmation messages of successful uploads.
    pub uploaded: Vec<String>,

    /// Accounts that were skipped and why.
    pub skipped: Vec<(String, anyhow::Error)>,
}

impl BatchSummary {
    /// Number of accounts processed.
    pub fn total(&self) -> usize {
        self.uploaded.len() + self.skipped.len()
    }
}

/// Synchronizes local files with Sailthru accounts.
pub struct SyncEngine<'a, C> {
    credentials: &'a Credentials,
    connector: C,
    delay: Duration,
}

impl<'a, C> SyncEngine<'a, C>
where
    C: Connector,
{
    pub fn new(credentials: &'a Credentials, connector: C) -> Self {
        Self {
            credentials,
            connector,
            delay: UPLOAD_DELAY,
        }
    }

    /// Create an API client for an account.
    pub fn init_client(&self, account: &str) -> SyncResult<C::Client> {
        let credentials = self.credentials.get(account)?;
        debug!(account, "creating API client");
        Ok(self
            .connector
            .connect(&credentials.key, &credentials.secret))
    }

    /// List the templates in an account, in the order the service returns.
    pub async fn list_templates(&self, account: &str) -> SyncResult<Vec<ItemSummary>> {
        self.list(ItemType::Template, account).await
    }

    /// List the includes in an account, in the order the service returns.
    pub async fn list_includes(&self, account: &str) -> SyncResult<Vec<ItemSummary>> {
        self.list(ItemType::Include, account).await
    }

    async fn list(&self, item_type: ItemType, account: &str) -> SyncResult<Vec<ItemSummary>> {
        let client = self.init_client(account)?;
        let into_error = |source| SyncError::RemoteList {
            item_type,
            account: account.to_string(),
            source,
        };

        let response = match item_type {
            ItemType::Template => client.get_templates().await,
            ItemType::Include => client.api_get(item_type.resource(), Map::new()).await,
        }
        .map_err(into_error)?;

        item_list(&response, item_type.list_field()).map_err(into_error)
    }

    /// Create or update one item, returning a confirmation message.
    pub async fn upload(&self, job: &UploadJob<'_>) -> SyncResult<String> {
        let client = self.init_client(job.account)?;
        let source = tokio::fs::read_to_string(job.source_path)
            .await
            .map_err(|source| SyncError::FileRead {
                path: job.source_path.to_path_buf(),
                source,
            })?;

        let mut name = job.name.to_string();
        if name.is_empty() && job.item_type == ItemType::Template {
            info!(path = %job.source_path.display(), "getting template name from first line");
            name = template::name_from_source(&source);
        }
        if name.is_empty() {
            return Err(SyncError::MissingName {
                item_type: job.item_type,
            });
        }

        println!(
            "{}",
            style(format!("Uploading {}: {name}", job.item_type)).yellow()
        );
        let item = Item::new(job.item_type, job.account, name, source);
        let into_error = |source| SyncError::RemoteUpload {
            item_type: item.item_type(),
            account: job.account.to_string(),
            name: item.name().to_string(),
            source,
        };
        let response = async {
            match &item {
                Item::Template { name, payload } => {
                    client.save_template(name, to_options(payload)?).await
                }
                Item::Include(payload) => {
                    client
                        .api_post(item.item_type().resource(), to_options(payload)?)
                        .await
                }
            }
        }
        .await
        .map_err(into_error)?;

        let remote_name = response
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(item.name());
        Ok(format!(
            "Uploaded {} {remote_name} for {}",
            item.item_type(),
            job.account
        ))
    }

    /// Upload one file to several accounts, one after another.
    ///
    /// A failure only skips that account. Each success is followed by a pause
    /// unless it was the last account.
    pub async fn upload_multiple<'b>(
        &self,
        accounts: impl IntoIterator<Item = &'b str>,
        item_type: ItemType,
        name: &str,
        source_path: &Path,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut accounts = accounts.into_iter().peekable();
        while let Some(account) = accounts.next() {
            println!("------ {account} ------");
            let job = UploadJob {
                item_type,
                account,
                name,
                source_path,
            };

            match self.upload(&job).await {
                Ok(message) => {
                    println!("{}", style(&message).green());
                    summary.uploaded.push(message);
                    if accounts.peek().is_some() && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(error) => {
                    warn!(account, "upload failed");
                    let error = anyhow::Error::from(error);
                    eprintln!("{}", style(format!("Error: {error:#}")).red());
                    eprintln!("Skipping to next...");
                    summary.skipped.push((account.to_string(), error));
                }
            }
        }

        println!();
        println!("Finished upload process. Total in list: {}", summary.total());
        summary
    }

    /// Create a local template for an account from a placeholder file.
    ///
    /// The file is named after the account's `account_name` and is never
    /// overwritten if it already exists.
    pub fn generate_template(
        &self,
        account: &str,
        placeholder: &Path,
        destination_dir: &Path,
    ) -> SyncResult<PathBuf> {
        let credentials = self.credentials.get(account)?;
        let account_name = credentials
            .account_name()
            .ok_or_else(|| SyncError::MalformedAccount {
                account: account.to_string(),
                reason: "missing data.account_name".to_string(),
            })?;
        println!(
            "{}",
            style(format!("Generating a new local template for {account_name}")).yellow()
        );

        if account_name.contains(['/', '\\']) {
            return Err(SyncError::MalformedAccount {
                account: account.to_string(),
                reason: "data.account_name must not contain path separators".to_string(),
            });
        }

        let path = destination_dir.join(format!(
            "{}{GENERATED_SUFFIX}",
            account_name.to_lowercase()
        ));
        if path.exists() {
            return Err(SyncError::DestinationExists { path });
        }

        let source = fs::read_to_string(placeholder).map_err(|source| SyncError::FileRead {
            path: placeholder.to_path_buf(),
            source,
        })?;
        let rendered = template::render(&source, &credentials.data);

        // `create_new` so a file created since the check above isn't clobbered
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                return Err(SyncError::DestinationExists { path });
            }
            Err(source) => return Err(SyncError::FileWrite { path, source }),
        };
        write_or_remove(&path, file, rendered.as_bytes())?;

        Ok(path)
    }

    /// Replace the beacon image of an account.
    pub async fn beacon(&self, account: &str, image: &Path) -> SyncResult<Value> {
        let client = self.init_client(account)?;
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|source| SyncError::FileRead {
                path: image.to_path_buf(),
                source,
            })?;
        let file_name = image
            .file_name()
            .map_or_else(|| "beacon".to_string(), |name| name.to_string_lossy().into_owned());

        let attachment = Attachment {
            field: "file",
            file_name,
            bytes,
        };
        client
            .api_post_file("settings", Map::new(), attachment)
            .await
            .map_err(|source| SyncError::RemoteSettings {
                account: account.to_string(),
                source,
            })
    }
}

/// Writes a freshly created file, deleting it again if the write fails.
///
/// A partial file would otherwise block the next attempt.
fn write_or_remove(path: &Path, mut file: impl Write, contents: &[u8]) -> SyncResult<()> {
    let Err(source) = file.write_all(contents).and_then(|()| file.flush()) else {
        return Ok(());
    };

    drop(file);
    if let Err(error) = fs::remove_file(path) {
        warn!(path = %path.display(), %error, "failed to remove partial file");
    }
    Err(SyncError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn to_options(payload: &impl Serialize) -> ApiResult<Map<String, Value>> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(options)) => Ok(options),
        Ok(other) => Err(ApiError::InvalidRequest(format!(
            "expected an object, got {other}"
        ))),
        Err(error) => Err(ApiError::InvalidRequest(error.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        collections::{HashMap, HashSet},
        rc::Rc,
    };

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use test_case::test_case;
    use tokio::time::Instant;

    use super::*;

    const CREDENTIALS: &str = r#"{
        "acme": { "key": "acme-key", "secret": "s1", "data": { "account_name": "Acme", "city": "Springfield" } },
        "globex": { "key": "globex-key", "secret": "s2", "data": { "account_name": "Globex" } },
        "initech": { "key": "initech-key", "secret": "s3", "data": {} }
    }"#;

    #[derive(Clone, Debug)]
    struct Call {
        key: String,
        method: &'static str,
        resource: String,
        options: Map<String, Value>,
    }

    #[derive(Default)]
    struct MockState {
        connects: usize,
        calls: Vec<Call>,
        items: HashMap<(String, String), Vec<String>>,
        failing: HashSet<String>,
    }

    /// Keeps saved items in memory so they show up in later lists.
    #[derive(Clone, Default)]
    struct MockConnector(Rc<RefCell<MockState>>);

    impl MockConnector {
        fn failing(keys: &[&str]) -> Self {
            let connector = Self::default();
            connector
                .0
                .borrow_mut()
                .failing
                .extend(keys.iter().map(ToString::to_string));
            connector
        }

        fn calls(&self) -> Vec<Call> {
            self.0.borrow().calls.clone()
        }
    }

    impl Connector for MockConnector {
        type Client = MockClient;

        fn connect(&self, key: &str, _secret: &str) -> MockClient {
            self.0.borrow_mut().connects += 1;
            MockClient {
                key: key.to_string(),
                state: self.0.clone(),
            }
        }
    }

    struct MockClient {
        key: String,
        state: Rc<RefCell<MockState>>,
    }

    impl MockClient {
        fn record(
            &self,
            method: &'static str,
            resource: &str,
            options: &Map<String, Value>,
        ) -> ApiResult<()> {
            let mut state = self.state.borrow_mut();
            state.calls.push(Call {
                key: self.key.clone(),
                method,
                resource: resource.to_string(),
                options: options.clone(),
            });
            if state.failing.contains(&self.key) {
                return Err(ApiError::Api {
                    status: 500,
                    code: Some(99),
                    message: "boom".into(),
                });
            }
            Ok(())
        }
    }

    impl SailthruApi for MockClient {
        async fn api_get(&self, resource: &str, params: Map<String, Value>) -> ApiResult<Value> {
            self.record("GET", resource, &params)?;
            let state = self.state.borrow();
            let names = state
                .items
                .get(&(self.key.clone(), resource.to_string()))
                .cloned()
                .unwrap_or_default();
            let items = names
                .into_iter()
                .map(|name| serde_json::json!({ "name": name }))
                .collect();

            let mut response = Map::new();
            response.insert(format!("{resource}s"), Value::Array(items));
            Ok(Value::Object(response))
        }

        async fn api_post(&self, resource: &str, options: Map<String, Value>) -> ApiResult<Value> {
            self.record("POST", resource, &options)?;
            let name = options[resource].as_str().unwrap().to_string();
            let mut state = self.state.borrow_mut();
            let items = state
                .items
                .entry((self.key.clone(), resource.to_string()))
                .or_default();
            if !items.contains(&name) {
                items.push(name.clone());
            }
            Ok(serde_json::json!({ "name": name }))
        }

        async fn api_post_file(
            &self,
            resource: &str,
            mut options: Map<String, Value>,
            attachment: Attachment,
        ) -> ApiResult<Value> {
            options.insert(attachment.field.into(), attachment.file_name.into());
            options.insert("size".into(), attachment.bytes.len().into());
            self.record("POST", resource, &options)?;
            Ok(serde_json::json!({ "ok": true }))
        }
    }

    /// An engine that doesn't pause between uploads.
    fn quick_engine(
        credentials: &Credentials,
        connector: MockConnector,
    ) -> SyncEngine<'_, MockConnector> {
        SyncEngine {
            delay: Duration::ZERO,
            ..SyncEngine::new(credentials, connector)
        }
    }

    fn credentials() -> Credentials {
        Credentials::parse(CREDENTIALS).unwrap()
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn unknown_account_never_connects() {
        let credentials = credentials();
        let connector = MockConnector::default();
        let engine = SyncEngine::new(&credentials, connector.clone());

        let error = engine.init_client("nobody").err().unwrap();

        assert!(matches!(error, SyncError::AccountNotFound { .. }));
        assert_eq!(connector.0.borrow().connects, 0);
        assert!(connector.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_list() {
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        assert!(engine.list_templates("acme").await.unwrap().is_empty());
        assert!(engine.list_includes("acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_failure() {
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::failing(&["acme-key"]));

        let error = engine.list_includes("acme").await.unwrap_err();

        assert!(matches!(
            error,
            SyncError::RemoteList {
                item_type: ItemType::Include,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn upload_then_list() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "daily.html", "<html></html>");
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let message = engine
            .upload(&UploadJob {
                item_type: ItemType::Template,
                account: "acme",
                name: "Daily News",
                source_path: &source,
            })
            .await
            .unwrap();
        assert_eq!(message, "Uploaded template Daily News for acme");

        let names: Vec<_> = engine
            .list_templates("acme")
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, ["Daily News"]);

        // Other accounts are unaffected
        assert!(engine.list_templates("globex").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn template_payload() {
        let dir = TempDir::new().unwrap();
        let contents = "{* My Template *}\n<p>{{city}}</p>\n";
        let source = write(&dir, "mine.html", contents);
        let credentials = credentials();
        let connector = MockConnector::default();
        let engine = SyncEngine::new(&credentials, connector.clone());

        let message = engine
            .upload(&UploadJob {
                item_type: ItemType::Template,
                account: "acme",
                name: "",
                source_path: &source,
            })
            .await
            .unwrap();
        assert_eq!(message, "Uploaded template My Template for acme");

        let calls = connector.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].key, "acme-key");
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].resource, "template");
        let expected = serde_json::json!({
            "content_html": TEMPLATE_CONTENT_HTML,
            "from_name": "acme",
            "public_name": "My Template",
            "is_link_tracking": 1,
            "is_google_analytics": 1,
            "subject": "{subject_line}",
            "setup": contents,
            "template": "My Template",
        });
        assert_eq!(Value::Object(calls[0].options.clone()), expected);
    }

    #[tokio::test]
    async fn include_payload() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "footer.html", "<footer/>");
        let credentials = credentials();
        let connector = MockConnector::default();
        let engine = SyncEngine::new(&credentials, connector.clone());

        let message = engine
            .upload(&UploadJob {
                item_type: ItemType::Include,
                account: "globex",
                name: "Footer",
                source_path: &source,
            })
            .await
            .unwrap();
        assert_eq!(message, "Uploaded include Footer for globex");

        let calls = connector.calls();
        assert_eq!(calls[0].resource, "include");
        assert_eq!(
            Value::Object(calls[0].options.clone()),
            serde_json::json!({ "include": "Footer", "content_html": "<footer/>" })
        );
    }

    #[tokio::test]
    async fn include_needs_explicit_name() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "footer.html", "{* Footer *}\n<footer/>");
        let credentials = credentials();
        let connector = MockConnector::default();
        let engine = SyncEngine::new(&credentials, connector.clone());

        let error = engine
            .upload(&UploadJob {
                item_type: ItemType::Include,
                account: "acme",
                name: "",
                source_path: &source,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SyncError::MissingName {
                item_type: ItemType::Include
            }
        ));
        assert!(connector.calls().is_empty());
    }

    #[tokio::test]
    async fn template_without_name_comment() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "empty.html", "{**}\n<html/>");
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let error = engine
            .upload(&UploadJob {
                item_type: ItemType::Template,
                account: "acme",
                name: "",
                source_path: &source,
            })
            .await
            .unwrap_err();

        assert!(matches!(error, SyncError::MissingName { .. }));
    }

    #[tokio::test]
    async fn unreadable_source() {
        let dir = TempDir::new().unwrap();
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let error = engine
            .upload(&UploadJob {
                item_type: ItemType::Include,
                account: "acme",
                name: "Footer",
                source_path: &dir.path().join("missing.html"),
            })
            .await
            .unwrap_err();

        assert!(matches!(error, SyncError::FileRead { .. }));
    }

    #[tokio::test]
    async fn remote_upload_failure() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "footer.html", "<footer/>");
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::failing(&["acme-key"]));

        let error = engine
            .upload(&UploadJob {
                item_type: ItemType::Include,
                account: "acme",
                name: "Footer",
                source_path: &source,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            SyncError::RemoteUpload { ref account, ref name, .. } if account == "acme" && name == "Footer"
        ));
    }

    #[tokio::test]
    async fn batch_skips_failures() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "footer.html", "<footer/>");
        let credentials = credentials();
        let connector = MockConnector::failing(&["globex-key"]);
        let engine = quick_engine(&credentials, connector.clone());

        let summary = engine
            .upload_multiple(
                ["acme", "globex", "initech"],
                ItemType::Include,
                "Footer",
                &source,
            )
            .await;

        // Every account is attempted exactly once, in order
        let attempts: Vec<_> = connector
            .calls()
            .into_iter()
            .map(|call| call.key)
            .collect();
        assert_eq!(attempts, ["acme-key", "globex-key", "initech-key"]);

        assert_eq!(summary.total(), 3);
        assert_eq!(
            summary.uploaded,
            [
                "Uploaded include Footer for acme",
                "Uploaded include Footer for initech"
            ]
        );
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].0, "globex");
        assert!(matches!(
            summary.skipped[0].1.downcast_ref::<SyncError>(),
            Some(SyncError::RemoteUpload { .. })
        ));
        assert_eq!(
            format!("{:#}", summary.skipped[0].1),
            r#"failed to upload include "Footer" for globex: API error 500: boom"#
        );
    }

    #[tokio::test]
    async fn batch_skips_unknown_accounts() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "footer.html", "<footer/>");
        let credentials = credentials();
        let connector = MockConnector::default();
        let engine = quick_engine(&credentials, connector.clone());

        let summary = engine
            .upload_multiple(["ghost", "acme"], ItemType::Include, "Footer", &source)
            .await;

        assert_eq!(summary.uploaded, ["Uploaded include Footer for acme"]);
        assert!(matches!(
            summary.skipped[0].1.downcast_ref::<SyncError>(),
            Some(SyncError::AccountNotFound { .. })
        ));
        assert_eq!(connector.calls().len(), 1);
    }

    #[tokio::test]
    async fn batch_of_every_account() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "footer.html", "<footer/>");
        let credentials = credentials();
        let connector = MockConnector::default();
        let engine = quick_engine(&credentials, connector.clone());

        let summary = engine
            .upload_multiple(credentials.ids(), ItemType::Include, "Footer", &source)
            .await;

        assert_eq!(summary.uploaded.len(), 3);
        let keys: Vec<_> = connector
            .calls()
            .into_iter()
            .map(|call| call.key)
            .collect();
        assert_eq!(keys, ["acme-key", "globex-key", "initech-key"]);
    }

    // Uploads to globex always fail
    #[test_case(&["acme", "initech"], 1; "pause between successes")]
    #[test_case(&["acme", "initech", "acme"], 2; "pause after every success but the last")]
    #[test_case(&["acme", "globex", "initech"], 1; "no pause after failure")]
    #[test_case(&["globex", "acme"], 0; "single success")]
    #[tokio::test(start_paused = true)]
    async fn batch_pauses(accounts: &[&str], pauses: u32) {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "footer.html", "<footer/>");
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::failing(&["globex-key"]));

        let start = Instant::now();
        engine
            .upload_multiple(accounts.iter().copied(), ItemType::Include, "Footer", &source)
            .await;
        let elapsed = start.elapsed();

        assert!(elapsed >= UPLOAD_DELAY * pauses, "{elapsed:?}");
        assert!(elapsed < UPLOAD_DELAY * (pauses + 1), "{elapsed:?}");
    }

    #[test]
    fn generate() {
        let dir = TempDir::new().unwrap();
        let placeholder = write(
            &dir,
            "placeholder.html",
            "{* {{account_name}} Daily News *}\r\n<h1>Hello {{account_name}}!</h1>\r\n<p>{{city}} {{missing}}</p>",
        );
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let path = engine
            .generate_template("acme", &placeholder, dir.path())
            .unwrap();

        assert_eq!(path, dir.path().join("acme-daily-news.html"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{* Acme Daily News *}\n<h1>Hello Acme!</h1>\n<p>Springfield {{missing}}</p>"
        );
    }

    #[test]
    fn generate_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let placeholder = write(&dir, "placeholder.html", "{{account_name}}");
        let existing = write(&dir, "globex-daily-news.html", "hand edited");
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let error = engine
            .generate_template("globex", &placeholder, dir.path())
            .unwrap_err();

        assert!(matches!(error, SyncError::DestinationExists { ref path } if *path == existing));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "hand edited");
    }

    #[test]
    fn generate_needs_account_name() {
        let dir = TempDir::new().unwrap();
        let placeholder = write(&dir, "placeholder.html", "{{account_name}}");
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let error = engine
            .generate_template("initech", &placeholder, dir.path())
            .unwrap_err();

        assert!(matches!(error, SyncError::MalformedAccount { .. }));
    }

    #[test_case("../escape"; "parent directory")]
    #[test_case("nested/name"; "slash")]
    #[test_case("nested\\name"; "backslash")]
    fn generate_stays_in_destination(account_name: &str) {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("templates");
        fs::create_dir(&destination).unwrap();
        let placeholder = write(&dir, "placeholder.html", "{{account_name}}");
        let credentials = Credentials::parse(
            &serde_json::json!({
                "evil": { "key": "k", "secret": "s", "data": { "account_name": account_name } }
            })
            .to_string(),
        )
        .unwrap();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let error = engine
            .generate_template("evil", &placeholder, &destination)
            .unwrap_err();

        assert!(matches!(error, SyncError::MalformedAccount { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    /// Accepts some bytes, then fails.
    struct FailingWriter(usize);

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.0 == 0 {
                return Err(std::io::Error::other("disk full"));
            }
            let written = buf.len().min(self.0);
            self.0 -= written;
            Ok(written)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "acme-daily-news.html", "partial");

        let error = write_or_remove(&path, FailingWriter(3), b"complete contents").unwrap_err();

        assert!(matches!(error, SyncError::FileWrite { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn successful_write_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.html");
        let file = fs::File::create_new(&path).unwrap();

        write_or_remove(&path, file, b"contents").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "contents");
    }

    #[test]
    fn generate_missing_placeholder() {
        let dir = TempDir::new().unwrap();
        let credentials = credentials();
        let engine = SyncEngine::new(&credentials, MockConnector::default());

        let error = engine
            .generate_template("acme", &dir.path().join("nope.html"), dir.path())
            .unwrap_err();

        assert!(matches!(error, SyncError::FileRead { .. }));
        assert!(!dir.path().join("acme-daily-news.html").exists());
    }

    #[tokio::test]
    async fn beacon() {
        let dir = TempDir::new().unwrap();
        let image = write(&dir, "beacon.gif", "GIF89a");
        let credentials = credentials();
        let connector = MockConnector::default();
        let engine = SyncEngine::new(&credentials, connector.clone());

        engine.beacon("acme", &image).await.unwrap();

        let calls = connector.calls();
        assert_eq!(calls[0].resource, "settings");
        assert_eq!(
            Value::Object(calls[0].options.clone()),
            serde_json::json!({ "file": "beacon.gif", "size": 6 })
        );
    }
}
