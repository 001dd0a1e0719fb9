use anyhow::Context;
use console::style;
use tracing::info;

use crate::{
    cli::{GlobalOptions, SyncOptions, SyncType},
    commands::Command,
    error::SyncError,
    sailthru::Connector,
    sync::{ItemType, SyncEngine, UploadJob},
};

/// Account name that expands to every account in the credentials file.
const ALL_ACCOUNTS: &str = "all";

impl Command for SyncOptions {
    async fn execute(self, global_options: &GlobalOptions) -> anyhow::Result<()> {
        let account = self.account.context("--account is required")?;
        let settings = global_options.load_settings()?;
        let engine = SyncEngine::new(&settings.credentials, global_options.connector()?);
        let name = self.name.as_deref().unwrap_or_default();

        match (self.item_type, self.filename) {
            (SyncType::Template, None) => print_list(&engine, ItemType::Template, &account).await?,
            (SyncType::Include, None) => print_list(&engine, ItemType::Include, &account).await?,

            // Every account, skipping the ones that fail
            (SyncType::Include, Some(filename)) if account.eq_ignore_ascii_case(ALL_ACCOUNTS) => {
                let source_path = settings.config.includes_path.join(filename);
                info!(path = %source_path.display(), "uploading include to every account");
                let summary = engine
                    .upload_multiple(
                        settings.credentials.ids(),
                        ItemType::Include,
                        name,
                        &source_path,
                    )
                    .await;
                if !summary.skipped.is_empty() {
                    let skipped: Vec<_> = summary
                        .skipped
                        .iter()
                        .map(|(account, _)| account.as_str())
                        .collect();
                    eprintln!("{}", style(format!("Skipped: {}", skipped.join(", "))).red());
                }
            }

            // Single account, any failure is fatal
            (SyncType::Include, Some(filename)) => {
                let job = UploadJob {
                    item_type: ItemType::Include,
                    account: &account,
                    name,
                    source_path: &settings.config.includes_path.join(filename),
                };
                println!("{}", style(engine.upload(&job).await?).green());
            }
            (SyncType::Template, Some(filename)) => {
                let job = UploadJob {
                    item_type: ItemType::Template,
                    account: &account,
                    name,
                    source_path: &settings.config.templates_path.join(filename),
                };
                println!("{}", style(engine.upload(&job).await?).green());
            }

            (SyncType::Generate, _) => {
                let placeholder = global_options.placeholder.resolve()?;
                let path = engine.generate_template(
                    &account,
                    &placeholder,
                    &settings.config.templates_path,
                )?;
                println!(
                    "{}",
                    style(format!("Template file saved: \n{}", path.display())).green()
                );
            }
        }

        Ok(())
    }
}

/// Print the names of the templates or includes in an account.
///
/// Errors from the service are reported without failing. An unknown account
/// still fails.
async fn print_list<C>(
    engine: &SyncEngine<'_, C>,
    item_type: ItemType,
    account: &str,
) -> anyhow::Result<()>
where
    C: Connector,
{
    println!(
        "{}",
        style(format!("List of existing {item_type}s for {account}:")).yellow()
    );
    let items = match item_type {
        ItemType::Template => engine.list_templates(account).await,
        ItemType::Include => engine.list_includes(account).await,
    };

    match items {
        Ok(items) => {
            for item in items {
                println!("    \u{2022} {}", item.name);
            }
        }
        Err(error @ SyncError::RemoteList { .. }) => {
            let error = anyhow::Error::from(error);
            eprintln!("{}", style(format!("Error: {error:#}")).red());
        }
        Err(error) => return Err(error.into()),
    }

    Ok(())
}
