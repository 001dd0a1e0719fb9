use console::style;

use crate::{
    cli::{BeaconOptions, GlobalOptions},
    commands::Command,
    sync::SyncEngine,
};

impl Command for BeaconOptions {
    async fn execute(self, global_options: &GlobalOptions) -> anyhow::Result<()> {
        let credentials = global_options.load_credentials()?;
        let engine = SyncEngine::new(&credentials, global_options.connector()?);

        println!(
            "{}",
            style(format!("Set beacon image for {}:", self.account)).yellow()
        );
        let response = engine.beacon(&self.account, &self.image).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);

        Ok(())
    }
}
