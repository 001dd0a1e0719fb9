mod app;
mod cli;
mod commands;
mod config;
mod error;
mod sailthru;
mod sync;
mod template;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
