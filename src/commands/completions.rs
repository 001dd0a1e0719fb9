use std::io::stdout;

use clap::CommandFactory;
use clap_complete::generate;
use clap_complete_nushell::Nushell;

use crate::{
    cli::{Cli, CompletionsOptions, GlobalOptions},
    commands::Command,
};

impl Command for CompletionsOptions {
    async fn execute(self, _global_options: &GlobalOptions) -> anyhow::Result<()> {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();

        match self.shell.builtin() {
            Some(shell) => generate(shell, &mut cmd, bin_name, &mut stdout()),
            None => generate(Nushell, &mut cmd, bin_name, &mut stdout()),
        }

        Ok(())
    }
}
