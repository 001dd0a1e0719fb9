use clap::{Args, ValueEnum};

/// Options for generating shell completions.
#[derive(Clone, Debug, Args)]
#[command(hide = true)]
pub struct CompletionsOptions {
    /// The shell to print a completion script for.
    ///
    /// Redirect the output to wherever your shell loads completions from.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Supported shells.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "pwsh", alias = "powershell")]
    PowerShell,
    #[value(alias = "nu")]
    Nushell,
}

impl Shell {
    /// The `clap_complete` generator, if it provides one for this shell.
    pub fn builtin(self) -> Option<clap_complete::Shell> {
        match self {
            Shell::Bash => Some(clap_complete::Shell::Bash),
            Shell::Zsh => Some(clap_complete::Shell::Zsh),
            Shell::Fish => Some(clap_complete::Shell::Fish),
            Shell::PowerShell => Some(clap_complete::Shell::PowerShell),
            Shell::Nushell => None,
        }
    }
}
