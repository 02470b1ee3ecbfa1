//! Shell completions generation command.
//!
//! # Usage
//!
//! ```bash
//! mmj completions bash > ~/.local/share/bash-completion/completions/mmj
//! mmj completions zsh -o ~/.zsh/completions/_mmj
//! ```

use crate::cli::{Cli, CompletionsArgs, ShellType};
use crate::error::Result;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;
use tracing::info;

const BIN_NAME: &str = "mmj";

/// Execute the completions command.
///
/// # Errors
///
/// Returns an error if file I/O fails.
pub fn execute(args: &CompletionsArgs) -> Result<()> {
    info!(shell = ?args.shell, output = ?args.output, "Generating shell completions");

    let mut cmd = Cli::command();
    let shell = convert_shell_type(args.shell);

    if let Some(output_path) = &args.output {
        let mut file = std::fs::File::create(output_path)?;
        generate(shell, &mut cmd, BIN_NAME, &mut file);
        eprintln!("Generated {shell} completions to {}", output_path.display());
    } else {
        generate(shell, &mut cmd, BIN_NAME, &mut io::stdout());
    }

    Ok(())
}

const fn convert_shell_type(shell: ShellType) -> Shell {
    match shell {
        ShellType::Bash => Shell::Bash,
        ShellType::Zsh => Shell::Zsh,
        ShellType::Fish => Shell::Fish,
        ShellType::PowerShell => Shell::PowerShell,
        ShellType::Elvish => Shell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut cmd = Cli::command();
        let mut output = Vec::new();
        generate(shell, &mut cmd, BIN_NAME, &mut output);
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_convert_shell_type() {
        assert_eq!(convert_shell_type(ShellType::Bash), Shell::Bash);
        assert_eq!(convert_shell_type(ShellType::PowerShell), Shell::PowerShell);
    }

    #[test]
    fn test_bash_completion_lists_commands_and_flags() {
        let script = script(Shell::Bash);
        assert!(script.contains("_mmj"));
        for word in ["run", "init", "template", "check", "summary", "--json", "--no-prompt"] {
            assert!(script.contains(word), "missing {word}");
        }
    }

    #[test]
    fn test_fish_completion_syntax() {
        assert!(script(Shell::Fish).contains("complete -c mmj"));
    }
}
