//! `portdb completions`: shell completion scripts.

use std::io::Write;

use clap::Args;
use clap_complete::{Shell, generate};

pub const BIN_NAME: &str = "portdb";

/// Arguments for `portdb completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to `out`.
pub fn write_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) {
    generate(shell, command, BIN_NAME, out);
}

/// Execute `portdb completions`.
pub fn run_completions(args: &CompletionsArgs, command: &mut clap::Command) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_completions(args.shell, command, &mut out);
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_script_names_subcommands() {
        let mut command = clap::Command::new(BIN_NAME)
            .subcommand(clap::Command::new("status"))
            .subcommand(clap::Command::new("deps"));
        let mut out = Vec::new();
        write_completions(Shell::Bash, &mut command, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("_portdb"));
        assert!(script.contains("status"));
        assert!(script.contains("deps"));
    }
}
