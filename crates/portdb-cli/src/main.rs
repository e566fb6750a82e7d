#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cmd::DataSource;
use output::{CliError, OutputMode, render_error, resolve_output_mode};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "portdb: Python 3 porting status of a distribution",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (defaults to pretty on a terminal, text otherwise).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Data directory to load from (repeatable; earlier wins).
    #[arg(
        long = "datadir",
        action = ArgAction::Append,
        env = "PORTDB_DATA",
        value_delimiter = ':',
        value_name = "DIR"
    )]
    datadirs: Vec<PathBuf>,

    /// Config file (defaults to portdb.toml in the first data directory).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    fn data_source(&self) -> DataSource {
        DataSource::new(self.datadirs.clone(), self.config.clone())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Load",
        about = "Load the data and derive statuses",
        long_about = "Load the data files, derive every status, group and tier, and print a summary.",
        after_help = "EXAMPLES:\n    # Load from the current directory\n    portdb load\n\n    # Load and export the derived snapshot\n    portdb --datadir data load --output snapshot.json"
    )]
    Load(cmd::load::LoadArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show porting progress",
        long_about = "Show package counts per status and the share of finished packages.",
        after_help = "EXAMPLES:\n    # Progress summary\n    portdb status\n\n    # Emit machine-readable output\n    portdb status --json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Read",
        about = "List every package with its status",
        long_about = "List every package, heaviest status first, with its unfinished requirements.",
        after_help = "EXAMPLES:\n    # Full report\n    portdb report\n\n    # Only packages waiting for a port\n    portdb report --status idle --status blocked"
    )]
    Report(cmd::report::ReportArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one package",
        long_about = "Show status, note, groups, tier, artifacts and dependencies of one package.",
        after_help = "EXAMPLES:\n    # Show a package\n    portdb show python-six"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Graph",
        about = "Print the requirement tree of packages",
        long_about = "Print the requirement tree of one or more packages. Released and dropped packages are not expanded unless --no-trim is given.",
        after_help = "EXAMPLES:\n    # Tree of one package\n    portdb deps python-requests\n\n    # Hide finished packages and glibc\n    portdb deps python-requests --skip -x glibc"
    )]
    Deps(cmd::deps::DepsArgs),

    #[command(
        next_help_heading = "Read",
        about = "List groups or show one group",
        long_about = "Without an ident, list groups with their progress. With an ident, list the group's derived members.",
        after_help = "EXAMPLES:\n    # List visible groups\n    portdb group\n\n    # Members of one group\n    portdb group web"
    )]
    Group(cmd::group::GroupArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show naming-policy problems",
        long_about = "List misnamed packages, packages blocked by them, and packages with ambiguous requirements.",
        after_help = "EXAMPLES:\n    # All buckets\n    portdb naming\n\n    # Only packages blocked by misnamed ones\n    portdb naming --bucket blocked"
    )]
    Naming(cmd::naming::NamingArgs),

    #[command(
        next_help_heading = "Graph",
        about = "Show porting tiers",
        long_about = "Show packages grouped by tier. Tier 0 holds finished leaves; a package's tier is above every tier it requires.",
        after_help = "EXAMPLES:\n    # Tiers\n    portdb tiers\n\n    # Tiers with condensed edges\n    portdb tiers --edges --json"
    )]
    Tiers(cmd::tiers::TiersArgs),

    #[command(
        next_help_heading = "Graph",
        about = "List dependency cycles",
        long_about = "List dependency cycles with requirements whose removal breaks them.",
        after_help = "EXAMPLES:\n    # List cycles\n    portdb cycles"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        next_help_heading = "Load",
        about = "Compare two exported snapshots",
        long_about = "Compare two snapshots written by `portdb load --output` and list status changes.",
        after_help = "EXAMPLES:\n    # What changed since last week\n    portdb diff last-week.json today.json"
    )]
    Diff(cmd::diff::DiffArgs),

    #[command(
        next_help_heading = "Shell",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    portdb completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PORTDB_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "portdb=debug,info"
        } else {
            "portdb=info,warn"
        })
    });

    let format = env::var("PORTDB_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, output: OutputMode) -> anyhow::Result<()> {
    let source = cli.data_source();
    match cli.command {
        Commands::Load(ref args) => cmd::load::run_load(args, output, &source),
        Commands::Status(ref args) => cmd::status::run_status(args, output, &source),
        Commands::Report(ref args) => cmd::report::run_report(args, output, &source),
        Commands::Show(ref args) => cmd::show::run_show(args, output, &source),
        Commands::Deps(ref args) => cmd::deps::run_deps(args, output, &source),
        Commands::Group(ref args) => cmd::group::run_group(args, output, &source),
        Commands::Naming(ref args) => cmd::naming::run_naming(args, output, &source),
        Commands::Tiers(ref args) => cmd::tiers::run_tiers(args, output, &source),
        Commands::Cycles(ref args) => cmd::cycles::run_cycles(args, output, &source),
        Commands::Diff(ref args) => cmd::diff::run_diff(args, output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args, &mut command)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();

    match run(cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Err(render_err) = render_error(output, &CliError::from_anyhow(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["portdb", "--json", "status"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["portdb", "status", "--json"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["portdb", "report", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn datadir_is_repeatable() {
        let cli = Cli::parse_from(["portdb", "--datadir", "a", "--datadir", "b", "status"]);
        assert_eq!(cli.datadirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cli.data_source().data_dirs.len(), 2);
    }

    #[test]
    fn datadir_belongs_before_the_subcommand() {
        assert!(Cli::try_parse_from(["portdb", "status", "--datadir", "b"]).is_err());
        let source = DataSource::new(Vec::new(), None);
        assert_eq!(source.data_dirs, vec![PathBuf::from(".")]);
    }

    #[test]
    fn config_flag_parses() {
        let cli = Cli::parse_from(["portdb", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn show_requires_package() {
        assert!(Cli::try_parse_from(["portdb", "show"]).is_err());
        let cli = Cli::parse_from(["portdb", "show", "python-six"]);
        assert!(matches!(cli.command, Commands::Show(_)));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["portdb", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["portdb", "load"],
            vec!["portdb", "load", "--output", "out.json"],
            vec!["portdb", "status"],
            vec!["portdb", "report", "--status", "idle"],
            vec!["portdb", "show", "x"],
            vec!["portdb", "deps", "x", "y", "--no-trim"],
            vec!["portdb", "group"],
            vec!["portdb", "group", "web", "--all"],
            vec!["portdb", "naming", "--bucket", "ambiguous"],
            vec!["portdb", "tiers", "--edges"],
            vec!["portdb", "cycles"],
            vec!["portdb", "diff", "old.json", "new.json"],
            vec!["portdb", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "Failed to parse: {args:?}, error: {:?}", result.err());
        }
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
