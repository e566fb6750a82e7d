//! `portdb deps`: requirement tree of one or more packages.

use std::io::Write;

use clap::Args;

use portdb_engine::tree::{TreeLine, TreeOptions, dependency_tree};

use super::DataSource;
use crate::output::{OutputMode, render_mode};

/// Arguments for `portdb deps`.
#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Root packages.
    #[arg(required = true, num_args = 1..)]
    pub packages: Vec<String>,

    /// Package to list without expanding (repeatable).
    #[arg(short = 'x', long, value_name = "PACKAGE")]
    pub exclude: Vec<String>,

    /// Expand released and dropped packages too.
    #[arg(long)]
    pub no_trim: bool,

    /// Leave trimmed and excluded packages out entirely.
    #[arg(short, long)]
    pub skip: bool,
}

impl DepsArgs {
    fn options(&self) -> TreeOptions {
        TreeOptions {
            exclude: self.exclude.iter().cloned().collect(),
            trim: !self.no_trim,
            skip: self.skip,
        }
    }
}

/// Execute `portdb deps`.
pub fn run_deps(args: &DepsArgs, output: OutputMode, source: &DataSource) -> anyhow::Result<()> {
    let (_, snapshot) = source.derive()?;
    let lines = dependency_tree(&snapshot, &args.packages, &args.options())?;
    render_mode(output, &lines, render_text, render_pretty)
}

fn render_text(lines: &Vec<TreeLine>, w: &mut dyn Write) -> std::io::Result<()> {
    for line in lines {
        writeln!(w, "{}{}{}", "  ".repeat(line.depth), line.name, line.mark.suffix())?;
    }
    Ok(())
}

fn render_pretty(lines: &Vec<TreeLine>, w: &mut dyn Write) -> std::io::Result<()> {
    for line in lines {
        let indent = if line.depth == 0 {
            String::new()
        } else {
            format!("{}└╴", "  ".repeat(line.depth - 1))
        };
        writeln!(w, "{} {indent}{}{}", line.status.abbrev(), line.name, line.mark.suffix())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use portdb_core::model::Status;
    use portdb_engine::tree::TreeMark;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: DepsArgs,
    }

    #[test]
    fn trim_is_on_by_default() {
        let parsed = Wrapper::parse_from(["test", "app"]);
        let options = parsed.args.options();
        assert!(options.trim);
        assert!(!options.skip);
        assert!(options.exclude.is_empty());
    }

    #[test]
    fn flags_map_to_options() {
        let parsed = Wrapper::parse_from(["test", "app", "web", "-x", "glibc", "--no-trim", "-s"]);
        assert_eq!(parsed.args.packages, vec!["app", "web"]);
        let options = parsed.args.options();
        assert!(!options.trim);
        assert!(options.skip);
        assert!(options.exclude.contains("glibc"));
    }

    #[test]
    fn requires_a_root() {
        assert!(Wrapper::try_parse_from(["test"]).is_err());
    }

    #[test]
    fn text_tree_indents_by_depth() {
        let lines = vec![
            TreeLine { depth: 0, name: "app".into(), status: Status::Blocked, mark: TreeMark::Expanded },
            TreeLine { depth: 1, name: "lib".into(), status: Status::Idle, mark: TreeMark::Expanded },
            TreeLine { depth: 1, name: "six".into(), status: Status::Released, mark: TreeMark::Finished },
        ];
        let mut out = Vec::new();
        render_text(&lines, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "app\n  lib\n  six ✔\n");
    }
}
