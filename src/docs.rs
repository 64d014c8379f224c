//! Markdown reference pages generated from the CLI definition.

use crate::Result;
use clap::{Arg, Command};
use std::fs;
use std::path::{Path, PathBuf};

/// Write one page for `command` and one for each of its subcommands into `dir`.
///
/// Pages are named after the command path joined with `_`
/// (`bunny-cli.md`, `bunny-cli_upload-folder.md`, ...).
pub fn generate_markdown_tree(command: &Command, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    write_pages(command, &[], dir, &mut written)?;
    Ok(written)
}

fn write_pages(
    command: &Command,
    parents: &[String],
    dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let mut path_segments = parents.to_vec();
    path_segments.push(command.get_name().to_string());

    let page = render_page(command, &path_segments);
    let file = dir.join(format!("{}.md", path_segments.join("_")));
    fs::write(&file, page)?;
    tracing::debug!(file = %file.display(), "Wrote documentation page");
    written.push(file);

    for sub in visible_subcommands(command) {
        write_pages(sub, &path_segments, dir, written)?;
    }
    Ok(())
}

fn visible_subcommands(command: &Command) -> impl Iterator<Item = &Command> {
    command
        .get_subcommands()
        .filter(|sub| !sub.is_hide_set() && sub.get_name() != "help")
}

/// Render the Markdown page of one command.
pub fn render_page(command: &Command, path_segments: &[String]) -> String {
    let full_name = path_segments.join(" ");
    let mut page = format!("## {}\n\n", full_name);

    if let Some(about) = command.get_about() {
        page.push_str(&format!("{}\n\n", about));
    }
    if let Some(long_about) = command.get_long_about() {
        page.push_str(&format!("### Synopsis\n\n{}\n\n", long_about));
    }

    let usage = if command.has_subcommands() {
        format!("{} [command]", full_name)
    } else {
        format!("{} [flags]", full_name)
    };
    page.push_str(&format!("```\n{}\n```\n\n", usage));

    let args: Vec<&Arg> = command
        .get_arguments()
        .filter(|arg| !arg.is_hide_set())
        .collect();
    if !args.is_empty() {
        page.push_str("### Options\n\n");
        page.push_str("| Flag | Description | Default |\n");
        page.push_str("|------|-------------|---------|\n");
        for arg in args {
            page.push_str(&format!(
                "| {} | {} | {} |\n",
                flag_label(arg),
                arg.get_help().map(|h| h.to_string()).unwrap_or_default(),
                default_label(arg)
            ));
        }
        page.push('\n');
    }

    let subcommands: Vec<&Command> = visible_subcommands(command).collect();
    if !subcommands.is_empty() {
        page.push_str("### Subcommands\n\n");
        for sub in subcommands {
            page.push_str(&format!(
                "* [{} {}]({}_{}.md) - {}\n",
                full_name,
                sub.get_name(),
                path_segments.join("_"),
                sub.get_name(),
                sub.get_about().map(|a| a.to_string()).unwrap_or_default()
            ));
        }
        page.push('\n');
    }

    if path_segments.len() > 1 {
        let parent = &path_segments[..path_segments.len() - 1];
        page.push_str(&format!(
            "### See also\n\n* [{}]({}.md)\n",
            parent.join(" "),
            parent.join("_")
        ));
    }

    page
}

fn flag_label(arg: &Arg) -> String {
    let mut label = Vec::new();
    if let Some(short) = arg.get_short() {
        label.push(format!("`-{}`", short));
    }
    if let Some(long) = arg.get_long() {
        label.push(format!("`--{}`", long));
    }
    if label.is_empty() {
        label.push(format!("`<{}>`", arg.get_id()));
    }
    let mut label = label.join(", ");
    if arg.is_required_set() {
        label.push_str(" (required)");
    }
    label
}

fn default_label(arg: &Arg) -> String {
    arg.get_default_values()
        .iter()
        .map(|value| format!("`{}`", value.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ArgAction;

    fn sample_command() -> Command {
        Command::new("tool")
            .about("A sample tool")
            .subcommand(
                Command::new("upload")
                    .about("Upload things")
                    .arg(
                        Arg::new("folder")
                            .short('f')
                            .long("folder")
                            .help("Folder to upload")
                            .required(true),
                    )
                    .arg(
                        Arg::new("concurrency")
                            .short('c')
                            .long("concurrency")
                            .help("Number of workers")
                            .default_value("10"),
                    ),
            )
            .subcommand(
                Command::new("secret")
                    .hide(true)
                    .arg(Arg::new("flag").long("flag").action(ArgAction::SetTrue)),
            )
    }

    #[test]
    fn test_render_page_lists_flags_and_defaults() {
        let command = sample_command();
        let upload = command.find_subcommand("upload").unwrap();

        let page = render_page(upload, &["tool".to_string(), "upload".to_string()]);

        assert!(page.starts_with("## tool upload"));
        assert!(page.contains("Upload things"));
        assert!(page.contains("| `-f`, `--folder` (required) | Folder to upload |  |"));
        assert!(page.contains("| `-c`, `--concurrency` | Number of workers | `10` |"));
        assert!(page.contains("[tool](tool.md)"));
    }

    #[test]
    fn test_render_root_page_has_usage_and_no_see_also() {
        let page = render_page(&sample_command(), &["tool".to_string()]);

        assert!(page.starts_with("## tool\n\nA sample tool\n\n"));
        assert!(page.contains("```\ntool [command]\n```\n"));
        assert!(page.contains(
            "### Subcommands\n\n* [tool upload](tool_upload.md) - Upload things\n"
        ));
        assert!(!page.contains("See also"));
    }

    #[test]
    fn test_generate_markdown_tree_skips_hidden_commands() {
        let dir = tempfile::tempdir().unwrap();

        let written = generate_markdown_tree(&sample_command(), dir.path()).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["tool.md", "tool_upload.md"]);

        let root = std::fs::read_to_string(dir.path().join("tool.md")).unwrap();
        assert!(root.contains("[tool upload](tool_upload.md) - Upload things"));
        assert!(!root.contains("secret"));
    }
}
