use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::CheckOutcome;
use crate::cli::args::{BranchCommands, Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::BranchKind;
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Commands::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let local_dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| CliError::Usage(format!("cannot determine current directory: {e}")))?,
    };
    let settings = Settings::load(Some(&local_dir))?;
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Commands::Check { file } => cmd_check(&container, file),
        Commands::Tree { file } => cmd_tree(&container, file),
        Commands::Fmt { file, write } => cmd_fmt(&container, file, *write),
        Commands::New { file, action } => cmd_new(&container, file, action.as_deref()),
        Commands::Branch { command } => match command {
            BranchCommands::Add { file, kind, action } => {
                cmd_branch_add(&container, file, (*kind).into(), action.as_deref())
            }
            BranchCommands::Remove { file, index } => {
                cmd_branch_remove(&container, file, *index)
            }
        },
        Commands::Config { command } => cmd_config(&container, command, &local_dir),
        Commands::Completion { .. } => Ok(()),
    }
}

fn resolve(container: &ServiceContainer, file: &Path) -> PathBuf {
    container.settings.resolve(file)
}

#[instrument(skip(container))]
fn cmd_check(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let path = resolve(container, file);
    let outcome = container.rules.check(&path)?;
    print_check(&outcome);
    if outcome.is_valid() {
        output::success(&format!("{} is valid", path.display()));
        Ok(())
    } else {
        Err(CliError::Invalid(path.display().to_string()))
    }
}

fn print_check(outcome: &CheckOutcome) {
    let report = &outcome.report;
    output::header(&format!(
        "{} branch(es), {} node(s)",
        outcome.branches.len(),
        outcome.node_count
    ));
    if !report.sequence_valid {
        output::failure(&"branch sequence: expected IF, ELSE IF*, optional ELSE");
    }
    for (position, (id, kind)) in outcome.branches.iter().enumerate() {
        let label = format!("[{position}] {}", kind.label());
        if !report.invalid_branches.contains(id) {
            output::success_detail(&label);
            continue;
        }
        output::failure(&label);
        if report.blank_actions.contains(id) {
            output::detail(&"  blank action");
        }
        if report.nested.iter().any(|(branch, _)| branch == id) {
            output::detail(&"  nested rule invalid");
        }
    }
    for (node, text) in &outcome.invalid_nodes {
        output::detail(&format!("{node}: {text}"));
    }
}

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, file: &Path) -> CliResult<()> {
    let tree = container.rules.render_tree(&resolve(container, file))?;
    output::info(&tree);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_fmt(container: &ServiceContainer, file: &Path, write: bool) -> CliResult<()> {
    let path = resolve(container, file);
    let json = container.rules.format(&path, write)?;
    if write {
        output::action("Formatted", &path.display());
    } else {
        output::info(&json);
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_new(container: &ServiceContainer, file: &Path, action: Option<&str>) -> CliResult<()> {
    let path = resolve(container, file);
    container.rules.create(&path, action)?;
    output::action("Created", &path.display());
    Ok(())
}

#[instrument(skip(container))]
fn cmd_branch_add(
    container: &ServiceContainer,
    file: &Path,
    kind: BranchKind,
    action: Option<&str>,
) -> CliResult<()> {
    let path = resolve(container, file);
    if container.rules.add_branch(&path, kind, action)? {
        output::action("Added", &kind.label());
        Ok(())
    } else {
        Err(CliError::InvalidArgs(format!(
            "{} not allowed in the current branch sequence",
            kind.label()
        )))
    }
}

#[instrument(skip(container))]
fn cmd_branch_remove(container: &ServiceContainer, file: &Path, index: usize) -> CliResult<()> {
    let path = resolve(container, file);
    match container.rules.remove_branch(&path, index)? {
        0 => Err(CliError::InvalidArgs(format!("no branch at position {index}"))),
        1 => {
            output::action("Removed", &format!("branch {index}"));
            Ok(())
        }
        n => {
            output::action("Removed", &format!("branch {index}"));
            output::warning(&format!("{} dependent branch(es) removed", n - 1));
            Ok(())
        }
    }
}

fn cmd_config(
    container: &ServiceContainer,
    command: &ConfigCommands,
    local_dir: &Path,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&container.settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::info(&format!("global: {}", path.display())),
                None => output::warning(&"no global config directory"),
            }
            output::info(&format!("local:  {}", local_config_path(local_dir).display()));
        }
    }
    Ok(())
}
