//! Command dispatch and the interactive walk loop

use std::io::{self, BufRead, Write};
use std::path::Path;

use clap::CommandFactory;
use colored::Colorize;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::{CurrentQuestion, SessionManager};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_dir, global_config_path, local_config_path, Settings};
use crate::domain::{DecisionTree, Programme};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, JsonTreeFile, TreeProvider};

/// How an interactive walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed(Vec<Programme>),
    Quit,
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("get current directory", e))?,
    };

    match &cli.command {
        Some(Commands::Walk { tree }) => cmd_walk(&dir, tree.as_deref()),
        Some(Commands::Tree { tree }) => cmd_tree(&dir, tree.as_deref()),
        Some(Commands::Leaves { tree }) => cmd_leaves(&dir, tree.as_deref()),
        Some(Commands::Check { tree }) => cmd_check(&dir, tree.as_deref()),
        Some(Commands::Config { command }) => cmd_config(&dir, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "progwalk", &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, try `progwalk --help`".to_string(),
        )),
    }
}

/// Settings with an explicit tree path taking precedence over the configured one.
fn settings_for(dir: &Path, tree: Option<&Path>) -> CliResult<Settings> {
    let mut settings = Settings::load(Some(dir))?;
    if let Some(tree) = tree {
        if !tree.exists() {
            return Err(CliError::InvalidArgs(format!(
                "tree document not found: {}",
                tree.display()
            )));
        }
        settings.tree_path = tree.to_path_buf();
    }
    debug!("tree path: {}", settings.tree_path.display());
    Ok(settings)
}

fn load_tree(dir: &Path, tree: Option<&Path>) -> CliResult<DecisionTree> {
    let settings = settings_for(dir, tree)?;
    Ok(JsonTreeFile::new(settings.tree_path).provide()?)
}

#[instrument(level = "debug")]
fn cmd_walk(dir: &Path, tree: Option<&Path>) -> CliResult<()> {
    let container = ServiceContainer::new(settings_for(dir, tree)?)?;
    let stdin = io::stdin();
    let outcome = walk(&container.sessions, stdin.lock(), io::stdout())?;

    match outcome {
        WalkOutcome::Completed(programmes) => {
            output::header("Recommended programmes");
            for programme in &programmes {
                output::programme(programme);
            }
        }
        WalkOutcome::Quit => output::warning("walk aborted"),
    }
    Ok(())
}

/// Run one session to completion, reading answers line by line.
///
/// An answer is its number or its label. `b` shows the previous question
/// again; answering it discards everything decided after it. `q` or end of
/// input quits and removes the session.
pub fn walk<R: BufRead, W: Write>(
    sessions: &SessionManager,
    input: R,
    mut out: W,
) -> CliResult<WalkOutcome> {
    let session_id = sessions.create_session()?;
    let mut lines = input.lines();
    let mut asked: Vec<CurrentQuestion> = Vec::new();
    let mut shown = sessions.current_question(&session_id)?;

    loop {
        print_question(&mut out, &shown)?;

        let Some(line) = lines.next() else {
            sessions.remove_session(&session_id);
            return Ok(WalkOutcome::Quit);
        };
        let line = line.map_err(|e| InfraError::io("read answer", e))?;
        let answer = line.trim();

        match answer {
            "q" => {
                sessions.remove_session(&session_id);
                return Ok(WalkOutcome::Quit);
            }
            "b" => {
                match asked.pop() {
                    Some(previous) => shown = previous,
                    None => writeln!(out, "{}", "already at the first question".yellow())
                        .map_err(write_err)?,
                }
                continue;
            }
            _ => {}
        }

        let Some(token) = pick_token(&shown, answer) else {
            writeln!(
                out,
                "{} {}",
                "unknown answer:".yellow(),
                shown.labels().iter().join(", ")
            )
            .map_err(write_err)?;
            continue;
        };

        if let Some(programmes) = sessions.submit_answer(&session_id, &token)? {
            return Ok(WalkOutcome::Completed(programmes));
        }
        asked.push(shown);
        shown = sessions.current_question(&session_id)?;
    }
}

/// Resolve typed input as a label or a 1-based answer number.
///
/// An exact label wins over the answer number, so numeric labels stay pickable.
fn pick_token(question: &CurrentQuestion, input: &str) -> Option<String> {
    if let Some(answer) = question.answers.iter().find(|a| a.label == input) {
        return Some(answer.token.clone());
    }
    if let Ok(number) = input.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|i| question.answers.get(i))
            .map(|a| a.token.clone());
    }
    question
        .answers
        .iter()
        .find(|a| a.label.eq_ignore_ascii_case(input))
        .map(|a| a.token.clone())
}

fn print_question<W: Write>(out: &mut W, question: &CurrentQuestion) -> CliResult<()> {
    writeln!(out, "\n{}", question.question.cyan().bold()).map_err(write_err)?;
    for (i, answer) in question.answers.iter().enumerate() {
        writeln!(out, "  {} {}", format!("[{}]", i + 1).yellow(), answer.label)
            .map_err(write_err)?;
    }
    write!(out, "{} ", ">".cyan()).map_err(write_err)?;
    out.flush().map_err(write_err)
}

fn write_err(e: io::Error) -> CliError {
    InfraError::io("write output", e).into()
}

#[instrument(level = "debug")]
fn cmd_tree(dir: &Path, tree: Option<&Path>) -> CliResult<()> {
    let tree = load_tree(dir, tree)?;
    output::info(&tree.to_termtree());
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_leaves(dir: &Path, tree: Option<&Path>) -> CliResult<()> {
    let tree = load_tree(dir, tree)?;
    for (_, programme) in tree.leaves() {
        output::info(programme);
    }
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_check(dir: &Path, tree: Option<&Path>) -> CliResult<()> {
    let settings = settings_for(dir, tree)?;
    let file = JsonTreeFile::new(settings.tree_path);
    let tree = file.provide()?;
    if tree.root_node().is_leaf() {
        output::warning("root is a programme, sessions cannot start on this tree");
    }

    let duplicates = tree
        .leaves()
        .into_iter()
        .map(|(_, p)| p)
        .duplicates()
        .collect_vec();

    output::success(&format!("{} is valid", file.path().display()));
    output::action("nodes", &tree.node_count());
    output::action("questions", &tree.question_count());
    output::action("programmes", &tree.leaves().len());
    output::action("depth", &tree.depth());
    if !duplicates.is_empty() {
        output::warning("programmes reachable on more than one path:");
        for programme in duplicates {
            output::failure(programme);
        }
    }
    Ok(())
}

fn cmd_config(dir: &Path, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(dir))?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &describe(&path)),
                None => output::action("global", &"<no home directory>"),
            }
            output::action("local", &describe(&local_config_path(dir)));
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                let config_dir = global_config_dir().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?;
                std::fs::create_dir_all(&config_dir).map_err(|e| {
                    InfraError::io(format!("create {}", config_dir.display()), e)
                })?;
                config_dir.join("progwalk.toml")
            } else {
                local_config_path(dir)
            };
            init_config(&path)?;
            output::success(&format!("created {}", path.display()));
            Ok(())
        }
    }
}

fn describe(path: &Path) -> String {
    let state = if path.exists() { "exists" } else { "missing" };
    format!("{} ({})", path.display(), state)
}

/// Write the config template, refusing to overwrite.
pub fn init_config(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    std::fs::write(path, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AnswerChoice;

    fn question() -> CurrentQuestion {
        CurrentQuestion {
            question: "Do you like numbers?".to_string(),
            answers: vec![
                AnswerChoice {
                    token: "t-yes".to_string(),
                    label: "yes".to_string(),
                },
                AnswerChoice {
                    token: "t-no".to_string(),
                    label: "no".to_string(),
                },
            ],
        }
    }

    #[test]
    fn given_answer_number_when_picking_then_returns_its_token() {
        assert_eq!(pick_token(&question(), "2"), Some("t-no".to_string()));
    }

    #[test]
    fn given_out_of_range_number_when_picking_then_none() {
        assert_eq!(pick_token(&question(), "0"), None);
        assert_eq!(pick_token(&question(), "3"), None);
    }

    #[test]
    fn given_label_in_other_case_when_picking_then_matches() {
        assert_eq!(pick_token(&question(), "YES"), Some("t-yes".to_string()));
        assert_eq!(pick_token(&question(), "maybe"), None);
    }

    #[test]
    fn given_numeric_labels_when_picking_then_label_wins_over_number() {
        let question = CurrentQuestion {
            question: "Which intake?".to_string(),
            answers: vec![
                AnswerChoice {
                    token: "t-2024".to_string(),
                    label: "2024".to_string(),
                },
                AnswerChoice {
                    token: "t-1".to_string(),
                    label: "1".to_string(),
                },
            ],
        };

        assert_eq!(pick_token(&question, "2024"), Some("t-2024".to_string()));
        assert_eq!(pick_token(&question, "1"), Some("t-1".to_string()));
        assert_eq!(pick_token(&question, "2"), Some("t-1".to_string()));
        assert_eq!(pick_token(&question, "3"), None);
    }
}
