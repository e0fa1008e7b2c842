//! External editor collaborator.
//!
//! # Responsibility
//! - Open a file in the user's editor and block until it exits.
//!
//! # Invariants
//! - `Editor::open` returns only after the editor process has exited.
//! - A missing editor binary is reported, never a panic.

use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::Path;
use std::process::Command;

/// Editor used when `$EDITOR` is unset.
pub const DEFAULT_EDITOR: &str = "vi";

/// Editor invocation failure.
#[derive(Debug)]
pub enum EditorError {
    /// Editor command is blank.
    EmptyCommand,
    /// Editor binary could not be started.
    Launch { program: String, source: io::Error },
    /// Editor exited unsuccessfully.
    Failed { program: String, code: Option<i32> },
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCommand => write!(f, "editor command is empty"),
            Self::Launch { program, source } => {
                write!(f, "failed to launch editor `{program}`: {source}")
            }
            Self::Failed { program, code } => match code {
                Some(code) => write!(f, "editor `{program}` exited with status {code}"),
                None => write!(f, "editor `{program}` was terminated by a signal"),
            },
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Launch { source, .. } => Some(source),
            Self::EmptyCommand | Self::Failed { .. } => None,
        }
    }
}

/// Opens files for interactive editing.
pub trait Editor {
    /// Opens `path` and blocks until the user is done.
    fn open(&self, path: &Path) -> Result<(), EditorError>;
}

/// Runs an external command such as `vim` or `code --wait`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEditor {
    command: String,
}

impl CommandEditor {
    /// Uses `command` split on whitespace: program followed by arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Editor for CommandEditor {
    fn open(&self, path: &Path) -> Result<(), EditorError> {
        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or(EditorError::EmptyCommand)?;
        info!(
            "event=editor_open module=editor status=start program={program} path={}",
            path.display()
        );

        let status = Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .map_err(|source| {
                error!("event=editor_open module=editor status=error program={program} error={source}");
                EditorError::Launch {
                    program: program.to_string(),
                    source,
                }
            })?;

        if !status.success() {
            return Err(EditorError::Failed {
                program: program.to_string(),
                code: status.code(),
            });
        }
        info!("event=editor_open module=editor status=ok program={program}");
        Ok(())
    }
}
