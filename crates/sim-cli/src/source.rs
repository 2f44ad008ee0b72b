//! Program files and `file@priority` arguments.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sim_core::{extract_source_lines, FaultReason, Instruction, Program};
use sim_scheduler::{Priority, DEFAULT_PRIORITY};
use thiserror::Error;

/// Errors raised while reading program sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The text after the last `@` is not an integer.
    #[error("invalid priority `{priority}` in `{arg}`")]
    BadPriority {
        /// Full argument.
        arg: String,
        /// Offending priority text.
        priority: String,
    },
}

/// A program file to run and the priority to submit it at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    /// Source file path.
    pub path: PathBuf,
    /// Submission priority.
    pub priority: Priority,
}

impl ProgramSpec {
    /// Parses `path` or `path@priority`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::BadPriority`] when the suffix is not an integer.
    pub fn parse(arg: &str) -> Result<Self, SourceError> {
        let Some((path, priority)) = arg.rsplit_once('@') else {
            return Ok(Self {
                path: PathBuf::from(arg),
                priority: DEFAULT_PRIORITY,
            });
        };
        let priority = priority
            .parse::<Priority>()
            .map_err(|_| SourceError::BadPriority {
                arg: arg.to_string(),
                priority: priority.to_string(),
            })?;
        Ok(Self {
            path: PathBuf::from(path),
            priority,
        })
    }
}

/// A decode error found by [`check_source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-indexed line in the source file.
    pub line: usize,
    /// Program address the line would load at.
    pub addr: usize,
    /// Why the line does not decode.
    pub reason: FaultReason,
}

/// Reads a program file.
///
/// # Errors
///
/// Returns [`SourceError::Io`] when the file cannot be read.
pub fn load_program(path: &Path) -> Result<Program, SourceError> {
    read(path).map(|source| Program::from_source(&source))
}

/// Decodes every instruction line of `source`, returning the failures.
#[must_use]
pub fn check_source(source: &str) -> Vec<Diagnostic> {
    extract_source_lines(source)
        .into_iter()
        .enumerate()
        .filter_map(|(addr, line)| {
            Instruction::decode(&line.text)
                .err()
                .map(|reason| Diagnostic {
                    line: line.original_line,
                    addr,
                    reason,
                })
        })
        .collect()
}

/// Reads a source file into a string.
///
/// # Errors
///
/// Returns [`SourceError::Io`] when the file cannot be read.
pub fn read(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{check_source, load_program, ProgramSpec, SourceError};
    use sim_core::{FaultReason, Program};

    #[test]
    fn plain_path_uses_default_priority() {
        assert_eq!(
            ProgramSpec::parse("demo.asm").expect("parses"),
            ProgramSpec {
                path: PathBuf::from("demo.asm"),
                priority: 1,
            }
        );
    }

    #[test]
    fn priority_suffix_is_split_at_the_last_at_sign() {
        assert_eq!(
            ProgramSpec::parse("dir@x/demo.asm@-3").expect("parses"),
            ProgramSpec {
                path: PathBuf::from("dir@x/demo.asm"),
                priority: -3,
            }
        );
    }

    #[test]
    fn non_numeric_priority_is_rejected() {
        let err = ProgramSpec::parse("demo.asm@high").expect_err("bad priority");
        assert!(matches!(err, SourceError::BadPriority { .. }));
        assert_eq!(err.to_string(), "invalid priority `high` in `demo.asm@high`");
    }

    #[test]
    fn check_reports_original_line_numbers() {
        let source = "; demo\nMOV R0 1\n\nMOV R5 2\nFOO\nHLT\n";
        let diagnostics = check_source(source);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].line, 4);
        assert_eq!(diagnostics[0].addr, 1);
        assert_eq!(diagnostics[0].reason, FaultReason::RegisterOutOfRange(5));
        assert_eq!(diagnostics[1].line, 5);
        assert_eq!(diagnostics[1].addr, 2);
    }

    #[test]
    fn load_program_strips_comments() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("add.asm");
        std::fs::write(&path, "MOV R0 10 ; ten\n\n# done\nHLT\n").expect("write source");

        assert_eq!(
            load_program(&path).expect("readable"),
            Program::new(["MOV R0 10", "HLT"])
        );
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_program(&PathBuf::from("/nonexistent/prog.asm")).expect_err("missing");
        assert!(err.to_string().starts_with("failed to read /nonexistent/prog.asm"));
    }
}
