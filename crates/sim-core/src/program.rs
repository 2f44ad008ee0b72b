//! Program containers and source-text ingestion.
//!
//! A [`Program`] is an ordered list of instruction texts. Texts handed to
//! [`Program::new`] are kept byte-for-byte; [`Program::from_source`] reads a
//! source file format where each line holds one instruction and `;` or `#`
//! start a comment.

use std::sync::Arc;

use crate::{FaultReason, Instruction};

/// Immutable, cheaply clonable instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Program {
    lines: Arc<[Arc<str>]>,
}

/// One instruction line extracted from source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Instruction text with comments and surrounding whitespace removed.
    pub text: String,
    /// 1-indexed line number in the original source.
    pub original_line: usize,
}

impl Program {
    /// Builds a program from instruction texts, preserved verbatim.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            lines: lines.into_iter().map(|line| Arc::from(line.as_ref())).collect(),
        }
    }

    /// Builds a program from source text, dropping comments and blank lines.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        Self::new(extract_source_lines(source).into_iter().map(|line| line.text))
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true when the program has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Instruction text at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(AsRef::as_ref)
    }

    /// Iterates the instruction texts in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.lines.iter()
    }

    /// Decodes every instruction and returns the failures by address.
    ///
    /// Execution decodes lazily, so a program with failures is still loadable;
    /// the fault is raised only if the core reaches the bad instruction.
    #[must_use]
    pub fn decode_failures(&self) -> Vec<(usize, FaultReason)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(addr, text)| Instruction::decode(text).err().map(|e| (addr, e)))
            .collect()
    }
}

/// Extracts instruction lines from source text with their line numbers.
#[must_use]
pub fn extract_source_lines(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let code = line.find([';', '#']).map_or(line, |pos| &line[..pos]).trim();
            (!code.is_empty()).then(|| SourceLine {
                text: code.to_string(),
                original_line: idx + 1,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{extract_source_lines, Program, SourceLine};
    use crate::FaultCode;

    #[test]
    fn new_keeps_text_verbatim() {
        let program = Program::new(["MOV R0 10", "  HLT  "]);
        assert_eq!(program.len(), 2);
        assert_eq!(program.get(1), Some("  HLT  "));
        assert_eq!(program.get(2), None);
    }

    #[test]
    fn source_extraction_drops_comments_and_blank_lines() {
        let source = "; header\nMOV R0 10   ; move\n\n   # note\nHLT # stop\n";
        assert_eq!(
            extract_source_lines(source),
            vec![
                SourceLine {
                    text: "MOV R0 10".into(),
                    original_line: 2
                },
                SourceLine {
                    text: "HLT".into(),
                    original_line: 5
                },
            ]
        );
        assert_eq!(Program::from_source(source), Program::new(["MOV R0 10", "HLT"]));
    }

    #[test]
    fn decode_failures_report_addresses() {
        let program = Program::new(["MOV R0 1", "NOP", "MOV R9 1", "HLT"]);
        let failures = program.decode_failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, 1);
        assert_eq!(failures[0].1.code(), FaultCode::InvalidOpcode);
        assert_eq!(failures[1].0, 2);
        assert_eq!(failures[1].1.code(), FaultCode::InvalidOperand);
    }

    #[test]
    fn empty_source_yields_empty_program() {
        assert!(Program::from_source("\n; nothing\n").is_empty());
    }
}
