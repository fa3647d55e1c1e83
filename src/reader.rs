/* Reader for the character automaton file format. A file holds three sections in order: one line
 * per initial state, one line per transition (source, symbol, destination), one line per final
 * state. Sections are told apart by line length only, blank lines are skipped anywhere. */

use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::automaton::Automaton;

#[derive(Debug)]
pub enum ReaderError {
    FileOpenError(String),
    FileReadError(String),
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::FileOpenError(err_line) => write!(f, "{}", err_line),
            ReaderError::FileReadError(err_line) => write!(f, "{}", err_line),
        }
    }
}

impl std::error::Error for ReaderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    InitialStates,
    Transitions,
    FinalStates,
}

/// Build a character automaton from the lines of an automaton file. A line that does not fit the
/// current section moves on to the next section and is read again under that section's rule.
pub fn parse_fa_lines<I, T>(lines: I) -> Automaton<char, char>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut section = Section::InitialStates;

    let mut initial_states: Vec<char> = Vec::new();
    let mut transitions: Vec<(char, char, char)> = Vec::new();
    let mut final_states: Vec<char> = Vec::new();

    for (line_number, line) in lines.into_iter().enumerate() {
        let line: Vec<char> = line.as_ref().chars().collect();

        if line.is_empty() {
            continue;
        }

        if section == Section::InitialStates {
            if line.len() == 1 {
                initial_states.push(line[0]);
                continue;
            }
            debug!("Transitions start at line {}", line_number + 1);
            section = Section::Transitions;
        }

        if section == Section::Transitions {
            if line.len() >= 3 {
                if line.len() > 3 {
                    warn!(
                        "Ignoring trailing characters of transition on line {}",
                        line_number + 1
                    );
                }
                transitions.push((line[0], line[1], line[2]));
                continue;
            }
            debug!("Final states start at line {}", line_number + 1);
            section = Section::FinalStates;
        }

        // Only the first character names a final state
        if line.len() > 1 {
            warn!(
                "Ignoring trailing characters of final state on line {}",
                line_number + 1
            );
        }
        final_states.push(line[0]);
    }

    Automaton::new(transitions, initial_states, final_states)
}

/// Read a character automaton from a file in the three section format
pub fn read_fa_file(file_path: &str) -> Result<Automaton<char, char>, ReaderError> {
    let file_path = PathBuf::from(file_path);

    let file = match File::open(&file_path) {
        Ok(file) => file,
        Err(error) => {
            let err_line = format!(
                "Error: Failed to open the automaton file {}: {}",
                file_path.display(),
                error
            );
            return Err(ReaderError::FileOpenError(err_line));
        }
    };
    let reader = BufReader::new(file);

    let mut lines: Vec<String> = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                let err_line = format!(
                    "Error: Failed to read line number {} in automaton file {}",
                    line_number + 1,
                    error
                );
                return Err(ReaderError::FileReadError(err_line));
            }
        };
        lines.push(line);
    }

    debug!("Read {} lines from {}", lines.len(), file_path.display());

    Ok(parse_fa_lines(lines))
}
