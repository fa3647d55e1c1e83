/* Interactive text menu over a character automaton. Reads choices line by line from any buffered
 * reader and writes to any writer, so the same loop serves stdin/stdout and tests. */

use color_eyre::eyre::Result;
use log::debug;
use std::io::{BufRead, Write};

use crate::automaton::Automaton;
use crate::fa::FA;
use crate::reader::read_fa_file;
use crate::visualizer::visualize;

const MENU_TEXT: &str = "0. Exit\n\
                         1. Read a finite automaton from a file\n\
                         2. Display elements of the current automaton\n\
                         3. If the current automaton is deterministic, check if it accepts a string\n\
                         4. Save a Graphviz rendering of the current automaton\n\
                         5. Visualize the current automaton\n";

const DISPLAY_TEXT: &str = "Choose what to display: \n\
                            0. Initial states\n\
                            1. Final states\n\
                            2. All states\n\
                            3. Alphabet\n\
                            4. Transitions\n\
                            5. Whether or not the automaton is deterministic\n";

const NO_AUTOMATON: &str = "No automaton has been read from file.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Exit,
    ReadFile,
    Display,
    TestSequence,
    SaveGraph,
    Visualize,
}

impl MenuChoice {
    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(MenuChoice::Exit),
            1 => Some(MenuChoice::ReadFile),
            2 => Some(MenuChoice::Display),
            3 => Some(MenuChoice::TestSequence),
            4 => Some(MenuChoice::SaveGraph),
            5 => Some(MenuChoice::Visualize),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayChoice {
    InitialStates,
    FinalStates,
    AllStates,
    Alphabet,
    Transitions,
    Determinism,
}

impl DisplayChoice {
    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(DisplayChoice::InitialStates),
            1 => Some(DisplayChoice::FinalStates),
            2 => Some(DisplayChoice::AllStates),
            3 => Some(DisplayChoice::Alphabet),
            4 => Some(DisplayChoice::Transitions),
            5 => Some(DisplayChoice::Determinism),
            _ => None,
        }
    }
}

fn make_string<'a, I: IntoIterator<Item = &'a char>>(chars: I) -> String {
    chars.into_iter().collect()
}

pub struct Menu<R, W> {
    input: R,
    output: W,
    fa: Option<Automaton<char, char>>,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Menu {
            input,
            output,
            fa: None,
        }
    }

    /// Start the menu with an automaton already loaded
    pub fn with_automaton(mut self, fa: Automaton<char, char>) -> Self {
        self.fa = Some(fa);
        self
    }

    pub fn automaton(&self) -> Option<&Automaton<char, char>> {
        self.fa.as_ref()
    }

    pub fn into_output(self) -> W {
        self.output
    }

    // None once the input is exhausted
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.strip_suffix('\n').unwrap_or(&line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        Ok(Some(line.to_string()))
    }

    fn read_choice(&mut self) -> Result<Option<Option<usize>>> {
        let line = self.read_line()?;
        Ok(line.map(|line| line.trim().parse::<usize>().ok()))
    }

    /// Run the menu loop until the exit choice is made or the input ends
    pub fn run(&mut self) -> Result<()> {
        loop {
            write!(self.output, "{}", MENU_TEXT)?;
            self.output.flush()?;

            let choice = match self.read_choice()? {
                None => return Ok(()),
                Some(choice) => choice.and_then(MenuChoice::from_index),
            };

            let choice = match choice {
                Some(choice) => choice,
                None => {
                    writeln!(self.output, "Invalid choice.")?;
                    continue;
                }
            };

            debug!("Menu choice {:?}", choice);

            match choice {
                MenuChoice::Exit => return Ok(()),
                MenuChoice::ReadFile => self.read_file()?,
                MenuChoice::Display => self.display()?,
                MenuChoice::TestSequence => self.test_sequence()?,
                MenuChoice::SaveGraph => self.save_graph()?,
                MenuChoice::Visualize => self.visualize()?,
            }
        }
    }

    fn read_file(&mut self) -> Result<()> {
        write!(self.output, "Filename: ")?;
        self.output.flush()?;

        let file_name = match self.read_line()? {
            Some(file_name) => file_name,
            None => return Ok(()),
        };

        match read_fa_file(file_name.trim()) {
            Ok(fa) => {
                writeln!(
                    self.output,
                    "Read an automaton with {} states.",
                    fa.num_states()
                )?;
                self.fa = Some(fa);
            }
            Err(err) => writeln!(self.output, "{}", err)?,
        }
        Ok(())
    }

    fn display(&mut self) -> Result<()> {
        if self.fa.is_none() {
            writeln!(self.output, "{}", NO_AUTOMATON)?;
            return Ok(());
        }

        write!(self.output, "{}", DISPLAY_TEXT)?;
        self.output.flush()?;

        let choice = match self.read_choice()? {
            None => return Ok(()),
            Some(choice) => choice.and_then(DisplayChoice::from_index),
        };

        let (fa, output) = match (&self.fa, &mut self.output) {
            (Some(fa), output) => (fa, output),
            (None, _) => return Ok(()),
        };

        match choice {
            Some(DisplayChoice::InitialStates) => {
                writeln!(output, "Initial states: {}", make_string(&fa.initial_states()))?
            }
            Some(DisplayChoice::FinalStates) => {
                writeln!(output, "Final states: {}", make_string(&fa.final_states()))?
            }
            Some(DisplayChoice::AllStates) => {
                writeln!(output, "States: {}", make_string(fa.states()))?
            }
            Some(DisplayChoice::Alphabet) => {
                let mut alphabet: Vec<char> = fa.alphabet().iter().copied().collect();
                alphabet.sort();
                writeln!(output, "Alphabet: {}", make_string(&alphabet))?
            }
            Some(DisplayChoice::Transitions) => {
                writeln!(output, "Transitions: ")?;
                for (state, mut edges) in fa.transitions() {
                    writeln!(output, "{}", state)?;
                    edges.sort();
                    for (symbol, mut targets) in edges {
                        writeln!(output, " {}", symbol)?;
                        targets.sort();
                        for target in targets {
                            writeln!(output, "  {}", target)?;
                        }
                    }
                }
            }
            Some(DisplayChoice::Determinism) => {
                if fa.is_deterministic() {
                    writeln!(output, "The automaton is deterministic.")?
                } else {
                    writeln!(output, "The automaton is not deterministic.")?
                }
            }
            None => writeln!(output, "Invalid choice.")?,
        }
        Ok(())
    }

    fn test_sequence(&mut self) -> Result<()> {
        let deterministic = match &self.fa {
            Some(fa) => fa.is_deterministic(),
            None => {
                writeln!(self.output, "{}", NO_AUTOMATON)?;
                return Ok(());
            }
        };

        if !deterministic {
            writeln!(self.output, "The automaton is not deterministic.")?;
            return Ok(());
        }

        writeln!(self.output, "Enter sequence: ")?;
        self.output.flush()?;

        let sequence = match self.read_line()? {
            Some(sequence) => sequence,
            None => return Ok(()),
        };

        let result = match &self.fa {
            Some(fa) => fa.accepts(sequence.chars()),
            None => return Ok(()),
        };

        match result {
            Ok(true) => writeln!(self.output, "The automaton accepts this sequence.")?,
            Ok(false) => writeln!(self.output, "The automaton does not accept this sequence.")?,
            Err(err) => writeln!(self.output, "{}", err)?,
        }
        Ok(())
    }

    fn save_graph(&mut self) -> Result<()> {
        if self.fa.is_none() {
            writeln!(self.output, "{}", NO_AUTOMATON)?;
            return Ok(());
        }

        write!(self.output, "Output name: ")?;
        self.output.flush()?;

        let file_name = match self.read_line()? {
            Some(file_name) => file_name,
            None => return Ok(()),
        };

        if let Some(fa) = &self.fa {
            if let Err(err) = fa.show_fa(file_name.trim()) {
                writeln!(self.output, "{}", err)?;
            }
        }
        Ok(())
    }

    fn visualize(&mut self) -> Result<()> {
        match &self.fa {
            Some(fa) => {
                if let Err(err) = visualize(fa) {
                    writeln!(self.output, "{}", err)?;
                }
            }
            None => writeln!(self.output, "{}", NO_AUTOMATON)?,
        }
        Ok(())
    }
}
