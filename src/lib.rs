//! # favis
//!
//! A small finite automaton toolkit.
//!
//! This library provides functionality to:
//! - Build an automaton over any hashable state label and symbol types from a list of
//!   transitions and its initial and final states
//! - Inspect its states, alphabet and transitions and tell whether it is deterministic
//! - Check whether a deterministic automaton accepts a sequence of symbols
//! - Read character automata from a plain three section text file
//! - Save and load automata as json, render them with Graphviz or visualize them in a window
//! - Drive all of the above from an interactive text menu

pub mod automaton;
pub mod fa;
pub mod menu;
pub mod reader;
pub mod visualizer;

// Re-export commonly used functions for convenience
pub use automaton::{construct_fa, load_fa, Automaton, AutomatonError};
pub use reader::{parse_fa_lines, read_fa_file};
pub use visualizer::visualize;
