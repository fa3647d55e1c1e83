/* Build a finite automaton from a flat list of labelled transitions and decide whether a
 * deterministic automaton accepts a sequence of symbols. Every distinct state label gets a dense
 * id in first-seen order: initial labels, then final labels, then transition endpoints (source
 * before destination). */

use bitvec::prelude::*;
use color_eyre::eyre::{Report, Result};
use log::{debug, warn};
use petgraph::dot::Dot;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::prelude::StableGraph;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display};
use std::fs::File;
use std::hash::Hash;
use std::io::{BufReader, Write};
use std::process::Command;

use crate::fa::FA;

#[derive(Debug, PartialEq, Eq)]
pub enum AutomatonError {
    InvalidOperation(String),
    GraphvizError(String),
}

impl fmt::Display for AutomatonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomatonError::InvalidOperation(reason) => {
                write!(f, "Error: Invalid operation: {}", reason)
            }
            AutomatonError::GraphvizError(reason) => {
                write!(f, "Error: Graphviz rendering failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for AutomatonError {}

/// Outgoing transitions of a single state. A symbol maps to a set of destinations because a
/// non-deterministic automaton may move to several states on the same symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatonState<S: Eq + Hash> {
    transitions: HashMap<S, HashSet<usize>>,
}

impl<S: Eq + Hash> AutomatonState<S> {
    fn new() -> Self {
        AutomatonState {
            transitions: HashMap::new(),
        }
    }

    // Returns true if the symbol now leads to more than one state
    fn add_transition(&mut self, symbol: S, to: usize) -> bool {
        let targets = self.transitions.entry(symbol).or_default();
        targets.insert(to);
        targets.len() > 1
    }

    /// Get the symbol to destination ids mapping of this state
    pub fn get_transitions(&self) -> &HashMap<S, HashSet<usize>> {
        &self.transitions
    }
}

/// Label to id lookup, only alive while an automaton is being built.
struct StateTable<L> {
    ids: HashMap<L, usize>,
    labels: Vec<L>,
}

impl<L: Eq + Hash + Clone> StateTable<L> {
    fn new() -> Self {
        StateTable {
            ids: HashMap::new(),
            labels: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn intern(&mut self, label: L) -> usize {
        if let Some(id) = self.ids.get(&label) {
            return *id;
        }
        let id = self.labels.len();
        self.ids.insert(label.clone(), id);
        self.labels.push(label);
        id
    }
}

/// The flat form of an automaton: what it was built from. Used for persistence, loading a
/// definition always goes back through the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatonDefinition<L, S> {
    pub initial_states: Vec<L>,
    pub transitions: Vec<(L, S, L)>,
    pub final_states: Vec<L>,
}

/// An immutable finite automaton over state labels `L` and transition symbols `S`.
#[derive(Debug, Clone)]
pub struct Automaton<L, S: Eq + Hash> {
    labels: Vec<L>,
    states: Vec<AutomatonState<S>>,
    start_states: BitVec<u8>,
    accept_states: BitVec<u8>,
    alphabet: HashSet<S>,
    deterministic: bool,
}

fn id_set(ids: &[usize], num_states: usize) -> BitVec<u8> {
    let mut set: BitVec<u8> = BitVec::repeat(false, num_states);
    for id in ids {
        set.set(*id, true);
    }
    set
}

impl<L, S> Automaton<L, S>
where
    L: Eq + Hash + Clone,
    S: Eq + Hash + Clone,
{
    /// Build an automaton from (source, symbol, destination) triples and the initial and final
    /// state labels. Repeated labels in the initial or final lists are counted once.
    pub fn new<T, I, F>(transitions: T, initial_states: I, final_states: F) -> Self
    where
        T: IntoIterator<Item = (L, S, L)>,
        I: IntoIterator<Item = L>,
        F: IntoIterator<Item = L>,
    {
        let mut table = StateTable::new();

        let initial_ids: Vec<usize> = initial_states
            .into_iter()
            .map(|label| table.intern(label))
            .collect();

        // Initial labels are interned first, so the distinct ones are exactly ids 0..len
        let mut deterministic = table.len() == 1;

        let final_ids: Vec<usize> = final_states
            .into_iter()
            .map(|label| table.intern(label))
            .collect();

        let mut states: Vec<AutomatonState<S>> = Vec::new();
        let mut alphabet: HashSet<S> = HashSet::new();

        for (source, symbol, target) in transitions {
            let from = table.intern(source);
            let to = table.intern(target);

            states.resize_with(table.len(), AutomatonState::new);
            alphabet.insert(symbol.clone());

            if states[from].add_transition(symbol, to) && deterministic {
                debug!("State {} has several destinations on one symbol", from);
                deterministic = false;
            }
        }

        let num_states = table.len();
        states.resize_with(num_states, AutomatonState::new);

        debug!(
            "Built automaton with {} states, {} symbols, deterministic: {}",
            num_states,
            alphabet.len(),
            deterministic
        );

        Automaton {
            labels: table.labels,
            states,
            start_states: id_set(&initial_ids, num_states),
            accept_states: id_set(&final_ids, num_states),
            alphabet,
            deterministic,
        }
    }

    /// All state labels, ordered by state id
    pub fn states(&self) -> &[L] {
        &self.labels
    }

    pub fn initial_states(&self) -> Vec<L> {
        self.resolve(&self.start_states)
    }

    pub fn final_states(&self) -> Vec<L> {
        self.resolve(&self.accept_states)
    }

    fn resolve(&self, ids: &BitSlice<u8>) -> Vec<L> {
        ids.iter_ones().map(|id| self.labels[id].clone()).collect()
    }

    pub fn alphabet(&self) -> &HashSet<S> {
        &self.alphabet
    }

    /// For every state in id order, the outgoing transitions with destinations given as labels
    pub fn transitions(&self) -> Vec<(L, Vec<(S, Vec<L>)>)> {
        self.labels
            .iter()
            .zip(self.states.iter())
            .map(|(label, state)| {
                let edges = state
                    .transitions
                    .iter()
                    .map(|(symbol, targets)| {
                        let targets = targets.iter().map(|id| self.labels[*id].clone()).collect();
                        (symbol.clone(), targets)
                    })
                    .collect();
                (label.clone(), edges)
            })
            .collect()
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn num_states(&self) -> usize {
        self.labels.len()
    }

    /// Returns the id assigned to the label, if the label belongs to this automaton
    pub fn state_id(&self, label: &L) -> Option<usize> {
        self.labels.iter().position(|known| known == label)
    }

    pub fn state_label(&self, id: usize) -> Option<&L> {
        self.labels.get(id)
    }

    /// Returns a reference to the state whose id is provided
    pub fn get_state(&self, id: usize) -> Option<&AutomatonState<S>> {
        self.states.get(id)
    }

    /// Destination ids reachable from state `id` on `symbol`
    pub fn destinations(&self, id: usize, symbol: &S) -> Option<&HashSet<usize>> {
        self.states.get(id)?.transitions.get(symbol)
    }

    /// Walk the input from the initial state and report whether it ends in a final state. The
    /// walk stops at the first symbol with no outgoing transition. Only defined for deterministic
    /// automata, any other automaton yields `AutomatonError::InvalidOperation`.
    pub fn accepts<I>(&self, input: I) -> Result<bool, AutomatonError>
    where
        I: IntoIterator,
        I::Item: Borrow<S>,
    {
        if !self.deterministic {
            return Err(AutomatonError::InvalidOperation(
                "This finite automaton is not deterministic!".to_string(),
            ));
        }

        let mut current_state = match self.start_states.first_one() {
            Some(state) => state,
            None => {
                return Err(AutomatonError::InvalidOperation(
                    "This finite automaton has no initial state!".to_string(),
                ))
            }
        };

        for symbol in input {
            let symbol: &S = symbol.borrow();
            let next_state = self
                .destinations(current_state, symbol)
                .and_then(|targets| targets.iter().next());

            current_state = match next_state {
                Some(next_state) => *next_state,
                None => return Ok(false),
            };
        }

        Ok(self.accept_states[current_state])
    }

    /// Flatten the automaton back into the triples and label lists it can be rebuilt from
    pub fn definition(&self) -> AutomatonDefinition<L, S> {
        let mut transitions = Vec::new();

        for (source, edges) in self.transitions() {
            for (symbol, targets) in edges {
                for target in targets {
                    transitions.push((source.clone(), symbol.clone(), target));
                }
            }
        }

        AutomatonDefinition {
            initial_states: self.initial_states(),
            transitions,
            final_states: self.final_states(),
        }
    }
}

impl<L, S> From<AutomatonDefinition<L, S>> for Automaton<L, S>
where
    L: Eq + Hash + Clone,
    S: Eq + Hash + Clone,
{
    fn from(definition: AutomatonDefinition<L, S>) -> Self {
        Automaton::new(
            definition.transitions,
            definition.initial_states,
            definition.final_states,
        )
    }
}

impl<L, S> Automaton<L, S>
where
    L: Eq + Hash + Clone + Serialize,
    S: Eq + Hash + Clone + Serialize,
{
    /// Save the definition of the automaton as a json file
    pub fn save_fa(&self, file_name: &str) -> Result<()> {
        let json_string = serde_json::to_string_pretty(&self.definition())?;

        let mut file = File::create(file_name)?;

        writeln!(file, "{}", json_string)?;
        Ok(())
    }
}

/// Load an automaton from a json file written by `save_fa`
pub fn load_fa<L, S>(file_name: &str) -> Result<Automaton<L, S>>
where
    L: Eq + Hash + Clone + DeserializeOwned,
    S: Eq + Hash + Clone + DeserializeOwned,
{
    let file = File::open(file_name)?;

    let buf_reader = BufReader::new(file);

    let definition: AutomatonDefinition<L, S> = serde_json::from_reader(buf_reader)?;
    Ok(Automaton::from(definition))
}

/// Construct an automaton from its transitions and its initial and final states
pub fn construct_fa<L, S, T, I, F>(
    transitions: T,
    initial_states: I,
    final_states: F,
) -> Automaton<L, S>
where
    L: Eq + Hash + Clone,
    S: Eq + Hash + Clone,
    T: IntoIterator<Item = (L, S, L)>,
    I: IntoIterator<Item = L>,
    F: IntoIterator<Item = L>,
{
    Automaton::new(transitions, initial_states, final_states)
}

impl<L, S> FA for Automaton<L, S>
where
    L: Eq + Hash + Clone + Display,
    S: Eq + Hash + Clone + Display,
{
    fn show_fa(&self, filename: &str) -> Result<()> {
        let mut stable_graph: StableGraph<String, String> = StableGraph::new();

        let num_states = self.get_num_states();

        let mut edge_map: HashMap<(NodeIndex, NodeIndex), EdgeIndex> = HashMap::new();

        for state_idx in 0..num_states {
            let label = self.get_state_label(state_idx);
            let node_label = match (self.start_states[state_idx], self.accept_states[state_idx]) {
                (true, true) => format!("Start, Accept\n{}", label),
                (true, false) => format!("Start\n{}", label),
                (false, true) => format!("Accept\n{}", label),
                (false, false) => label,
            };
            stable_graph.add_node(node_label);
        }

        // Parallel edges are merged into a single edge with a comma separated label

        for state_idx in 0..num_states {
            for (symbol, target) in self.get_state_transitions(state_idx) {
                let key = (NodeIndex::new(state_idx), NodeIndex::new(target));

                match edge_map.get(&key).copied() {
                    Some(edge_idx) => {
                        let new_label = format!("{}, {}", stable_graph[edge_idx], symbol);
                        stable_graph[edge_idx] = new_label;
                    }
                    None => {
                        let edge_idx = stable_graph.add_edge(key.0, key.1, symbol);
                        edge_map.insert(key, edge_idx);
                    }
                }
            }
        }

        let dot = Dot::new(&stable_graph);

        let dot_filename = format!("{}.dot", filename);
        let mut dot_file = File::create(&dot_filename)?;

        dot_file.write_all(dot.to_string().as_bytes())?;

        let output = Command::new("dot")
            .args(["-Tjpg", &dot_filename, "-o", &format!("{}.jpg", filename)])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                println!("Automaton vizualization saved as {}.jpg", filename);
                Ok(())
            }
            Ok(output) => {
                let reason = String::from_utf8_lossy(&output.stderr).to_string();
                warn!("Graphviz exited with {}: {}", output.status, reason);
                Err(Report::new(AutomatonError::GraphvizError(reason)))
            }
            Err(error) => {
                warn!("Failed to execute Graphviz, only {} was written", dot_filename);
                Err(Report::new(AutomatonError::GraphvizError(error.to_string())))
            }
        }
    }

    fn get_num_states(&self) -> usize {
        self.labels.len()
    }

    fn get_start_states(&self) -> &BitVec<u8> {
        &self.start_states
    }

    fn get_acceptor_states(&self) -> &BitVec<u8> {
        &self.accept_states
    }

    fn get_state_label(&self, state_id: usize) -> String {
        self.labels[state_id].to_string()
    }

    fn get_state_transitions(&self, state_id: usize) -> Vec<(String, usize)> {
        let mut transition_list: Vec<(String, usize)> = Vec::new();
        for (symbol, targets) in self.states[state_id].transitions.iter() {
            for target in targets {
                transition_list.push((symbol.to_string(), *target));
            }
        }
        transition_list.sort();
        transition_list
    }
}

#[cfg(test)]
mod automaton_tests {
    use super::{load_fa, Automaton, AutomatonDefinition, AutomatonError};
    use crate::fa::FA;
    use std::cell::Cell;
    use std::collections::HashSet;

    fn scenario_a() -> Automaton<char, char> {
        Automaton::new(vec![('a', '0', 'b'), ('b', '1', 'a')], vec!['a'], vec!['b'])
    }

    fn triples(fa: &Automaton<char, char>) -> HashSet<(char, char, char)> {
        let mut result = HashSet::new();
        for (source, edges) in fa.transitions() {
            for (symbol, targets) in edges {
                for target in targets {
                    result.insert((source, symbol, target));
                }
            }
        }
        result
    }

    #[test]
    fn test_empty_automaton() {
        let fa: Automaton<char, char> = Automaton::new(vec![], vec![], vec![]);

        assert!(fa.states().is_empty());
        assert!(fa.alphabet().is_empty());
        assert!(fa.initial_states().is_empty());
        assert!(fa.final_states().is_empty());
        assert!(fa.transitions().is_empty());
        // Zero initial states is not exactly one
        assert!(!fa.is_deterministic());
    }

    #[test]
    fn test_empty_automaton_accepts_fails() {
        let fa: Automaton<char, char> = Automaton::new(vec![], vec![], vec![]);

        let result = fa.accepts("".chars());
        assert!(matches!(result, Err(AutomatonError::InvalidOperation(_))));
    }

    #[test]
    fn test_state_id_assignment_order() {
        let fa = Automaton::new(
            vec![('x', '0', 'y'), ('q', '1', 'z'), ('z', '1', 'a')],
            vec!['a'],
            vec!['z', 'b'],
        );

        assert_eq!(fa.states(), &['a', 'z', 'b', 'x', 'y', 'q']);
        assert_eq!(fa.state_id(&'q'), Some(5));
        assert_eq!(fa.state_id(&'w'), None);
        assert_eq!(fa.state_label(3), Some(&'x'));
        assert_eq!(fa.state_label(6), None);
    }

    #[test]
    fn test_labels_are_unique() {
        let fa = Automaton::new(
            vec![('a', '0', 'a'), ('a', '1', 'b'), ('b', '0', 'a')],
            vec!['a', 'a'],
            vec!['a', 'b', 'b'],
        );

        assert_eq!(fa.num_states(), 2);
        assert_eq!(fa.initial_states(), vec!['a']);
        assert_eq!(fa.final_states(), vec!['a', 'b']);
        // Duplicate initial labels still count as a single initial state
        assert!(fa.is_deterministic());
    }

    #[test]
    fn test_alphabet() {
        let fa = Automaton::new(
            vec![('a', '0', 'b'), ('b', '1', 'a'), ('b', '0', 'b')],
            vec!['a'],
            vec!['b'],
        );

        let expected: HashSet<char> = ['0', '1'].into_iter().collect();
        assert_eq!(fa.alphabet(), &expected);
    }

    #[test]
    fn test_scenario_a_acceptance() {
        let fa = scenario_a();

        assert!(fa.is_deterministic());
        assert_eq!(fa.accepts("0".chars()), Ok(true));
        assert_eq!(fa.accepts("01".chars()), Ok(false));
        assert_eq!(fa.accepts("010".chars()), Ok(true));
        assert_eq!(fa.accepts("0101".chars()), Ok(false));
        assert_eq!(fa.accepts("00".chars()), Ok(false));
        assert_eq!(fa.accepts("1".chars()), Ok(false));
    }

    #[test]
    fn test_accepts_slices_and_references() {
        let fa = scenario_a();

        assert_eq!(fa.accepts(['0', '1', '0']), Ok(true));
        assert_eq!(fa.accepts(&['0', '1']), Ok(false));
    }

    #[test]
    fn test_empty_input() {
        let fa = scenario_a();
        assert_eq!(fa.accepts("".chars()), Ok(false));

        let fa = Automaton::new(vec![('a', '0', 'b')], vec!['a'], vec!['a']);
        assert_eq!(fa.accepts("".chars()), Ok(true));
    }

    #[test]
    fn test_state_without_transitions() {
        // b has no outgoing transitions at all
        let fa = Automaton::new(vec![('a', '0', 'b')], vec!['a'], vec!['b']);

        assert!(fa.get_state(1).is_some_and(|state| state.get_transitions().is_empty()));
        assert_eq!(fa.accepts("0".chars()), Ok(true));
        assert_eq!(fa.accepts("00".chars()), Ok(false));
    }

    #[test]
    fn test_accepts_short_circuits() {
        let fa = scenario_a();
        let consumed = Cell::new(0);

        let input = "0x1010".chars().inspect(|_| consumed.set(consumed.get() + 1));
        assert_eq!(fa.accepts(input), Ok(false));

        // '0' and the unmatched 'x' are read, nothing after it
        assert_eq!(consumed.get(), 2);
    }

    #[test]
    fn test_scenario_b_two_initial_states() {
        let fa = Automaton::new(vec![('a', '0', 'b'), ('c', '0', 'b')], vec!['a', 'c'], vec!['b']);

        assert!(!fa.is_deterministic());

        for input in ["", "0", "00"] {
            let result = fa.accepts(input.chars());
            assert!(matches!(result, Err(AutomatonError::InvalidOperation(_))));
        }
    }

    #[test]
    fn test_scenario_c_multiple_destinations() {
        let fa = Automaton::new(vec![('a', 'x', 'b'), ('a', 'x', 'c')], vec!['a'], vec!['c']);

        assert!(!fa.is_deterministic());

        let destinations = fa.destinations(0, &'x');
        assert_eq!(destinations.map(|targets| targets.len()), Some(2));

        let err = fa.accepts("x".chars()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Invalid operation: This finite automaton is not deterministic!"
        );
    }

    #[test]
    fn test_repeated_transition_stays_deterministic() {
        let fa = Automaton::new(vec![('a', 'x', 'b'), ('a', 'x', 'b')], vec!['a'], vec!['b']);

        assert!(fa.is_deterministic());
        assert_eq!(fa.accepts("x".chars()), Ok(true));
    }

    #[test]
    fn test_non_determinism_is_not_reset() {
        let fa = Automaton::new(
            vec![('a', 'x', 'b'), ('a', 'x', 'c'), ('b', 'y', 'c'), ('c', 'y', 'a')],
            vec!['a'],
            vec!['c'],
        );

        assert!(!fa.is_deterministic());
    }

    #[test]
    fn test_transitions_round_trip() {
        let supplied = vec![
            ('a', '0', 'b'),
            ('b', '1', 'a'),
            ('a', '0', 'c'),
            ('c', '1', 'c'),
            ('a', '0', 'b'),
        ];
        let fa = Automaton::new(supplied.clone(), vec!['a'], vec!['c']);

        let expected: HashSet<(char, char, char)> = supplied.into_iter().collect();
        assert_eq!(triples(&fa), expected);

        let sources: Vec<char> = fa.transitions().into_iter().map(|(state, _)| state).collect();
        assert_eq!(sources, fa.states());
    }

    #[test]
    fn test_generic_labels() {
        let fa: Automaton<String, u8> = Automaton::new(
            vec![
                ("even".to_string(), 1, "odd".to_string()),
                ("odd".to_string(), 1, "even".to_string()),
                ("even".to_string(), 0, "even".to_string()),
                ("odd".to_string(), 0, "odd".to_string()),
            ],
            vec!["even".to_string()],
            vec!["even".to_string()],
        );

        assert!(fa.is_deterministic());
        assert_eq!(fa.accepts([1u8, 0, 1]), Ok(true));
        assert_eq!(fa.accepts([1u8, 0, 0]), Ok(false));
    }

    #[test]
    fn test_definition_rebuilds_equivalent_automaton() {
        let fa = scenario_a();
        let definition = fa.definition();

        assert_eq!(definition.initial_states, vec!['a']);
        assert_eq!(definition.final_states, vec!['b']);

        let json = serde_json::to_string(&definition).unwrap();
        let parsed: AutomatonDefinition<char, char> = serde_json::from_str(&json).unwrap();
        let rebuilt = Automaton::from(parsed);

        assert_eq!(triples(&rebuilt), triples(&fa));
        assert_eq!(rebuilt.is_deterministic(), fa.is_deterministic());
        assert_eq!(rebuilt.accepts("010".chars()), Ok(true));
    }

    #[test]
    fn test_save_load_fa() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario_a.json");
        let path = path.to_str().unwrap();

        let fa = scenario_a();
        assert!(fa.save_fa(path).is_ok());

        let loaded = load_fa::<char, char>(path);
        assert!(loaded.is_ok());

        let loaded = loaded.unwrap();
        assert_eq!(loaded.states(), fa.states());
        assert_eq!(triples(&loaded), triples(&fa));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_fa::<char, char>("test_data/does_not_exist.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_fa_view() {
        let fa = Automaton::new(
            vec![('a', 'x', 'b'), ('a', 'x', 'c'), ('a', 'y', 'b')],
            vec!['a'],
            vec!['c'],
        );

        assert_eq!(fa.get_num_states(), 3);
        assert_eq!(fa.get_start_states().iter_ones().collect::<Vec<_>>(), vec![0]);
        assert_eq!(fa.get_acceptor_states().iter_ones().collect::<Vec<_>>(), vec![1]);
        assert_eq!(fa.get_state_label(2), "b");
        assert_eq!(
            fa.get_state_transitions(0),
            vec![("x".to_string(), 1), ("x".to_string(), 2), ("y".to_string(), 2)]
        );
        assert!(fa.get_state_transitions(1).is_empty());
    }

    #[test]
    fn test_show_fa_writes_dot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario_a");
        let path = path.to_str().unwrap();

        // Rendering the image depends on Graphviz being installed, the dot file does not
        let _ = scenario_a().show_fa(path);

        let dot = std::fs::read_to_string(format!("{}.dot", path)).unwrap();
        assert!(dot.contains("digraph"));
        assert!(dot.contains("Start"));
        assert!(dot.contains("Accept"));
    }
}
