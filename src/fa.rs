use bitvec::prelude::BitVec;
use color_eyre::eyre::Result;

/// Read-only view of a finite automaton shared by the graph export and the visualizer.
pub trait FA {
    fn show_fa(&self, file_name: &str) -> Result<()>;
    fn get_num_states(&self) -> usize;
    fn get_start_states(&self) -> &BitVec<u8>;
    fn get_acceptor_states(&self) -> &BitVec<u8>;
    /// Printable label of the state with the given id
    fn get_state_label(&self, state_id: usize) -> String;
    /// Outgoing edges of a state as (printable symbol, destination id) pairs
    fn get_state_transitions(&self, state_id: usize) -> Vec<(String, usize)>;
}
