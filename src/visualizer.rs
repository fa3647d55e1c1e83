use std::collections::HashMap;

use color_eyre::eyre::{eyre, Result};
use eframe::{run_native, App, CreationContext, NativeOptions};
use egui::Color32;
use egui_graphs::{
    DefaultGraphView, Graph, SettingsInteraction, SettingsNavigation, SettingsStyle,
};
use petgraph::{graph::NodeIndex, prelude::StableGraph};

use crate::fa::FA;

struct Visualizer {
    graph: Graph,
}

impl Visualizer {
    fn new(_: &CreationContext<'_>, graph: Graph) -> Self {
        Visualizer { graph }
    }
}

impl App for Visualizer {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let navigation_settings = &SettingsNavigation::new()
                .with_zoom_and_pan_enabled(true)
                .with_fit_to_screen_enabled(true);
            let interactive_settings = &SettingsInteraction::new()
                .with_dragging_enabled(true)
                .with_node_clicking_enabled(true)
                .with_node_selection_enabled(true)
                .with_edge_clicking_enabled(true)
                .with_edge_selection_enabled(true);
            let style_settings = &SettingsStyle::default().with_labels_always(true);
            ui.add(
                &mut DefaultGraphView::new(&mut self.graph)
                    .with_styles(style_settings)
                    .with_interactions(interactive_settings)
                    .with_navigations(navigation_settings),
            );
        });
    }
}

/// Symbols of parallel edges joined into one label per (source, target) pair
fn merged_edge_labels<T: FA>(fa: &T) -> Vec<((usize, usize), String)> {
    let mut edge_labels: HashMap<(usize, usize), String> = HashMap::new();

    for state_idx in 0..fa.get_num_states() {
        for (symbol, target) in fa.get_state_transitions(state_idx) {
            edge_labels
                .entry((state_idx, target))
                .and_modify(|label| {
                    label.push_str(", ");
                    label.push_str(&symbol);
                })
                .or_insert(symbol);
        }
    }

    let mut edge_labels: Vec<_> = edge_labels.into_iter().collect();
    edge_labels.sort();
    edge_labels
}

fn generate_stable_graph<T: FA>(fa: &T) -> Result<Graph> {
    let mut stable_graph = StableGraph::new();

    let num_states = fa.get_num_states();

    let start_node_color = Color32::from_rgb(20, 67, 130);
    let accept_node_color = Color32::from_rgb(20, 130, 90);
    let start_accept_node_color = Color32::from_rgb(130, 110, 20);

    for _state_idx in 0..num_states {
        stable_graph.add_node(());
    }

    let edge_labels = merged_edge_labels(fa);

    let mut edge_indices = Vec::with_capacity(edge_labels.len());
    for ((source, target), _) in edge_labels.iter() {
        let edge_idx = stable_graph.add_edge(NodeIndex::new(*source), NodeIndex::new(*target), ());
        edge_indices.push(edge_idx);
    }

    let mut graph = Graph::from(&stable_graph);

    let start_states = fa.get_start_states();
    let accept_states = fa.get_acceptor_states();

    for state_idx in 0..num_states {
        let node = graph
            .node_mut(NodeIndex::new(state_idx))
            .ok_or_else(|| eyre!("Missing node for state {}", state_idx))?;

        node.set_label(fa.get_state_label(state_idx));

        match (start_states[state_idx], accept_states[state_idx]) {
            (true, true) => {
                node.set_color(start_accept_node_color);
            }
            (true, false) => {
                node.set_color(start_node_color);
            }
            (false, true) => {
                node.set_color(accept_node_color);
            }
            (false, false) => {}
        }
    }

    for (edge_idx, (_, label)) in edge_indices.into_iter().zip(edge_labels) {
        let edge = graph
            .edge_mut(edge_idx)
            .ok_or_else(|| eyre!("Missing edge for label {}", label))?;
        edge.set_label(label);
    }

    Ok(graph)
}

/// Visualizes the finite automaton provided in an interactive window. Start states are blue,
/// accept states green and states that are both yellow.
pub fn visualize<T: FA>(fa: &T) -> Result<()> {
    let graph = generate_stable_graph(fa)?;
    run_native(
        "finite automata visualizer",
        NativeOptions::default(),
        Box::new(|cc| Ok(Box::new(Visualizer::new(cc, graph)))),
    )
    .map_err(|err| eyre!("Failed to open the visualizer window: {}", err))
}
