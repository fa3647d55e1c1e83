use clap::{Arg, ArgAction, Command};
use color_eyre::eyre::{eyre, Result};
use favis::fa::FA;
use favis::menu::Menu;
use favis::{load_fa, read_fa_file, visualize, Automaton};
use log::info;
use std::io;
use std::path::PathBuf;

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let args = Command::new("favis")
                        .version("0.1.0")
                        .about("Load a finite automaton, inspect it and test which sequences it accepts")
                        .arg(
                            Arg::new("file")
                                .short('f')
                                .long("file")
                                .help("Automaton file with one initial state per line, then one transition (source, symbol, destination) per line, then one final state per line")
                                .value_name("AUTOMATON FILE")
                                .value_parser(clap::value_parser!(PathBuf))
                                .conflicts_with("json")
                        )
                        .arg(
                            Arg::new("json")
                                .short('j')
                                .long("json")
                                .help("Automaton definition previously saved as json")
                                .value_name("JSON FILE")
                                .value_parser(clap::value_parser!(PathBuf))
                        )
                        .arg(
                            Arg::new("test")
                                .short('t')
                                .long("test")
                                .help("Check whether the automaton accepts this sequence. May be given several times. The automaton must be deterministic")
                                .value_name("SEQUENCE")
                                .action(ArgAction::Append)
                                .allow_hyphen_values(true)
                                .value_parser(clap::value_parser!(String))
                        )
                        .arg(
                            Arg::new("save-json")
                                .short('o')
                                .long("save-json")
                                .help("Save the automaton definition as json")
                                .value_name("JSON FILE")
                                .value_parser(clap::value_parser!(PathBuf))
                        )
                        .arg(
                            Arg::new("save-graph")
                                .short('g')
                                .long("save-graph")
                                .help("Save a Graphviz rendering of the automaton as NAME.dot and NAME.jpg")
                                .value_name("NAME")
                                .value_parser(clap::value_parser!(String))
                        )
                        .arg(
                            Arg::new("visualize")
                                .short('v')
                                .long("visualize")
                                .help("Visualize the automaton inside an interactive window that allows for zooming, panning and clicking of elements")
                                .action(ArgAction::SetTrue)
                        )
                        .get_matches();

    let fa: Option<Automaton<char, char>> = if let Some(path) = args.get_one::<PathBuf>("file") {
        Some(read_fa_file(&path.to_string_lossy())?)
    } else if let Some(path) = args.get_one::<PathBuf>("json") {
        Some(load_fa(&path.to_string_lossy())?)
    } else {
        None
    };

    let sequences: Vec<String> = args
        .get_many::<String>("test")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let save_json = args.get_one::<PathBuf>("save-json");

    let save_graph = args.get_one::<String>("save-graph");

    let visualize_fa = args.get_flag("visualize");

    if sequences.is_empty() && save_json.is_none() && save_graph.is_none() && !visualize_fa {
        let mut menu = Menu::new(io::stdin().lock(), io::stdout());
        if let Some(fa) = fa {
            menu = menu.with_automaton(fa);
        }
        return menu.run();
    }

    let fa = match fa {
        Some(fa) => fa,
        None => {
            return Err(eyre!(
                "Error: Either an automaton file or a json definition should be provided!"
            ))
        }
    };

    info!(
        "Loaded automaton with {} states, deterministic: {}",
        fa.num_states(),
        fa.is_deterministic()
    );

    for sequence in sequences {
        let verdict = if fa.accepts(sequence.chars())? {
            "accepted"
        } else {
            "rejected"
        };
        println!("{:?}: {}", sequence, verdict);
    }

    if let Some(path) = save_json {
        fa.save_fa(&path.to_string_lossy())?;
        println!("Automaton definition saved as {}", path.display());
    }

    if let Some(name) = save_graph {
        fa.show_fa(name)?;
    }

    if visualize_fa {
        visualize(&fa)?;
    }

    Ok(())
}
