use anyhow::{anyhow, Result};

use rrsim_core::{place_train, run, step, update_all_signals, End, Switch, Topology};

use crate::config::CliConfig;
use crate::terminal::Terminal;

/// Session state threaded through the menu loop: the live topology plus
/// whatever path it was last saved to or loaded from.
pub struct Session {
    pub topology: Topology,
    pub config: CliConfig,
    pub network_path: Option<String>,
}

impl Session {
    pub fn new(config: CliConfig) -> Self {
        Self {
            topology: Topology::new(),
            network_path: config.default_network_path.clone(),
            config,
        }
    }

    /// Dispatch one command line. Errors are reported to the terminal and
    /// never propagate past this call — a failed command leaves the menu
    /// loop running, per the spec's user-visible failure behaviour.
    pub fn dispatch(&mut self, line: &str, term: &Terminal) -> Result<()> {
        let mut words = line.split_whitespace();
        let command = match words.next() {
            Some(c) => c,
            None => return Ok(()),
        };
        let args: Vec<&str> = words.collect();

        let result = match command {
            "help" => term.print_help(),
            "add-segment" => self.add_segment(&args, term),
            "connect" => self.connect(&args, term),
            "signal" => self.signal(&args, term),
            "signal-junctions" => self.signal_junctions(term),
            "toggle" => self.toggle(&args, term),
            "list" => term.print_segments(&self.topology),
            "junctions" => term.print_junctions(&self.topology),
            "show" => term.print_connections(&self.topology),
            "train" => self.train(&args, term),
            "step" => self.step(term),
            "run" => self.run(&args, term),
            "save" => self.save(&args, term),
            "load" => self.load(&args, term),
            other => term.print_error("command", &format!("unknown command '{other}'")),
        };
        result
    }

    fn add_segment(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let name = args.first().map(|s| s.to_string());
        match self.topology.create_segment(name) {
            Ok(seg) => term.print_info(&format!("created {}", seg.name())),
            Err(e) => term.print_error("add-segment", &e.to_string()),
        }
    }

    fn connect(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let (seg_a, end_a, seg_b, end_b) = match args {
            [a, ea, b, eb] => (*a, parse_end(ea)?, *b, parse_end(eb)?),
            _ => return term.print_error("connect", "usage: connect <seg> <A|B> <seg> <A|B>"),
        };
        match self.topology.connect_segments(seg_a, end_a, seg_b, end_b) {
            Ok(()) => {
                update_all_signals(&mut self.topology);
                term.print_info(&format!("connected {seg_a}.{end_a} to {seg_b}.{end_b}"))
            }
            Err(e) => term.print_error("connect", &e.to_string()),
        }
    }

    fn signal(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let (seg, end) = match args {
            [s, e] => (*s, parse_end(e)?),
            _ => return term.print_error("signal", "usage: signal <seg> <A|B>"),
        };
        match self.topology.place_signal(seg, end) {
            Ok(()) => {
                update_all_signals(&mut self.topology);
                term.print_info(&format!("placed signal on {seg}.{end}"))
            }
            Err(e) => term.print_error("signal", &e.to_string()),
        }
    }

    fn signal_junctions(&mut self, term: &Terminal) -> Result<()> {
        let junction_slots: Vec<(String, End)> = self
            .topology
            .all_junctions()
            .into_iter()
            .flat_map(|point| {
                point
                    .occupied_slots()
                    .map(|(_, binding)| (binding.segment.clone(), binding.end))
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut placed = 0usize;
        for (segment, end) in junction_slots {
            let already = self
                .topology
                .get_segment(&segment)
                .map(|s| s.end(end).signal().is_some())
                .unwrap_or(true);
            if !already && self.topology.place_signal(&segment, end).is_ok() {
                placed += 1;
            }
        }
        update_all_signals(&mut self.topology);
        term.print_info(&format!("placed {placed} signal(s) on junction ends"))
    }

    fn toggle(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let (point, switch) = match args {
            [p, s] => (*p, parse_switch(s)?),
            _ => return term.print_error("toggle", "usage: toggle <point> <left|right>"),
        };
        match self.topology.set_switch(point, switch) {
            Ok(()) => {
                update_all_signals(&mut self.topology);
                term.print_info(&format!("{point} switch set to {switch:?}"))
            }
            Err(e) => term.print_error("toggle", &e.to_string()),
        }
    }

    fn train(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let (name, src, dst) = match args {
            [s, d] => (None, *s, *d),
            [n, s, d] => (Some(n.to_string()), *s, *d),
            _ => return term.print_error("train", "usage: train [name] <src-seg> <dst-seg>"),
        };

        let train_name = match self.topology.create_train(name) {
            Ok(t) => t.name().to_string(),
            Err(e) => return term.print_error("train", &e.to_string()),
        };

        match place_train(&mut self.topology, &train_name, src, dst) {
            Ok(()) => term.print_info(&format!("placed {train_name} on {src} -> {dst}")),
            Err(e) => term.print_error("train", &e.to_string()),
        }
    }

    fn step(&mut self, term: &Terminal) -> Result<()> {
        match step(&mut self.topology) {
            Ok(true) => term.print_info("stepped (all trains done)"),
            Ok(false) => term.print_info("stepped"),
            Err(e) => term.print_error("step", &e.to_string()),
        }
    }

    fn run(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let cap = match args.first() {
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| anyhow!("invalid safety cap: {s}"))?,
            None => self.config.run_safety_cap,
        };
        match run(&mut self.topology, cap) {
            Ok(ticks) => term.print_info(&format!("completed after {ticks} tick(s)")),
            Err(e) => term.print_error("run", &e.to_string()),
        }
    }

    fn save(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let path = match args.first().map(|s| s.to_string()).or_else(|| self.network_path.clone()) {
            Some(p) => p,
            None => return term.print_error("save", "no path given and no default configured"),
        };

        if std::path::Path::new(&path).exists() && !term.confirm_overwrite(&path)? {
            return term.print_info("save cancelled");
        }

        let text = rrsim_core::format::serialize(&self.topology);
        match std::fs::write(&path, text) {
            Ok(()) => {
                self.network_path = Some(path.clone());
                term.print_info(&format!("saved to {path}"))
            }
            Err(e) => term.print_error("save", &e.to_string()),
        }
    }

    fn load(&mut self, args: &[&str], term: &Terminal) -> Result<()> {
        let path = match args.first().map(|s| s.to_string()).or_else(|| self.network_path.clone()) {
            Some(p) => p,
            None => return term.print_error("load", "no path given and no default configured"),
        };

        match std::fs::read_to_string(&path) {
            Ok(text) => match rrsim_core::format::deserialize(&mut self.topology, &text) {
                Ok(()) => {
                    self.network_path = Some(path.clone());
                    term.print_info(&format!("loaded {path}"))
                }
                Err(e) => term.print_error("load", &e.to_string()),
            },
            Err(e) => term.print_error("load", &e.to_string()),
        }
    }
}

fn parse_end(s: &str) -> Result<End> {
    match s.to_uppercase().as_str() {
        "A" => Ok(End::A),
        "B" => Ok(End::B),
        other => Err(anyhow!("invalid end '{other}', expected A or B")),
    }
}

fn parse_switch(s: &str) -> Result<Switch> {
    match s.to_lowercase().as_str() {
        "left" => Ok(Switch::Left),
        "right" => Ok(Switch::Right),
        other => Err(anyhow!("invalid switch '{other}', expected left or right")),
    }
}
