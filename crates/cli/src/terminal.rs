use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{self, Write};

use rrsim_core::{Colour, End, Shape, Switch, Topology};

struct Colors;

impl Colors {
    const PROMPT: Color = Color::Green;
    const HEADER: Color = Color::Magenta;
    const DIM: Color = Color::DarkGrey;
    const ERROR: Color = Color::Red;
    const SIGNAL_GREEN: Color = Color::Green;
    const SIGNAL_RED: Color = Color::Red;
}

/// Colourised terminal I/O for the menu REPL. Degrades to plain text when
/// `colour` is disabled, e.g. when the config file turns it off or output
/// isn't a TTY.
pub struct Terminal {
    colour: bool,
}

impl Terminal {
    pub fn new(colour: bool) -> Self {
        Self { colour }
    }

    fn with_colour<W: Write>(&self, out: &mut W, c: Color, text: &str) -> Result<()> {
        if self.colour {
            execute!(out, SetForegroundColor(c), Print(text), ResetColor)?;
        } else {
            execute!(out, Print(text))?;
        }
        Ok(())
    }

    pub fn print_banner(&self) -> Result<()> {
        let mut stdout = io::stdout();
        self.with_colour(&mut stdout, Colors::HEADER, "rrsim")?;
        self.with_colour(&mut stdout, Colors::DIM, " - railroad traffic-signaling simulator\n")?;
        self.with_colour(&mut stdout, Colors::DIM, "type 'help' for the command list, 'quit' to exit\n")?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_help(&self) -> Result<()> {
        let mut stdout = io::stdout();
        let lines = [
            "add-segment [name]                    create a segment",
            "connect <seg> <A|B> <seg> <A|B>        connect two segment ends",
            "signal <seg> <A|B>                     place a signal at an end",
            "signal-junctions                       add signals to every end of every junction",
            "toggle <point> <left|right>             set a junction's switch",
            "list                                    list segments",
            "junctions                               list junctions and their switch state",
            "show                                    show track connections",
            "train [name] <src-seg> <dst-seg>       place a train",
            "step                                    advance the simulation one tick",
            "run [cap]                               run to completion (or until the safety cap)",
            "save [path]                             save the network",
            "load [path]                             load a network (replaces the current one)",
            "help                                    show this list",
            "quit                                    exit",
        ];
        for line in lines {
            self.with_colour(&mut stdout, Colors::DIM, line)?;
            execute!(stdout, Print("\n"))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Read one line of input. Returns `None` on EOF or an explicit `quit`.
    pub fn read_command(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        self.with_colour(&mut stdout, Colors::PROMPT, "rrsim> ")?;
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let trimmed = input.trim().to_string();
        if trimmed == "quit" || trimmed == "exit" {
            return Ok(None);
        }
        Ok(Some(trimmed))
    }

    pub fn print_error(&self, operation: &str, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        self.with_colour(&mut stdout, Colors::ERROR, &format!("{operation}: {msg}\n"))?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        self.with_colour(&mut stdout, Colors::DIM, msg)?;
        execute!(stdout, Print("\n"))?;
        stdout.flush()?;
        Ok(())
    }

    /// The "list segments" view: one line per segment, its ends' point
    /// bindings, and any signal colours.
    pub fn print_segments(&self, topology: &Topology) -> Result<()> {
        let mut stdout = io::stdout();
        for seg in topology.segments() {
            let a = seg.end(End::A);
            let b = seg.end(End::B);
            execute!(
                stdout,
                Print(format!(
                    "{:<10} A@{:<10} B@{:<10}",
                    seg.name(),
                    a.binding().point,
                    b.binding().point
                ))
            )?;
            if let Some(sig) = a.signal() {
                execute!(stdout, Print("  sigA:"))?;
                self.print_colour(&mut stdout, sig.colour())?;
            }
            if let Some(sig) = b.signal() {
                execute!(stdout, Print("  sigB:"))?;
                self.print_colour(&mut stdout, sig.colour())?;
            }
            execute!(stdout, Print("\n"))?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn print_colour(&self, stdout: &mut io::Stdout, colour: Colour) -> Result<()> {
        let (c, label) = match colour {
            Colour::Green => (Colors::SIGNAL_GREEN, "green"),
            Colour::Red => (Colors::SIGNAL_RED, "red"),
        };
        self.with_colour(stdout, c, label)
    }

    /// The "show track connections" view: every point, its shape, and its
    /// occupied slots — distinct from `print_segments`' per-segment listing.
    pub fn print_connections(&self, topology: &Topology) -> Result<()> {
        let mut stdout = io::stdout();
        for point in topology.points() {
            let shape = match point.shape() {
                Shape::Empty => "empty",
                Shape::Terminator => "terminator",
                Shape::Continuation => "continuation",
                Shape::Junction => "junction",
            };
            execute!(stdout, Print(format!("{:<10} {}", point.name(), shape)))?;
            for (slot, binding) in point.occupied_slots() {
                execute!(
                    stdout,
                    Print(format!("  slot{}:{}.{}", slot.index() + 1, binding.segment, binding.end))
                )?;
            }
            if point.shape() == Shape::Junction {
                let switch = match point.switch() {
                    Switch::Left => "left",
                    Switch::Right => "right",
                    Switch::None => "none",
                };
                execute!(stdout, Print(format!("  switch:{switch}")))?;
            }
            execute!(stdout, Print("\n"))?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_junctions(&self, topology: &Topology) -> Result<()> {
        let mut stdout = io::stdout();
        let junctions = topology.all_junctions();
        if junctions.is_empty() {
            self.print_info("no junctions")?;
            return Ok(());
        }
        for point in junctions {
            let switch = match point.switch() {
                Switch::Left => "left",
                Switch::Right => "right",
                Switch::None => "none",
            };
            execute!(stdout, Print(format!("{:<10} switch:{switch}\n", point.name())))?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Ask the user to confirm overwriting an existing file. A guarded save
    /// is a CLI-layer convenience, not a core behaviour.
    pub fn confirm_overwrite(&self, path: &str) -> Result<bool> {
        let mut stdout = io::stdout();
        self.with_colour(
            &mut stdout,
            Colors::ERROR,
            &format!("{path} already exists, overwrite? [y/N] "),
        )?;
        stdout.flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let trimmed = input.trim().to_lowercase();
        Ok(trimmed == "y" || trimmed == "yes")
    }
}
