//! Line-oriented command terminal
//!
//! Reads one line at a time, splits it on whitespace and dispatches the
//! first token to a registered handler. Handlers get the remaining tokens
//! and mutable access to the shared state.

use crate::h2c::Error;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Result of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Printed before the message
    pub info: Vec<String>,
    pub message: String,
}

impl CommandOutput {
    pub fn new(message: impl Into<String>) -> Self {
        CommandOutput {
            info: Vec::new(),
            message: message.into(),
        }
    }

    /// Add an informational line
    pub fn info(&mut self, line: impl Into<String>) {
        self.info.push(line.into());
    }
}

/// Command handler
pub type Handler<T> = fn(&mut T, &[String]) -> Result<CommandOutput, Error>;

/// State that can show a status next to the prompt
pub trait StatusBanner {
    fn status(&self) -> &str;
}

const BUILTIN_HELP: &str = "help";
const BUILTIN_EXIT: [&str; 2] = ["exit", "quit"];

/// Split a command line into tokens
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Interactive terminal
pub struct Terminal<T, R, W> {
    state: T,
    label: String,
    commands: BTreeMap<String, Handler<T>>,
    input: R,
    output: W,
}

impl<T: StatusBanner, R: BufRead, W: Write> Terminal<T, R, W> {
    pub fn new(state: T, label: impl Into<String>, input: R, output: W) -> Self {
        Terminal {
            state,
            label: label.into(),
            commands: BTreeMap::new(),
            input,
            output,
        }
    }

    /// Register `handler` under `name`, replacing any previous one
    pub fn add_cmd(&mut self, name: impl Into<String>, handler: Handler<T>) {
        let name = name.into();
        if self.commands.insert(name.clone(), handler).is_some() {
            log::debug!("command {} re-registered", name);
        }
    }

    /// Registered command names, sorted
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut T {
        &mut self.state
    }

    /// Prompt text: `<label>> ` or `<label> <status>> `
    pub fn prompt(&self) -> String {
        let status = self.state.status();
        if status.is_empty() {
            format!("{}> ", self.label)
        } else {
            format!("{} {}> ", self.label, status)
        }
    }

    /// Run one command and print its result
    pub fn operate_cmd(&mut self, name: &str, args: &[String]) -> io::Result<()> {
        let Some(handler) = self.commands.get(name).copied() else {
            return writeln!(self.output, "error: unknown command {}", name);
        };

        log::trace!("running {} {:?}", name, args);
        match handler(&mut self.state, args) {
            Ok(result) => {
                for line in &result.info {
                    writeln!(self.output, "{}", line)?;
                }
                if !result.message.is_empty() {
                    writeln!(self.output, "{}", result.message)?;
                }
            }
            Err(e) => {
                log::debug!("{} failed: {:?}", name, e);
                writeln!(self.output, "error: {}", e)?;
            }
        }
        self.output.flush()
    }

    fn print_help(&mut self) -> io::Result<()> {
        let names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        writeln!(self.output, "commands: {}", names.join(", "))?;
        writeln!(
            self.output,
            "builtins: {}, {}",
            BUILTIN_HELP,
            BUILTIN_EXIT.join(", ")
        )
    }

    /// Read and dispatch lines until end of input or `exit`
    pub fn run(&mut self) -> io::Result<()> {
        let mut line = String::new();
        loop {
            let prompt = self.prompt();
            write!(self.output, "{}", prompt)?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(());
            }

            let mut tokens = tokenize(&line);
            if tokens.is_empty() {
                continue;
            }
            let name = tokens.remove(0);

            if BUILTIN_EXIT.contains(&name.as_str()) {
                return Ok(());
            }
            if name == BUILTIN_HELP {
                self.print_help()?;
                continue;
            }

            self.operate_cmd(&name, &tokens)?;
        }
    }

    /// Consume the terminal, returning the state and output
    pub fn into_parts(self) -> (T, W) {
        (self.state, self.output)
    }
}
