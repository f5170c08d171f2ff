//! Operator input parsing
//!
//! Plain lines are administrative commands. Lines starting with `:` are
//! console directives.

use std::path::PathBuf;

/// One parsed line of operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Send the line as-is on the `rcon` channel
    Rcon(String),
    /// Execute code on the `repl` channel
    Exec(String),
    /// Evaluate an expression on the `repl` channel
    Eval(String),
    /// Execute the contents of a local file on the `repl` channel
    RunFile(PathBuf),
    /// Print channel states
    Status,
    /// Leave the console
    Quit,
    /// Blank line
    Empty,
    /// Unrecognized directive
    Unknown(String),
}

impl Input {
    /// Parse one line of input
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Input::Empty;
        }

        let Some(directive) = line.trim_start().strip_prefix(':') else {
            return Input::Rcon(line.to_string());
        };

        let (name, rest) = match directive.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (directive, ""),
        };

        match (name, rest) {
            ("exec", code) if !code.is_empty() => Input::Exec(code.to_string()),
            ("eval", expr) if !expr.is_empty() => Input::Eval(expr.to_string()),
            ("run", path) if !path.is_empty() => Input::RunFile(PathBuf::from(path)),
            ("status", "") => Input::Status,
            ("quit" | "q", "") => Input::Quit,
            _ => Input::Unknown(line.trim().to_string()),
        }
    }
}

/// Directive summary printed for unknown input
pub const HELP: &str = "\
directives:
  <command>      send on rcon
  :exec <code>   execute on repl
  :eval <expr>   evaluate on repl
  :run <file>    execute a file on repl
  :status        show channel states
  :quit          leave";
