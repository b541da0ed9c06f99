//! REPL command parsing for the interactive shell.
//!
//! Turns a line of text (like "put name John") into a [`ConsoleCommand`].
//! Parsing never touches the store; [`crate::shell`] executes the result.

use anyhow::{Result, anyhow};

use crate::placement::NodeId;

/// Commands that can be entered at the REPL prompt.
#[derive(Debug, PartialEq)]
pub enum ConsoleCommand {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Replicate,
    AddNode,
    /// `None` makes the replication source follow the newest node again.
    Source { node: Option<NodeId> },
    Status,
    Dump,
    Help,
    Exit,
}

impl ConsoleCommand {
    /// Parses a line of user input into a command.
    ///
    /// The line is split into at most three parts: command, key and value.
    /// The value is the rest of the line, so `put greeting hello world`
    /// stores `"hello world"`.
    ///
    /// # Syntax
    /// Commands are case-insensitive and support aliases:
    /// - `PUT <key> <value>` (alias: `p`)
    /// - `GET <key>` (alias: `g`)
    /// - `DELETE <key>` (aliases: `d`, `del`)
    /// - `REPLICATE` (alias: `r`)
    /// - `ADDNODE` (aliases: `a`, `add`)
    /// - `SOURCE <id|newest>`
    /// - `STATUS` (alias: `s`)
    /// - `DUMP`
    /// - `HELP` (alias: `h`)
    /// - `EXIT` (aliases: `e`, `quit`)
    pub fn parse(line: &str) -> Result<Self> {
        let (cmd, key, value) = split_line(line);
        if cmd.is_empty() {
            return Err(anyhow!("empty command"));
        }

        // Normalize first word: uppercase and expand aliases
        let cmd = cmd.to_uppercase();
        let normalized_cmd = match cmd.as_str() {
            "P" => "PUT",
            "G" => "GET",
            "D" | "DEL" => "DELETE",
            "R" => "REPLICATE",
            "A" | "ADD" => "ADDNODE",
            "S" => "STATUS",
            "H" => "HELP",
            "E" | "QUIT" => "EXIT",
            other => other,
        };

        match (normalized_cmd, key, value) {
            ("PUT", Some(key), Some(value)) => Ok(ConsoleCommand::Put {
                key: key.to_string(),
                value: value.to_string(),
            }),
            ("PUT", _, _) => Err(usage("put <key> <value>")),

            ("GET", Some(key), None) => Ok(ConsoleCommand::Get {
                key: key.to_string(),
            }),
            ("GET", _, _) => Err(usage("get <key>")),

            ("DELETE", Some(key), None) => Ok(ConsoleCommand::Delete {
                key: key.to_string(),
            }),
            ("DELETE", _, _) => Err(usage("delete <key>")),

            ("SOURCE", Some(target), None) => parse_source(target),
            ("SOURCE", _, _) => Err(usage("source <id|newest>")),

            ("REPLICATE", None, _) => Ok(ConsoleCommand::Replicate),
            ("ADDNODE", None, _) => Ok(ConsoleCommand::AddNode),
            ("STATUS", None, _) => Ok(ConsoleCommand::Status),
            ("DUMP", None, _) => Ok(ConsoleCommand::Dump),
            ("HELP", None, _) => Ok(ConsoleCommand::Help),
            ("EXIT", None, _) => Ok(ConsoleCommand::Exit),
            ("REPLICATE" | "ADDNODE" | "STATUS" | "DUMP" | "HELP" | "EXIT", Some(_), _) => {
                Err(usage(&normalized_cmd.to_lowercase()))
            }

            _ => Err(usage("<put|get|delete> <key> [<value>], or HELP for all commands")),
        }
    }
}

/// Splits a line into command, key and the remainder of the line.
fn split_line(line: &str) -> (&str, Option<&str>, Option<&str>) {
    let mut rest = line.trim();
    let cmd = next_token(&mut rest).unwrap_or("");
    let key = next_token(&mut rest);
    let value = Some(rest).filter(|r| !r.is_empty());
    (cmd, key, value)
}

fn next_token<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let current: &'a str = *rest;
    if current.is_empty() {
        return None;
    }
    let (head, tail) = current
        .split_once(char::is_whitespace)
        .unwrap_or((current, ""));
    *rest = tail.trim_start();
    Some(head)
}

fn parse_source(target: &str) -> Result<ConsoleCommand> {
    if target.eq_ignore_ascii_case("newest") {
        return Ok(ConsoleCommand::Source { node: None });
    }
    let index: usize = target
        .parse()
        .map_err(|_| anyhow!("invalid node id '{target}'. Usage: source <id|newest>"))?;
    Ok(ConsoleCommand::Source {
        node: Some(NodeId(index)),
    })
}

fn usage(form: &str) -> anyhow::Error {
    anyhow!("invalid command. Usage: {form}")
}
