//! Command interpreter and line loop.
//!
//! [`Shell`] owns the [`ShardedStore`] and is the only place that produces
//! user-facing text. Each line is parsed, executed and answered before the
//! next one is read.

use std::fmt;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::placement::{NodeId, ReplicationSource};
use crate::protocol::ConsoleCommand;
use crate::store::{ReplicationReport, ShardedStore, StoreSnapshot};

const PROMPT: &str = "> ";

const HELP_TEXT: &str = "\
Commands (case-insensitive):
  PUT <key> <value>    (alias: p)    -- store a pair on the routed node
  GET <key>            (alias: g)    -- read from the routed node
  DELETE <key>         (alias: d)    -- remove from the routed node
  REPLICATE            (alias: r)    -- push the source node into all others
  ADDNODE              (alias: a)    -- append an empty node
  SOURCE <id|newest>                 -- choose the replication source
  STATUS               (alias: s)    -- list every node and its entries
  DUMP                               -- print the store as JSON
  HELP                 (alias: h)    -- show this message
  EXIT                 (alias: e)    -- leave the shell";

/// Result of executing one command, rendered with `Display`.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Stored,
    Value(String),
    NotFound,
    Deleted,
    Replicated(Option<ReplicationReport>),
    NodeAdded { id: NodeId, count: usize },
    SourceSet(ReplicationSource),
    Status(StoreSnapshot),
    Dump(String),
    Help,
    Exit,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Stored => write!(f, "Key-value pair stored."),
            Reply::Value(value) => write!(f, "Value: {value}"),
            Reply::NotFound => write!(f, "Key not found."),
            Reply::Deleted => write!(f, "Key-value pair deleted."),
            Reply::Replicated(Some(report)) => write!(
                f,
                "Nodes replicated from node {} ({} -> {}).",
                report.source,
                plural(report.entries, "entry", "entries"),
                plural(report.targets, "node", "nodes")
            ),
            Reply::Replicated(None) => write!(f, "Nothing to replicate (fewer than 2 nodes)."),
            Reply::NodeAdded { id, count } => {
                write!(f, "Node {id} added ({}).", plural(*count, "node", "nodes"))
            }
            Reply::SourceSet(ReplicationSource::Newest) => {
                write!(f, "Replication source follows the newest node.")
            }
            Reply::SourceSet(ReplicationSource::Pinned(id)) => {
                write!(f, "Replication source pinned to node {id}.")
            }
            Reply::Status(snapshot) => render_status(f, snapshot),
            Reply::Dump(json) => write!(f, "{json}"),
            Reply::Help => write!(f, "{HELP_TEXT}"),
            Reply::Exit => write!(f, "Bye."),
        }
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

fn render_status(f: &mut fmt::Formatter<'_>, snapshot: &StoreSnapshot) -> fmt::Result {
    let source = match snapshot.source {
        ReplicationSource::Newest => "newest".to_string(),
        ReplicationSource::Pinned(id) => id.to_string(),
    };
    write!(
        f,
        "{} nodes | replication source: {source}",
        snapshot.nodes.len()
    )?;
    for node in &snapshot.nodes {
        write!(f, "\n  node {} ({} keys)", node.id, node.entries.len())?;
        for (key, value) in &node.entries {
            write!(f, "\n    {key} = {value}")?;
        }
    }
    Ok(())
}

/// Interactive front end for a [`ShardedStore`].
pub struct Shell {
    store: ShardedStore,
    prompt: bool,
}

impl Shell {
    pub fn new(store: ShardedStore) -> Self {
        Self {
            store,
            prompt: true,
        }
    }

    /// Enables or disables the `"> "` prompt written before each line.
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn store(&self) -> &ShardedStore {
        &self.store
    }

    pub fn into_store(self) -> ShardedStore {
        self.store
    }

    /// Executes a parsed command against the store.
    pub fn execute(&mut self, command: ConsoleCommand) -> Result<Reply> {
        let reply = match command {
            ConsoleCommand::Put { key, value } => {
                self.store.put(key, value)?;
                Reply::Stored
            }
            ConsoleCommand::Get { key } => match self.store.get(&key)? {
                Some(value) => Reply::Value(value.to_string()),
                None => Reply::NotFound,
            },
            ConsoleCommand::Delete { key } => {
                self.store.delete(&key)?;
                Reply::Deleted
            }
            ConsoleCommand::Replicate => Reply::Replicated(self.store.replicate()?),
            ConsoleCommand::AddNode => {
                let id = self.store.add_node();
                Reply::NodeAdded {
                    id,
                    count: self.store.node_count(),
                }
            }
            ConsoleCommand::Source { node: Some(id) } => {
                self.store.pin_source(id)?;
                Reply::SourceSet(self.store.replication_source())
            }
            ConsoleCommand::Source { node: None } => {
                self.store.follow_newest();
                Reply::SourceSet(self.store.replication_source())
            }
            ConsoleCommand::Status => Reply::Status(self.store.snapshot()),
            ConsoleCommand::Dump => {
                let json = serde_json::to_string(&self.store.snapshot())
                    .context("failed to encode store snapshot")?;
                Reply::Dump(json)
            }
            ConsoleCommand::Help => Reply::Help,
            ConsoleCommand::Exit => Reply::Exit,
        };
        Ok(reply)
    }

    /// Parses and executes one line.
    ///
    /// Returns `None` for blank lines.
    pub fn handle_line(&mut self, line: &str) -> Option<Result<Reply>> {
        if line.trim().is_empty() {
            return None;
        }
        Some(ConsoleCommand::parse(line).and_then(|command| self.execute(command)))
    }

    /// Reads commands from `reader` until EOF or `EXIT`, writing replies to `writer`.
    ///
    /// Invalid input and store errors are reported as `ERROR: ...` lines and
    /// do not end the loop.
    pub async fn run<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            if self.prompt {
                writer.write_all(PROMPT.as_bytes()).await?;
                writer.flush().await?;
            }

            buf.clear();
            let bytes = reader
                .read_until(b'\n', &mut buf)
                .await
                .context("failed to read command")?;
            if bytes == 0 {
                debug!("input closed");
                break;
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                warn!(bytes, "rejected non UTF-8 input");
                write_line(writer, "ERROR: input is not valid UTF-8").await?;
                continue;
            };
            let Some(result) = self.handle_line(line) else {
                continue;
            };
            let (text, exit) = match result {
                Ok(reply) => {
                    let exit = reply == Reply::Exit;
                    (reply.to_string(), exit)
                }
                Err(err) => {
                    warn!(error = %err, "command failed");
                    (format!("ERROR: {err}"), false)
                }
            };

            write_line(writer, &text).await?;
            if exit {
                break;
            }
        }
        Ok(())
    }
}

async fn write_line<W>(writer: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    fn shell(nodes: usize) -> Shell {
        Shell::new(ShardedStore::with_nodes(nodes))
    }

    fn run_line(shell: &mut Shell, line: &str) -> String {
        match shell.handle_line(line).expect("non-blank line") {
            Ok(reply) => reply.to_string(),
            Err(err) => format!("ERROR: {err}"),
        }
    }

    #[test]
    fn test_basic_replies() {
        let mut shell = shell(2);
        assert_eq!(run_line(&mut shell, "put name John"), "Key-value pair stored.");
        assert_eq!(run_line(&mut shell, "get name"), "Value: John");
        assert_eq!(run_line(&mut shell, "delete name"), "Key-value pair deleted.");
        assert_eq!(run_line(&mut shell, "get name"), "Key not found.");
    }

    #[test]
    fn test_delete_missing_key_still_reports_deleted() {
        let mut shell = shell(1);
        assert_eq!(run_line(&mut shell, "delete ghost"), "Key-value pair deleted.");
        assert!(shell.store().nodes()[0].is_empty());
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let mut shell = shell(1);
        assert!(shell.handle_line("   \n").is_none());
    }

    #[test]
    fn test_replicate_reply() {
        let mut shell = shell(1);
        assert_eq!(
            run_line(&mut shell, "replicate"),
            "Nothing to replicate (fewer than 2 nodes)."
        );

        assert_eq!(run_line(&mut shell, "addnode"), "Node 1 added (2 nodes).");
        // 3 bytes % 2 == 1, the newest node
        run_line(&mut shell, "put abc 1");
        assert_eq!(
            run_line(&mut shell, "replicate"),
            "Nodes replicated from node 1 (1 entry -> 1 node)."
        );
    }

    #[test]
    fn test_store_errors_are_reported() {
        let mut shell = Shell::new(ShardedStore::new());
        assert_eq!(
            run_line(&mut shell, "get key"),
            "ERROR: no nodes available: add a node before using keys"
        );
        assert_eq!(
            run_line(&mut shell, "source 4"),
            "ERROR: unknown node 4: store has 0 nodes"
        );
    }

    #[test]
    fn test_status_lists_nodes() {
        let mut shell = shell(2);
        run_line(&mut shell, "put ab x");
        assert_eq!(
            run_line(&mut shell, "status"),
            "2 nodes | replication source: newest\n  node 0 (1 keys)\n    ab = x\n  node 1 (0 keys)"
        );
    }

    #[test]
    fn test_dump_is_json() -> Result<()> {
        let mut shell = shell(1);
        run_line(&mut shell, "put k v");
        run_line(&mut shell, "source 0");

        let dump = run_line(&mut shell, "dump");
        let value: serde_json::Value = serde_json::from_str(&dump)?;
        assert_eq!(value["source"]["pinned"], 0);
        assert_eq!(value["nodes"][0]["id"], 0);
        assert_eq!(value["nodes"][0]["entries"]["k"], "v");
        Ok(())
    }

    #[tokio::test]
    async fn test_run_stops_at_exit() -> Result<()> {
        let input = b"put name John\nget name\nexit\nget name\n";
        let mut reader = BufReader::new(&input[..]);
        let (mut writer, mut output) = tokio::io::duplex(4096);

        let mut shell = shell(1).with_prompt(false);
        shell.run(&mut reader, &mut writer).await?;
        drop(writer);

        let mut transcript = String::new();
        output.read_to_string(&mut transcript).await?;
        assert_eq!(
            transcript,
            "Key-value pair stored.\nValue: John\nBye.\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_run_reports_invalid_utf8_and_keeps_going() -> Result<()> {
        let input = b"put k \xff\xfe\nget k\nput a b\nget a\n";
        let mut reader = BufReader::new(&input[..]);
        let mut output = Vec::new();

        let mut shell = shell(1).with_prompt(false);
        shell.run(&mut reader, &mut output).await?;

        let transcript = String::from_utf8(output)?;
        assert_eq!(
            transcript,
            "ERROR: input is not valid UTF-8\n\
             Key not found.\n\
             Key-value pair stored.\n\
             Value: b\n"
        );
        Ok(())
    }

    #[test]
    fn test_replicated_reply_pluralises() {
        let report = |entries, targets| ReplicationReport {
            source: NodeId(2),
            entries,
            targets,
        };
        assert_eq!(
            Reply::Replicated(Some(report(1, 1))).to_string(),
            "Nodes replicated from node 2 (1 entry -> 1 node)."
        );
        assert_eq!(
            Reply::Replicated(Some(report(0, 2))).to_string(),
            "Nodes replicated from node 2 (0 entries -> 2 nodes)."
        );
    }

    #[tokio::test]
    async fn test_run_writes_prompts_and_continues_after_errors() -> Result<()> {
        let input = b"bogus\n\nget name\n";
        let mut reader = BufReader::new(&input[..]);
        let mut output = Vec::new();

        let mut shell = shell(1);
        shell.run(&mut reader, &mut output).await?;

        let transcript = String::from_utf8(output)?;
        assert_eq!(
            transcript,
            "> ERROR: invalid command. Usage: <put|get|delete> <key> [<value>], or HELP for all commands\n\
             > > Key not found.\n\
             > "
        );
        Ok(())
    }
}
