use clap::Parser;

/// Run an in-memory key-value store sharded across logical nodes.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Number of nodes the store starts with.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u16).range(1..))]
    pub nodes: u16,

    /// Node that acts as the replication source instead of the newest one.
    #[arg(long, value_name = "ID")]
    pub pin_source: Option<usize>,

    /// Do not print the "> " prompt (useful when piping commands in).
    #[arg(long)]
    pub no_prompt: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sharded-kv"]).unwrap();
        assert_eq!(cli.nodes, 2);
        assert_eq!(cli.pin_source, None);
        assert!(!cli.no_prompt);
    }

    #[test]
    fn test_zero_nodes_rejected() {
        assert!(Cli::try_parse_from(["sharded-kv", "--nodes", "0"]).is_err());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "sharded-kv",
            "--nodes",
            "4",
            "--pin-source",
            "1",
            "--no-prompt",
        ])
        .unwrap();
        assert_eq!(cli.nodes, 4);
        assert_eq!(cli.pin_source, Some(1));
        assert!(cli.no_prompt);
    }
}
