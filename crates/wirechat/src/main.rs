mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::exit::{CliError, INTERNAL};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "wirechat", version, about = "Binary chat protocol client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("failed to start runtime: {err}")))
        .and_then(|runtime| runtime.block_on(cmd::run(cli.command, format)));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "wirechat",
            "send",
            "127.0.0.1",
            "9000",
            "--name",
            "alice",
            "--to",
            "bob",
            "hello",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.server.port, 9000);
                assert_eq!(args.to, "bob");
                assert_eq!(args.body, "hello");
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn send_defaults_to_broadcast() {
        let cli = Cli::try_parse_from(["wirechat", "send", "h", "1", "-n", "alice", "hi"])
            .expect("send args should parse");
        assert!(matches!(cli.command, Command::Send(args) if args.to == "~"));
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = Cli::try_parse_from(["wirechat", "users", "host", "http", "--name", "alice"])
            .expect_err("port must be numeric");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["wirechat", "decode", "01", "--format", "json"])
            .expect("decode args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(cli.command, Command::Decode(_)));
    }

    #[test]
    fn parses_chat_idle() {
        let cli = Cli::try_parse_from([
            "wirechat", "chat", "h", "1", "--name", "alice", "--idle", "5m",
        ])
        .expect("chat args should parse");
        assert!(matches!(cli.command, Command::Chat(args) if args.idle.as_deref() == Some("5m")));
    }
}
