//! Sage 命令行入口
//!
//! 用法：sage [--web-search] [--indexed-search] [--graph] [--config PATH] <query...>
//! 输出回复文本，随后一行 `[tier] trace`。

use std::path::PathBuf;

use anyhow::{bail, Context};
use sage::{build_orchestrator, config::load_config_or_default, observability, CapabilityFlags};

const USAGE: &str = "usage: sage [--web-search] [--indexed-search] [--graph] [--config PATH] <query...>";

struct CliArgs {
    help: bool,
    flags: CapabilityFlags,
    config_path: Option<PathBuf>,
    query: String,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut help = false;
    let mut flags = CapabilityFlags::default();
    let mut config_path = None;
    let mut words = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--web-search" => flags.web_search = true,
            "--indexed-search" | "--ai-search" => flags.indexed_search = true,
            "--graph" => flags.graph = true,
            "--config" => {
                let path = args.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => help = true,
            other if other.starts_with("--") => bail!("unknown option {other}\n{USAGE}"),
            _ => words.push(arg),
        }
    }

    Ok(CliArgs {
        help,
        flags,
        config_path,
        query: words.join(" "),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }
    let cfg = load_config_or_default(args.config_path);
    tracing::info!("Starting {}", cfg.app.name.as_deref().unwrap_or("sage"));
    let orchestrator = build_orchestrator(&cfg);

    let response = orchestrator
        .handle_text(args.query, args.flags)
        .await
        .context(USAGE)?;

    println!("{}", response.text);
    println!("[{}] {}", response.tier, response.trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_flags_and_query() {
        let parsed = parse_args(args(&["--graph", "capital", "of", "--web-search", "France"])).unwrap();
        assert!(parsed.flags.graph && parsed.flags.web_search && !parsed.flags.indexed_search);
        assert_eq!(parsed.query, "capital of France");
        assert!(parsed.config_path.is_none());
    }

    #[test]
    fn test_parse_config_path() {
        let parsed = parse_args(args(&["--config", "alt.toml", "hi"])).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("alt.toml")));
        assert!(parse_args(args(&["--config"])).is_err());
    }

    #[test]
    fn test_help_is_not_an_error() {
        let parsed = parse_args(args(&["--help"])).unwrap();
        assert!(parsed.help);
        assert!(!parse_args(args(&["hi"])).unwrap().help);
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(parse_args(args(&["--verbose", "hi"])).is_err());
    }
}
