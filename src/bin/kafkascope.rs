use clap::Parser;
use dotenv::dotenv;
use kafkascope::cluster::{ensure_any_reachable, TcpReachabilityProbe};
use kafkascope::service::setup_tracing;
use kafkascope::{AppResult, HostPort, ToolConfig};
use std::path::PathBuf;
use tokio::runtime;
use tracing::{error, info};

#[derive(Parser)]
#[command(version)]
pub struct CommandLine {
    /// path to config file
    #[arg(short, long)]
    pub conf: Option<String>,
    /// directory for the rolling log files
    #[arg(long, default_value = "./logs")]
    pub log_dir: PathBuf,
    #[command(subcommand)]
    pub command: Option<Command>,
    /// log level (v: info, vv: debug, vvv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Parser)]
pub enum Command {
    PrintConfig,
    /// check that at least one bootstrap server accepts connections
    Probe,
}

fn main() -> AppResult<()> {
    dotenv().ok();

    let commandline: CommandLine = CommandLine::parse();
    let _log_guard = setup_tracing(&commandline.log_dir, commandline.verbose)?;

    let config_path = commandline.conf.as_ref().map_or_else(
        || {
            let mut path = PathBuf::from("./");
            path.push("conf.toml");
            path
        },
        PathBuf::from,
    );
    let tool_config = ToolConfig::set_up_config(&config_path)?;

    match commandline.command {
        Some(Command::PrintConfig) => {
            println!("{:#?}", tool_config);
            Ok(())
        }
        Some(Command::Probe) | None => probe(&tool_config),
    }
}

fn probe(tool_config: &ToolConfig) -> AppResult<()> {
    let endpoints = tool_config
        .cluster
        .bootstrap_servers
        .iter()
        .map(|server| server.parse::<HostPort>())
        .collect::<AppResult<Vec<_>>>()?;

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let timeout = tool_config.timeouts.reachability();
    match rt.block_on(ensure_any_reachable(&TcpReachabilityProbe, &endpoints, timeout)) {
        Ok(endpoint) => {
            info!("cluster reachable through {}", endpoint);
            println!("reachable: {}", endpoint);
            Ok(())
        }
        Err(err) => {
            error!("{}", err);
            Err(err)
        }
    }
}
