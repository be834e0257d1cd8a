mod cli;
mod filter;
mod output;

use clap::Parser;
use cli::CliArgs;
use filter::FilterConfig;
use output::OutputFormatter;
use sockowner::{list_sockets, NetstatConfig, Protocol, StatePolicy};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = CliArgs::parse();

    let filter_config = match FilterConfig::from_cli(&args) {
        Ok(fc) => fc,
        Err(e) => {
            eprintln!("Error parsing filters: {}", e);
            std::process::exit(1);
        }
    };
    let formatter = OutputFormatter::from_cli(&args);

    let mut config = NetstatConfig::with_proc_root(&args.proc_root);
    if args.strict_states {
        config.state_policy = StatePolicy::Strict;
    }

    if !nix::unistd::Uid::effective().is_root() {
        log::warn!("not running as root: sockets of other users' processes will show no owner");
    }

    if let Err(e) = run_once(&args, &config, &filter_config, &formatter) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_once(
    args: &CliArgs,
    config: &NetstatConfig,
    filter_config: &FilterConfig,
    formatter: &OutputFormatter,
) -> sockowner::Result<()> {
    let (tcp, udp) = args.protocols();
    let mut protocols = Vec::new();
    if tcp {
        protocols.push(Protocol::Tcp);
    }
    if udp {
        protocols.push(Protocol::Udp);
    }

    // Read every table before printing so a bad table prints nothing.
    let mut tables = Vec::with_capacity(protocols.len());
    for protocol in protocols {
        tables.push((protocol, list_sockets(config, protocol)?));
    }

    formatter.print_header();
    for (protocol, records) in &tables {
        for record in records.iter().filter(|r| filter_config.matches(*protocol, r)) {
            formatter.print_record(*protocol, record);
        }
    }

    Ok(())
}
