use anyhow::Result;
use clap::Parser;
use colored::*;

use compcache::common::config::Config;
use compcache::common::stats::{Counters, Statistic};

#[derive(Parser, Debug)]
#[command(name = "compcache")]
#[command(about = "Transparent compiler cache for C/C++/CUDA/Objective-C")]
struct Cli {
    /// Print statistics counters and exit
    #[arg(long)]
    show_stats: bool,

    /// Zero the statistics counters and exit
    #[arg(long)]
    zero_stats: bool,

    /// The compiler and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn stats_path(config: &Config) -> std::path::PathBuf {
    std::path::PathBuf::from(&config.cache_dir).join("stats")
}

fn show_stats(config: &Config) -> Result<()> {
    let counters = Counters::load(stats_path(config))?;

    println!("{}", "compcache statistics".bold());
    println!("cache directory: {}", config.cache_dir.cyan());
    if counters.all_zero() {
        println!("{}", "no statistics recorded yet".yellow());
        return Ok(());
    }
    for statistic in Statistic::ALL {
        if statistic == Statistic::None {
            continue;
        }
        let value = counters.get(statistic);
        if value > 0 {
            println!("{:<36} {}", statistic.message(), value.to_string().green());
        }
    }
    Ok(())
}

fn zero_stats(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.cache_dir)?;
    Counters::new().save(stats_path(config))?;
    println!("{}", "statistics zeroed".green());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("COMPCACHE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_default()?;

    if cli.show_stats {
        return show_stats(&config);
    }
    if cli.zero_stats {
        return zero_stats(&config);
    }

    if cli.command.is_empty() {
        eprintln!("{}", "Usage: compcache <compiler> [args...]".red());
        std::process::exit(1);
    }

    let code = compcache::wrapper::run_wrapper(&cli.command)?;
    std::process::exit(code);
}
