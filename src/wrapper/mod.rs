//! The compiler wrapper.
//!
//! Invoked as `compcache <compiler> <args...>` in place of the real
//! compiler. Argument processing decides cacheability; a terminal
//! statistic falls straight through to the real compiler, otherwise the
//! object store is probed with a key derived from the processed argument
//! vectors and the input file contents.

use anyhow::{Context as _, Result};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

use crate::argproc::{process_args, ProcessedArgs};
use crate::args::Args;
use crate::cache::{hash_parts, ObjectStore};
use crate::common::config::Config;
use crate::common::stats::{Counters, Statistic};
use crate::context::Context;

/// Find config.toml by searching up from the current directory.
fn find_config_file() -> Option<PathBuf> {
    let mut current = env::current_dir().ok()?;

    // Search up to 5 levels up
    for _ in 0..5 {
        let config_path = current.join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }

        // Go up one directory
        if !current.pop() {
            break;
        }
    }

    None
}

fn load_config() -> Result<Config> {
    match find_config_file() {
        Some(config_path) => Config::load(&config_path),
        None => Config::load_default(),
    }
}

fn stats_file(config: &Config) -> PathBuf {
    PathBuf::from(&config.cache_dir).join("stats")
}

/// Run the real compiler with the unmodified original arguments and return
/// its exit code.
fn run_real_compiler(argv: &[String]) -> Result<i32> {
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .with_context(|| format!("Failed to execute {}", argv[0]))?;
    Ok(status.code().unwrap_or(1))
}

/// The cache key: compiler name, both hashed argument vectors and the
/// input file contents.
fn cache_key(ctx: &Context, processed: &ProcessedArgs) -> Result<String> {
    let input_path = ctx.resolve(&ctx.args_info.input_file);
    let input = fs::read(&input_path)
        .with_context(|| format!("Failed to read input file {:?}", input_path))?;
    Ok(hash_parts(&[
        ctx.orig_args[0].full().as_bytes(),
        processed.compiler_args.to_string().as_bytes(),
        processed.extra_args_to_hash.to_string().as_bytes(),
        &input,
    ]))
}

fn bump(counters: &mut Counters, config: &Config, statistic: Statistic) {
    counters.increment(statistic, 1);
    if let Err(e) = counters.save(stats_file(config)) {
        debug!(error = %e, "failed to persist statistics");
    }
}

/// Main entry point for the wrapper.
///
/// `argv[0]` is the compiler, the rest its arguments. Returns the exit
/// code to terminate with.
pub fn run_wrapper(argv: &[String]) -> Result<i32> {
    let config = load_config()?;
    run_with_config(config, argv)
}

/// Like [`run_wrapper`] but with an explicit configuration.
pub fn run_with_config(config: Config, argv: &[String]) -> Result<i32> {
    if argv.is_empty() {
        anyhow::bail!("No compiler given");
    }

    let store = ObjectStore::new(&config.cache_dir)?;
    let mut counters = Counters::load(stats_file(&config)).unwrap_or_default();

    let orig_args = Args::from_argv(argv);
    let mut ctx = Context::new(config, orig_args)?;

    let processed = match process_args(&mut ctx) {
        Ok(processed) => processed,
        Err(statistic) => {
            debug!(%statistic, "not cacheable, running the real compiler");
            bump(&mut counters, &ctx.config, statistic);
            return run_real_compiler(argv);
        }
    };

    let key = cache_key(&ctx, &processed)?;
    let output_obj = ctx.resolve(&ctx.args_info.output_obj);

    if store.exists(&key) {
        let object = store.get(&key)?;
        fs::write(&output_obj, object)
            .with_context(|| format!("Failed to write {:?}", output_obj))?;
        let hit = if ctx.config.direct_mode {
            Statistic::CacheHitDirect
        } else {
            Statistic::CacheHitPreprocessed
        };
        debug!(key = key.as_str(), "cache hit");
        bump(&mut counters, &ctx.config, hit);
        return Ok(0);
    }

    // Miss: run the real compiler with the original arguments (depend-mode
    // style) and insert the produced object.
    let code = run_real_compiler(argv)?;
    if code != 0 {
        bump(&mut counters, &ctx.config, Statistic::CompileFailed);
        return Ok(code);
    }

    match fs::read(&output_obj) {
        Ok(object) => {
            store.insert(&key, &object)?;
            debug!(key = key.as_str(), "cached object");
        }
        Err(e) => {
            debug!(error = %e, "compiler produced no readable object, not caching");
        }
    }
    bump(&mut counters, &ctx.config, Statistic::CacheMiss);

    Ok(code)
}
