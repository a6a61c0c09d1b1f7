//! Tests for DEPENDENCIES_OUTPUT / SUNPRO_DEPENDENCIES handling.
//!
//! These mutate the process environment, so they live in their own test
//! binary and run as a single sequential test function.

use std::env;
use std::fs;

use tempfile::TempDir;

use compcache::argproc::{default_params, process_args};
use compcache::args::Args;
use compcache::common::config::Config;
use compcache::context::{Context, GuessedCompiler};

fn make_ctx(dir: &TempDir, config: Config, command: &str) -> Context {
    let cwd = dir.path().canonicalize().unwrap();
    let args = Args::from_string(command, &default_params());
    let mut ctx = Context::with_cwd(config, args, cwd);
    ctx.guessed_compiler = GuessedCompiler::Unknown;
    ctx
}

#[test]
fn dependency_environment_variables() {
    let dir = TempDir::new().unwrap();
    let cwd = dir.path().canonicalize().unwrap();
    fs::write(cwd.join("foo.c"), "").unwrap();

    // "file" form: the dependency file is recorded, no target implied.
    env::set_var("DEPENDENCIES_OUTPUT", "foo.d");
    let mut ctx = make_ctx(&dir, Config::default(), "cc -c foo.c -o foo.o");
    let processed = process_args(&mut ctx).unwrap();
    assert!(ctx.args_info.generating_dependencies);
    assert_eq!(ctx.args_info.output_dep, "foo.d");
    assert!(!ctx.args_info.dependency_target_specified);
    // No -MF/-MQ defaults: the env var already names the file.
    assert_eq!(processed.preprocessor_args.to_string(), "cc");
    assert_eq!(env::var("DEPENDENCIES_OUTPUT").unwrap(), "foo.d");

    // "file target" form, with an absolute target under base_dir: both
    // parts are re-exported relative.
    env::set_var(
        "DEPENDENCIES_OUTPUT",
        format!("foo.d {}/obj.o", cwd.display()),
    );
    let mut config = Config::default();
    config.base_dir = "/".to_string();
    let mut ctx = make_ctx(&dir, config, "cc -c foo.c -o foo.o");
    process_args(&mut ctx).unwrap();
    assert!(ctx.args_info.dependency_target_specified);
    assert_eq!(ctx.args_info.output_dep, "foo.d");
    assert_eq!(env::var("DEPENDENCIES_OUTPUT").unwrap(), "foo.d ./obj.o");
    env::remove_var("DEPENDENCIES_OUTPUT");

    // SUNPRO_DEPENDENCIES is the fallback spelling.
    env::set_var("SUNPRO_DEPENDENCIES", "sun.d");
    let mut ctx = make_ctx(&dir, Config::default(), "cc -c foo.c -o foo.o");
    process_args(&mut ctx).unwrap();
    assert!(ctx.args_info.generating_dependencies);
    assert_eq!(ctx.args_info.output_dep, "sun.d");
    assert_eq!(env::var("SUNPRO_DEPENDENCIES").unwrap(), "sun.d");
    env::remove_var("SUNPRO_DEPENDENCIES");
}
