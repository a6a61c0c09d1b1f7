//! End-to-end wrapper tests with a fake compiler.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use compcache::common::config::Config;
use compcache::common::stats::{Counters, Statistic};
use compcache::wrapper::run_with_config;

/// A stand-in compiler: writes a fixed "object" to the -o target.
fn install_fake_compiler(dir: &Path) -> PathBuf {
    let path = dir.join("fakecc");
    fs::write(
        &path,
        "#!/bin/sh\n\
         out=\"\"\n\
         while [ $# -gt 0 ]; do\n\
           if [ \"$1\" = \"-o\" ]; then out=\"$2\"; shift; fi\n\
           shift\n\
         done\n\
         printf 'object-bytes' > \"$out\"\n",
    )
    .unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.cache_dir = dir.join("cache").display().to_string();
    config
}

#[test]
fn miss_then_hit_round_trip() {
    let dir = TempDir::new().unwrap();
    let cwd = dir.path().canonicalize().unwrap();
    let compiler = install_fake_compiler(&cwd);

    let input = cwd.join("foo.c");
    let output = cwd.join("foo.o");
    fs::write(&input, "int x;\n").unwrap();

    let argv: Vec<String> = vec![
        compiler.display().to_string(),
        "-c".to_string(),
        input.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ];

    // First build: a miss that runs the fake compiler and caches its output.
    let code = run_with_config(test_config(&cwd), &argv).unwrap();
    assert_eq!(code, 0);
    assert_eq!(fs::read(&output).unwrap(), b"object-bytes");

    // Second build: the object comes out of the cache, not the compiler.
    fs::remove_file(&output).unwrap();
    let code = run_with_config(test_config(&cwd), &argv).unwrap();
    assert_eq!(code, 0);
    assert_eq!(fs::read(&output).unwrap(), b"object-bytes");

    let counters = Counters::load(cwd.join("cache").join("stats")).unwrap();
    assert_eq!(counters.get(Statistic::CacheMiss), 1);
    assert_eq!(counters.get(Statistic::CacheHitDirect), 1);
}

#[test]
fn changed_input_misses_again() {
    let dir = TempDir::new().unwrap();
    let cwd = dir.path().canonicalize().unwrap();
    let compiler = install_fake_compiler(&cwd);

    let input = cwd.join("foo.c");
    let output = cwd.join("foo.o");
    fs::write(&input, "int x;\n").unwrap();

    let argv: Vec<String> = vec![
        compiler.display().to_string(),
        "-c".to_string(),
        input.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ];

    run_with_config(test_config(&cwd), &argv).unwrap();
    fs::write(&input, "int y;\n").unwrap();
    run_with_config(test_config(&cwd), &argv).unwrap();

    let counters = Counters::load(cwd.join("cache").join("stats")).unwrap();
    assert_eq!(counters.get(Statistic::CacheMiss), 2);
}

#[test]
fn uncacheable_invocation_falls_through_to_the_compiler() {
    let dir = TempDir::new().unwrap();
    let cwd = dir.path().canonicalize().unwrap();
    let compiler = install_fake_compiler(&cwd);

    let input = cwd.join("foo.c");
    let output = cwd.join("foo.o");
    fs::write(&input, "int x;\n").unwrap();

    // -E makes this a preprocessing call; the wrapper must not cache it.
    let argv: Vec<String> = vec![
        compiler.display().to_string(),
        "-E".to_string(),
        input.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ];

    let code = run_with_config(test_config(&cwd), &argv).unwrap();
    assert_eq!(code, 0);

    let counters = Counters::load(cwd.join("cache").join("stats")).unwrap();
    assert_eq!(counters.get(Statistic::CalledForPreprocessing), 1);
    assert_eq!(counters.get(Statistic::CacheMiss), 0);
}
