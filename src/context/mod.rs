//! Per-invocation state.
//!
//! A [`Context`] owns everything one cache attempt needs: the original
//! argument vector, the configuration, the [`ArgsInfo`] record populated by
//! argument processing, the apparent working directory and the guessed
//! compiler family. Contexts are never shared across threads.

use std::fs;
use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::common::config::Config;
use crate::common::error::Result;
use crate::util;

/// Compiler family, guessed from the executable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessedCompiler {
    Clang,
    Gcc,
    Nvcc,
    Unknown,
}

pub fn guess_compiler(path: &str) -> GuessedCompiler {
    let name = util::base_name(path);
    if name.contains("clang") {
        GuessedCompiler::Clang
    } else if name.contains("gcc") || name.contains("g++") {
        GuessedCompiler::Gcc
    } else if name.contains("nvcc") {
        GuessedCompiler::Nvcc
    } else {
        GuessedCompiler::Unknown
    }
}

/// Result of the file-stat oracle.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    regular: bool,
    directory: bool,
}

impl FileStat {
    pub fn is_regular(&self) -> bool {
        self.regular
    }

    pub fn is_directory(&self) -> bool {
        self.directory
    }
}

/// Facts about the invocation collected while processing arguments.
#[derive(Debug, Clone, Default)]
pub struct ArgsInfo {
    pub input_file: String,
    pub output_obj: String,
    pub output_dep: String,
    pub output_dwo: String,
    pub output_cov: String,
    pub output_su: String,
    pub output_dia: String,

    /// Language as selected with `-x` or deduced from the input file
    /// extension.
    pub actual_language: Option<String>,

    pub arch_args: Vec<String>,
    pub debug_prefix_maps: Vec<String>,
    pub sanitize_blacklists: Vec<String>,
    /// Original arguments the compiler additionally needs in depend mode.
    pub depend_extra_args: Args,

    pub generating_dependencies: bool,
    pub generating_debuginfo: bool,
    pub generating_coverage: bool,
    pub generating_stackusage: bool,
    pub generating_diagnostics: bool,
    pub seen_md_mmd: bool,
    pub seen_split_dwarf: bool,
    pub profile_arcs: bool,
    pub profile_generate: bool,
    pub profile_use: bool,
    pub profile_path: String,
    pub using_precompiled_header: bool,
    pub fno_pch_timestamp: bool,
    pub output_is_precompiled_header: bool,
    pub strip_diagnostics_colors: bool,
    /// The input is already preprocessed source.
    pub direct_i_file: bool,
    pub dependency_target_specified: bool,
}

/// State owned for the lifetime of one invocation.
#[derive(Debug)]
pub struct Context {
    pub orig_args: Args,
    pub config: Config,
    pub args_info: ArgsInfo,
    /// Directory all relative paths are resolved against. Usually the
    /// process working directory, but owned here so processing stays
    /// hermetic.
    pub apparent_cwd: PathBuf,
    pub guessed_compiler: GuessedCompiler,
    /// Precompiled header pulled in via `-include` and friends, if any.
    pub included_pch_file: String,
}

impl Context {
    /// Build a context for `orig_args`, guessing the compiler from the
    /// first argument and taking the process working directory.
    pub fn new(config: Config, orig_args: Args) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::with_cwd(config, orig_args, cwd))
    }

    pub fn with_cwd(config: Config, orig_args: Args, apparent_cwd: PathBuf) -> Self {
        let guessed_compiler = orig_args
            .get(0)
            .map(|a| guess_compiler(a.full()))
            .unwrap_or(GuessedCompiler::Unknown);
        Context {
            orig_args,
            config,
            args_info: ArgsInfo::default(),
            apparent_cwd,
            guessed_compiler,
            included_pch_file: String::new(),
        }
    }

    /// Resolve a possibly relative path against the apparent working
    /// directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.apparent_cwd.join(p)
        }
    }

    /// Stat oracle. Advisory: a missing file returns `None`, never an
    /// error.
    pub fn stat(&self, path: &str) -> Option<FileStat> {
        let meta = fs::metadata(self.resolve(path)).ok()?;
        Some(FileStat {
            regular: meta.is_file(),
            directory: meta.is_dir(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guess_compiler() {
        assert_eq!(guess_compiler("/usr/bin/clang++"), GuessedCompiler::Clang);
        assert_eq!(guess_compiler("gcc-12"), GuessedCompiler::Gcc);
        assert_eq!(guess_compiler("/opt/bin/g++"), GuessedCompiler::Gcc);
        assert_eq!(guess_compiler("nvcc"), GuessedCompiler::Nvcc);
        assert_eq!(guess_compiler("cc"), GuessedCompiler::Unknown);
        assert_eq!(guess_compiler("icc"), GuessedCompiler::Unknown);
    }

    #[test]
    fn test_stat_resolves_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("foo.c"), "").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        let ctx = Context::with_cwd(
            Config::default(),
            Args::from_argv(&["cc"]),
            temp_dir.path().to_path_buf(),
        );

        assert!(ctx.stat("foo.c").unwrap().is_regular());
        assert!(ctx.stat("sub").unwrap().is_directory());
        assert!(ctx.stat("missing.c").is_none());
    }
}
