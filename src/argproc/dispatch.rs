//! Per-argument dispatch rules.
//!
//! [`process_arg`] classifies one argument; the first matching rule wins
//! and the ordering is part of the contract. `Ok(())` means the argument
//! was routed or consumed; an error is a terminal statistic.

use tracing::debug;

use super::{ArgumentProcessingState, ColorDiagnostics};
use crate::args::{Arg, ArgSplit, Args};
use crate::common::stats::Statistic;
use crate::compopt;
use crate::context::{Context, GuessedCompiler};
use crate::language;
use crate::util;

pub(super) fn process_arg(
    ctx: &mut Context,
    args: &mut Args,
    args_index: &mut usize,
    state: &mut ArgumentProcessingState,
) -> Result<(), Statistic> {
    let mut cur = args[*args_index].clone();

    // The user knows best: just swallow the next arg.
    if cur.key() == "--ccache-skip" {
        state.common_args.push_back_str(cur.value());
        return Ok(());
    }

    // Special case for -E.
    if cur == "-E" {
        return Err(Statistic::CalledForPreprocessing);
    }

    // Handle "@file" and "-@file" response files.
    if cur.full().starts_with('@') || cur.full().starts_with("-@") {
        let argpath = match cur.full().strip_prefix("-@") {
            Some(rest) => rest,
            None => &cur.full()[1..],
        };
        let file_args = match Args::from_gcc_atfile(ctx.resolve(argpath)) {
            Ok(file_args) => file_args,
            Err(_) => {
                debug!(file = argpath, "couldn't read arg file");
                return Err(Statistic::BadCompilerArguments);
            }
        };
        // Splice in the file contents and reprocess from the same index.
        args.replace(*args_index, &file_args);
        *args_index -= 1;
        return Ok(());
    }

    // CUDA -optf / --options-file: a comma-separated list of files.
    if ctx.guessed_compiler == GuessedCompiler::Nvcc
        && (cur.key() == "-optf" || cur.key() == "--options-file")
    {
        let paths: Vec<&str> = cur.value().split(',').collect();
        for path in paths.iter().rev() {
            let file_args = match Args::from_gcc_atfile(ctx.resolve(path)) {
                Ok(file_args) => file_args,
                Err(_) => {
                    debug!(file = *path, "couldn't read CUDA options file");
                    return Err(Statistic::BadCompilerArguments);
                }
            };
            args.insert(*args_index + 1, &file_args);
        }
        return Ok(());
    }

    // These are always too hard.
    if compopt::too_hard(cur.full())
        || cur.full().starts_with("-fdump-")
        || cur.full().starts_with("-MJ")
    {
        debug!(option = cur.full(), "compiler option is unsupported");
        return Err(Statistic::UnsupportedCompilerOption);
    }

    // These are too hard in direct mode.
    if ctx.config.direct_mode && compopt::too_hard_for_direct_mode(cur.full()) {
        debug!(
            option = cur.full(),
            "unsupported compiler option for direct mode"
        );
        ctx.config.direct_mode = false;
    }

    // -Xarch_* options are too hard.
    if cur.full().starts_with("-Xarch_") {
        debug!(option = cur.full(), "unsupported compiler option");
        return Err(Statistic::UnsupportedCompilerOption);
    }

    if cur.key() == "-arch" {
        ctx.args_info.arch_args.push(cur.value().to_string());
        if ctx.args_info.arch_args.len() == 2 {
            ctx.config.run_second_cpp = true;
        }
        return Ok(());
    }

    // Clang feeds some PCH-related options straight to cc1. Route the
    // -Xclang token and classify the cc1 argument by the normal rules.
    if cur == "-Xclang" && *args_index < args.len() - 1 {
        let next = args[*args_index + 1].clone();
        if next == "-emit-pch"
            || next == "-emit-pth"
            || next == "-include-pch"
            || next == "-include-pth"
            || next == "-fno-pch-timestamp"
        {
            if compopt::affects_comp(next.full()) {
                state.compiler_only_args.push_back_str("-Xclang");
            } else if compopt::affects_cpp(next.full()) {
                state.cpp_args.push_back_str("-Xclang");
            } else {
                state.common_args.push_back_str("-Xclang");
            }
            *args_index += 1;
            cur = next;
        }
    }

    // Options that should not be passed to the preprocessor.
    if compopt::affects_comp(cur.full()) {
        state.compiler_only_args.push_back(cur.clone());
        if compopt::takes_arg(cur.full())
            || (ctx.guessed_compiler == GuessedCompiler::Nvcc && cur == "-Werror")
        {
            if *args_index == args.len() - 1 {
                debug!(option = cur.full(), "missing argument");
                return Err(Statistic::BadCompilerArguments);
            }
            state
                .compiler_only_args
                .push_back(args[*args_index + 1].clone());
            *args_index += 1;
        }
        return Ok(());
    }
    if compopt::prefix_affects_comp(cur.full()) {
        state.compiler_only_args.push_back(cur.clone());
        return Ok(());
    }

    // Modules are built on demand in the background and need not be
    // cached themselves, but the hash then misses their content, so an
    // explicit sloppiness bit is required on top of direct depend mode.
    if cur == "-fmodules" {
        if !ctx.config.depend_mode || !ctx.config.direct_mode {
            debug!("-fmodules is unsupported without direct depend mode");
            return Err(Statistic::CouldNotUseModules);
        } else if !ctx.config.sloppiness.modules {
            debug!("\"modules\" sloppiness is required with -fmodules to get hits");
            return Err(Statistic::CouldNotUseModules);
        }
    }

    // We must have -c.
    if cur == "-c" {
        state.found_c_opt = true;
        return Ok(());
    }

    // With nvcc's separable compilation, -dc implies -c.
    if (cur == "-dc" || cur == "--device-c")
        && ctx.guessed_compiler == GuessedCompiler::Nvcc
    {
        state.found_dc_opt = true;
        return Ok(());
    }

    // -S changes the default extension.
    if cur == "-S" {
        state.common_args.push_back(cur.clone());
        state.found_s_opt = true;
        return Ok(());
    }

    if cur.key() == "-x" {
        // -xCODE (e.g. -xHost, -xCORE-AVX2) is an ordinary Intel compiler
        // option, not a language: GCC's -x argument is always lowercase.
        let lowercase_value = cur
            .value()
            .chars()
            .next()
            .map_or(false, |c| c.is_lowercase());
        if !lowercase_value {
            state.common_args.push_back(cur.clone());
        } else if ctx.args_info.input_file.is_empty() {
            // Remember the last language given before the input file; all
            // -x options are stripped from the output.
            state.explicit_language = Some(cur.value().to_string());
        }
        return Ok(());
    }

    // Work out where the output goes.
    if cur == "-o" {
        if *args_index == args.len() - 1 {
            debug!(option = cur.full(), "missing argument");
            return Err(Statistic::BadCompilerArguments);
        }
        let path = args[*args_index + 1].full().to_string();
        ctx.args_info.output_obj = util::make_relative_path(ctx, &path);
        *args_index += 1;
        return Ok(());
    }

    // Alternate form of -o with no space. Nvcc does not support this.
    if cur.full().starts_with("-o") && ctx.guessed_compiler != GuessedCompiler::Nvcc {
        let path = cur.full()[2..].to_string();
        ctx.args_info.output_obj = util::make_relative_path(ctx, &path);
        return Ok(());
    }

    if cur.key() == "-fdebug-prefix-map" || cur.key() == "-ffile-prefix-map" {
        ctx.args_info.debug_prefix_maps.push(cur.value().to_string());
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    // Debugging is handled specially so we know whether line number info
    // can be stripped.
    if cur.full().starts_with("-g") {
        state.common_args.push_back(cur.clone());

        if cur.full().starts_with("-gdwarf") {
            // -gdwarf or -gdwarf-<version> enables debug info on level 2.
            ctx.args_info.generating_debuginfo = true;
            return Ok(());
        }
        if cur.full().starts_with("-gz") {
            // -gz[=type] neither disables nor enables debug info.
            return Ok(());
        }

        match cur.full().bytes().last() {
            Some(b'0') => {
                // "-g0", "-ggdb0" or similar: all debug info disabled.
                ctx.args_info.generating_debuginfo = false;
                state.generating_debuginfo_level_3 = false;
            }
            last => {
                ctx.args_info.generating_debuginfo = true;
                if last == Some(b'3') {
                    state.generating_debuginfo_level_3 = true;
                }
                if cur == "-gsplit-dwarf" {
                    ctx.args_info.seen_split_dwarf = true;
                }
            }
        }
        return Ok(());
    }

    // These behave differently with gcc -E when the output file is not
    // specified, hence the special handling.
    if cur == "-MD" || cur == "-MMD" {
        ctx.args_info.generating_dependencies = true;
        ctx.args_info.seen_md_mmd = true;
        state.dep_args.push_back(cur.clone());
        return Ok(());
    }

    if cur.key() == "-MF" {
        state.dependency_filename_specified = true;
        let dep_file = util::make_relative_path(ctx, cur.value());
        // -MF=file is re-emitted as -MFfile.
        let split = if cur.split_char() == ArgSplit::EqualSign {
            ArgSplit::WrittenTogether
        } else {
            cur.split_char()
        };
        state.dep_args.push_back(Arg::join("-MF", split, &dep_file));
        return Ok(());
    }

    if cur.key() == "-MQ" || cur.key() == "-MT" {
        ctx.args_info.dependency_target_specified = true;
        let relpath = util::make_relative_path(ctx, cur.value());
        state
            .dep_args
            .push_back(Arg::join(cur.key(), cur.split_char(), &relpath));
        return Ok(());
    }

    if cur == "-fprofile-arcs" {
        ctx.args_info.profile_arcs = true;
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    if cur == "-ftest-coverage" {
        ctx.args_info.generating_coverage = true;
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    if cur == "-fstack-usage" {
        ctx.args_info.generating_stackusage = true;
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    if cur == "--coverage"      // = -fprofile-arcs -ftest-coverage
        || cur == "-coverage"   // Undocumented but still works.
    {
        ctx.args_info.profile_arcs = true;
        ctx.args_info.generating_coverage = true;
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    if cur.full().starts_with("-fprofile-")
        || cur.full().starts_with("-fauto-profile")
        || cur == "-fbranch-probabilities"
    {
        match process_profiling_option(ctx, &cur) {
            Some(arg) => state.common_args.push_back(arg),
            None => return Err(Statistic::UnsupportedCompilerOption),
        }
        return Ok(());
    }

    if cur.key() == "-fsanitize-blacklist" {
        ctx.args_info
            .sanitize_blacklists
            .push(cur.value().to_string());
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    if cur.key() == "--sysroot" {
        let relpath = util::make_relative_path(ctx, cur.value());
        state.common_args.push_back_str(&format!("--sysroot={}", relpath));
        return Ok(());
    }

    // Alternate form of specifying sysroot without =
    if cur == "--sysroot" {
        if *args_index == args.len() - 1 {
            debug!(option = cur.full(), "missing argument");
            return Err(Statistic::BadCompilerArguments);
        }
        state.common_args.push_back(cur.clone());
        let relpath = util::make_relative_path(ctx, args[*args_index + 1].full());
        state.common_args.push_back_str(&relpath);
        *args_index += 1;
        return Ok(());
    }

    // Alternate form of specifying target without =
    if cur == "-target" {
        if *args_index == args.len() - 1 {
            debug!(option = cur.full(), "missing argument");
            return Err(Statistic::BadCompilerArguments);
        }
        state.common_args.push_back(cur.clone());
        state.common_args.push_back(args[*args_index + 1].clone());
        *args_index += 1;
        return Ok(());
    }

    if cur.full().starts_with("-Wp,") {
        return process_wp_option(ctx, state, &cur);
    }

    if cur == "-MP" {
        state.dep_args.push_back(cur.clone());
        return Ok(());
    }

    // Input charset needs to be handled specially.
    if cur.key() == "-finput-charset" {
        state.input_charset_option = Some(cur.full().to_string());
        return Ok(());
    }

    if cur == "--serialize-diagnostics" {
        if *args_index == args.len() - 1 {
            debug!(option = cur.full(), "missing argument");
            return Err(Statistic::BadCompilerArguments);
        }
        ctx.args_info.generating_diagnostics = true;
        let path = args[*args_index + 1].full().to_string();
        ctx.args_info.output_dia = util::make_relative_path(ctx, &path);
        *args_index += 1;
        return Ok(());
    }

    if cur == "-fcolor-diagnostics"
        || cur == "-fdiagnostics-color"
        || cur == "-fdiagnostics-color=always"
    {
        state.color_diagnostics = ColorDiagnostics::Always;
        return Ok(());
    }
    if cur == "-fno-color-diagnostics"
        || cur == "-fno-diagnostics-color"
        || cur == "-fdiagnostics-color=never"
    {
        state.color_diagnostics = ColorDiagnostics::Never;
        return Ok(());
    }
    if cur == "-fdiagnostics-color=auto" {
        state.color_diagnostics = ColorDiagnostics::Automatic;
        return Ok(());
    }

    // GCC
    if cur == "-fdirectives-only" {
        state.found_directives_only = true;
        return Ok(());
    }
    // Clang
    if cur == "-frewrite-includes" {
        state.found_rewrite_includes = true;
        return Ok(());
    }

    if cur == "-fno-pch-timestamp" {
        ctx.args_info.fno_pch_timestamp = true;
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    if cur == "-fpch-preprocess" {
        state.found_fpch_preprocess = true;
        state.common_args.push_back(cur.clone());
        return Ok(());
    }

    // Xcode 9 or later passes an index store path containing a UUID that
    // would defeat cache sharing.
    if ctx.config.sloppiness.clang_index_store && cur == "-index-store-path" {
        *args_index += 1;
        if *args_index < args.len() {
            debug!("skipping -index-store-path and its argument");
        }
        return Ok(());
    }

    // Options with a path argument we may want to rewrite relative for a
    // better hit rate. A side effect is that paths in compiler stderr are
    // normalized.
    if compopt::takes_path(cur.full()) {
        if *args_index == args.len() - 1 {
            debug!(option = cur.full(), "missing argument");
            return Err(Statistic::BadCompilerArguments);
        }

        // In the -Xclang -include-pch -Xclang <path> form the path is one
        // index further behind.
        let next = if args[*args_index + 1] == "-Xclang" && *args_index + 2 < args.len() {
            2
        } else {
            1
        };

        let path_arg = args[*args_index + next].full().to_string();
        if !detect_pch(ctx, cur.full(), &path_arg, next == 2, &mut state.found_pch) {
            return Err(Statistic::BadCompilerArguments);
        }

        let relpath = util::make_relative_path(ctx, &path_arg);
        let dest_args = if compopt::affects_cpp(cur.full()) {
            &mut state.cpp_args
        } else {
            &mut state.common_args
        };
        dest_args.push_back(cur.clone());
        if next == 2 {
            dest_args.push_back(args[*args_index + 1].clone());
        }
        dest_args.push_back_str(&relpath);

        *args_index += next;
        return Ok(());
    }

    // Same as above but with the path concatenated onto the option,
    // starting with a slash.
    if cur.full().starts_with('-') {
        if let Some(slash_pos) = cur.full().find('/') {
            let option = cur.full()[..slash_pos].to_string();
            if compopt::takes_concat_arg(&option) && compopt::takes_path(&option) {
                let relpath = util::make_relative_path(ctx, &cur.full()[slash_pos..]);
                let new_option = format!("{}{}", option, relpath);
                if compopt::affects_cpp(&option) {
                    state.cpp_args.push_back_str(&new_option);
                } else {
                    state.common_args.push_back_str(&new_option);
                }
                return Ok(());
            }
        }
    }

    // Options that take an argument.
    if compopt::takes_arg(cur.full()) {
        if *args_index == args.len() - 1 {
            debug!(option = cur.full(), "missing argument");
            return Err(Statistic::BadCompilerArguments);
        }
        let next = args[*args_index + 1].clone();
        if compopt::affects_cpp(cur.full()) {
            state.cpp_args.push_back(cur.clone());
            state.cpp_args.push_back(next);
        } else {
            state.common_args.push_back(cur.clone());
            state.common_args.push_back(next);
        }
        *args_index += 1;
        return Ok(());
    }

    // Other options.
    if cur.full().starts_with('-') {
        if compopt::affects_cpp(cur.full()) || compopt::prefix_affects_cpp(cur.full()) {
            state.cpp_args.push_back(cur.clone());
        } else {
            state.common_args.push_back(cur.clone());
        }
        return Ok(());
    }

    // A token that isn't a plain file is assumed to be an option, which
    // copes better with unusual compiler flags. "/dev/null" is an
    // exception commonly used as input when probing compiler flags.
    if cur != "/dev/null" {
        match ctx.stat(cur.full()) {
            Some(st) if st.is_regular() => {}
            _ => {
                debug!(
                    token = cur.full(),
                    "not a regular file, not considering as input file"
                );
                state.common_args.push_back(cur.clone());
                return Ok(());
            }
        }
    }

    if !ctx.args_info.input_file.is_empty() {
        if language::language_for_file(cur.full()).is_some() {
            debug!(
                first = ctx.args_info.input_file.as_str(),
                second = cur.full(),
                "multiple input files"
            );
            return Err(Statistic::MultipleSourceFiles);
        } else if !state.found_c_opt && !state.found_dc_opt {
            debug!(file = cur.full(), "called for link");
            return Err(if cur.full().contains("conftest.") {
                Statistic::AutoconfTest
            } else {
                Statistic::CalledForLink
            });
        } else {
            debug!(file = cur.full(), "unsupported source extension");
            return Err(Statistic::UnsupportedSourceLanguage);
        }
    }

    if ctx.args_info.generating_coverage {
        // The source path goes into the coverage notes verbatim.
        ctx.args_info.input_file = cur.full().to_string();
        return Ok(());
    }

    // Rewrite to relative to increase hit rate.
    let relpath = util::make_relative_path(ctx, cur.full());
    ctx.args_info.input_file = relpath;

    Ok(())
}

fn detect_pch(
    ctx: &mut Context,
    option: &str,
    arg: &str,
    is_cc1_option: bool,
    found_pch: &mut bool,
) -> bool {
    // Clang doesn't pick up a precompiled header merely because one sits
    // next to the header, so for cc1 options neither do we.
    let mut pch_file = String::new();
    if option == "-include-pch" || option == "-include-pth" {
        if ctx.stat(arg).is_some() {
            debug!(file = arg, "detected use of precompiled header");
            pch_file = arg.to_string();
        }
    } else if !is_cc1_option {
        for extension in [".gch", ".pch", ".pth"] {
            let path = format!("{}{}", arg, extension);
            if ctx.stat(&path).is_some() {
                debug!(file = path.as_str(), "detected use of precompiled header");
                pch_file = path;
            }
        }
    }

    if !pch_file.is_empty() {
        if !ctx.included_pch_file.is_empty() {
            debug!(
                first = ctx.included_pch_file.as_str(),
                second = pch_file.as_str(),
                "multiple precompiled headers used"
            );
            return false;
        }
        ctx.included_pch_file = pch_file;
        *found_pch = true;
    }
    true
}

fn process_profiling_option(ctx: &mut Context, arg: &Arg) -> Option<Arg> {
    const KNOWN_SIMPLE_OPTIONS: [&str; 4] = [
        "-fprofile-correction",
        "-fprofile-reorder-functions",
        "-fprofile-sample-accurate",
        "-fprofile-values",
    ];

    if KNOWN_SIMPLE_OPTIONS.contains(&arg.full()) {
        return Some(arg.clone());
    }

    let mut out = arg.clone();
    let mut new_profile_path = String::new();
    let mut new_profile_use = false;

    if arg.key() == "-fprofile-dir" {
        out = resolve_profile_dir(ctx, arg);
        new_profile_path = out.value().to_string();
    } else if *arg == "-fprofile-generate" || *arg == "-fprofile-instr-generate" {
        ctx.args_info.profile_generate = true;
        new_profile_path = if ctx.guessed_compiler == GuessedCompiler::Clang {
            ".".to_string()
        } else {
            // GCC uses $PWD/$(basename $obj).
            ctx.apparent_cwd.display().to_string()
        };
    } else if arg.key() == "-fprofile-generate" || arg.key() == "-fprofile-instr-generate" {
        ctx.args_info.profile_generate = true;
        out = resolve_profile_dir(ctx, arg);
        new_profile_path = out.value().to_string();
    } else if *arg == "-fprofile-use"
        || *arg == "-fprofile-instr-use"
        || *arg == "-fprofile-sample-use"
        || *arg == "-fbranch-probabilities"
        || *arg == "-fauto-profile"
    {
        new_profile_use = true;
        if ctx.args_info.profile_path.is_empty() {
            new_profile_path = ".".to_string();
        }
    } else if arg.key() == "-fprofile-use"
        || arg.key() == "-fprofile-instr-use"
        || arg.key() == "-fprofile-sample-use"
        || arg.key() == "-fauto-profile"
    {
        new_profile_use = true;
        out = resolve_profile_dir(ctx, arg);
        new_profile_path = out.value().to_string();
    } else {
        debug!(option = arg.full(), "unknown profiling option");
        return None;
    }

    if new_profile_use {
        if ctx.args_info.profile_use {
            debug!("multiple profiling options not supported");
            return None;
        }
        ctx.args_info.profile_use = true;
    }

    if !new_profile_path.is_empty() {
        ctx.args_info.profile_path = new_profile_path;
        debug!(
            path = ctx.args_info.profile_path.as_str(),
            "set profile directory"
        );
    }

    if ctx.args_info.profile_generate && ctx.args_info.profile_use {
        // Too hard to figure out what the compiler will do.
        debug!("both generating and using profile info, giving up");
        return None;
    }

    Some(out)
}

/// Rewrite a profile directory to its real path when it exists so the key
/// doesn't depend on how the directory was spelled.
fn resolve_profile_dir(ctx: &Context, arg: &Arg) -> Arg {
    let value = arg.value();
    if let Some(st) = ctx.stat(value) {
        if st.is_directory() {
            if let Some(real) = util::real_path(&ctx.resolve(value)) {
                return Arg::join(arg.key(), arg.split_char(), &real.display().to_string());
            }
        }
    }
    arg.clone()
}

fn process_wp_option(
    ctx: &mut Context,
    state: &mut ArgumentProcessingState,
    arg: &Arg,
) -> Result<(), Statistic> {
    let full = arg.full();

    if full == "-Wp,-P" || full.contains(",-P,") || full.ends_with(",-P") {
        // -P strips preprocessor information in a way that makes the
        // object file differ from an uncached compilation.
        debug!("too hard option -Wp,-P detected");
        return Err(Statistic::UnsupportedCompilerOption);
    }

    if let Some(dep) = full.strip_prefix("-Wp,-MD,") {
        if !dep.contains(',') {
            ctx.args_info.generating_dependencies = true;
            state.dependency_filename_specified = true;
            ctx.args_info.output_dep = util::make_relative_path(ctx, dep);
            state.dep_args.push_back(arg.clone());
            return Ok(());
        }
    }
    if let Some(dep) = full.strip_prefix("-Wp,-MMD,") {
        if !dep.contains(',') {
            ctx.args_info.generating_dependencies = true;
            state.dependency_filename_specified = true;
            ctx.args_info.output_dep = util::make_relative_path(ctx, dep);
            state.dep_args.push_back(arg.clone());
            return Ok(());
        }
    }
    if let Some(macro_def) = full.strip_prefix("-Wp,-D") {
        if !macro_def.contains(',') {
            // Treat it like -D.
            state.cpp_args.push_back_str(&full[4..]);
            return Ok(());
        }
    }

    let bytes = full.as_bytes();
    let single_dep_arg = full == "-Wp,-MP"
        || (bytes.len() > 8
            && full.starts_with("-Wp,-M")
            && matches!(bytes[6], b'F' | b'Q' | b'T')
            && bytes[7] == b','
            && !full[8..].contains(','));
    if single_dep_arg {
        // TODO: make the -MF/-MQ/-MT argument relative.
        state.dep_args.push_back(arg.clone());
        return Ok(());
    }

    if ctx.config.direct_mode {
        // -Wp, can smuggle arbitrarily hard options to the preprocessor.
        debug!(option = full, "unsupported compiler option for direct mode");
        ctx.config.direct_mode = false;
    }

    // Any other -Wp,* argument only matters to the preprocessor.
    state.cpp_args.push_back(arg.clone());
    Ok(())
}
