//! The argument processing engine.
//!
//! [`process_args`] consumes the context's original argument vector and
//! either produces the three derived vectors later stages feed on, or a
//! [`Statistic`] naming why the invocation cannot be cached. One pass over
//! the arguments routes every token to exactly one of four working vectors
//! (see [`ArgumentProcessingState`]); a fixup phase then derives defaults
//! and composes the outputs.

mod dispatch;

use tracing::debug;

use crate::args::{ArgSplit, Args, ParamSpec};
use crate::common::stats::Statistic;
use crate::context::{Context, GuessedCompiler};
use crate::language;
use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorDiagnostics {
    Never,
    Automatic,
    Always,
}

/// Scratch state for one processing run.
struct ArgumentProcessingState {
    found_c_opt: bool,
    found_dc_opt: bool,
    found_s_opt: bool,
    found_pch: bool,
    found_fpch_preprocess: bool,
    color_diagnostics: ColorDiagnostics,
    found_directives_only: bool,
    found_rewrite_includes: bool,

    /// As specified with -x.
    explicit_language: Option<String>,
    /// As deduced from the input file extension.
    file_language: Option<&'static str>,
    /// -finput-charset=...
    input_charset_option: Option<String>,

    /// Is the dependency makefile name overridden with -MF?
    dependency_filename_specified: bool,

    /// Is the dependency target name implicitly specified through
    /// DEPENDENCIES_OUTPUT or SUNPRO_DEPENDENCIES?
    dependency_implicit_target_specified: bool,

    /// Is the compiler asked for level 3 debug info?
    generating_debuginfo_level_3: bool,

    /// All original arguments except those that must not reach the
    /// preprocessor, those only the preprocessor should see and the
    /// dependency options.
    common_args: Args,

    /// Arguments only for the preprocessor; when `run_second_cpp` they go
    /// to the compiler as well.
    cpp_args: Args,

    /// Dependency options like -MD. Never passed to the compiler unless
    /// `run_second_cpp` routes them there.
    dep_args: Args,

    /// Arguments only for the compiler, never the preprocessor.
    compiler_only_args: Args,
}

impl ArgumentProcessingState {
    fn new() -> Self {
        ArgumentProcessingState {
            found_c_opt: false,
            found_dc_opt: false,
            found_s_opt: false,
            found_pch: false,
            found_fpch_preprocess: false,
            color_diagnostics: ColorDiagnostics::Automatic,
            found_directives_only: false,
            found_rewrite_includes: false,
            explicit_language: None,
            file_language: None,
            input_charset_option: None,
            dependency_filename_specified: false,
            dependency_implicit_target_specified: false,
            generating_debuginfo_level_3: false,
            common_args: Args::new(),
            cpp_args: Args::new(),
            dep_args: Args::new(),
            compiler_only_args: Args::new(),
        }
    }
}

/// The three derived argument vectors of a cacheable invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedArgs {
    /// Arguments the preprocessor runs with.
    pub preprocessor_args: Args,
    /// Arguments that don't reach the preprocessor but must enter the
    /// cache key.
    pub extra_args_to_hash: Args,
    /// Arguments the real compiler runs with.
    pub compiler_args: Args,
}

/// The multi-token parameters `process_args` fuses before dispatching.
/// Exposed so callers can build comparable vectors the same way.
pub fn default_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::new("--ccache-skip", &[ArgSplit::Space]),
        ParamSpec::new("-optf", &[ArgSplit::Space]),
        ParamSpec::new("--options-file", &[ArgSplit::Space]),
        ParamSpec::new("-arch", &[ArgSplit::Space]),
        ParamSpec::new("-x", &[ArgSplit::Space, ArgSplit::WrittenTogether]),
        ParamSpec::new(
            "-MF",
            &[ArgSplit::Space, ArgSplit::EqualSign, ArgSplit::WrittenTogether],
        ),
        ParamSpec::new("-MQ", &[ArgSplit::Space, ArgSplit::WrittenTogether]),
        ParamSpec::new("-MT", &[ArgSplit::Space, ArgSplit::WrittenTogether]),
    ]
}

fn add_depend_mode_extra_original_args(ctx: &mut Context, arg: &str) {
    // The compiler is invoked with the original arguments in depend mode;
    // collect extras that should be added there.
    if ctx.config.depend_mode {
        ctx.args_info.depend_extra_args.push_back_str(arg);
    }
}

fn handle_dependency_environment_variables(
    ctx: &mut Context,
    state: &mut ArgumentProcessingState,
) {
    // These work like -MMD/-MD (not -MM/-M) on GCC and do nothing on
    // Clang. The value is "file" or "file target".
    let (value, using_sunpro) = match std::env::var("DEPENDENCIES_OUTPUT") {
        Ok(v) => (v, false),
        Err(_) => match std::env::var("SUNPRO_DEPENDENCIES") {
            Ok(v) => (v, true),
            Err(_) => return,
        },
    };
    let env_name = if using_sunpro {
        "SUNPRO_DEPENDENCIES"
    } else {
        "DEPENDENCIES_OUTPUT"
    };

    ctx.args_info.generating_dependencies = true;
    state.dependency_filename_specified = true;

    let mut parts = value.split_whitespace();
    let file = match parts.next() {
        Some(file) => file.to_string(),
        None => return,
    };
    ctx.args_info.output_dep = util::make_relative_path(ctx, &file);

    match parts.next() {
        Some(target) => {
            // The "file target" form.
            ctx.args_info.dependency_target_specified = true;
            let relpath_obj = util::make_relative_path(ctx, target);
            // Ensure the compiler sees relative paths too.
            let relpath_both = format!("{} {}", ctx.args_info.output_dep, relpath_obj);
            std::env::set_var(env_name, relpath_both);
        }
        None => {
            // The "file" form.
            state.dependency_implicit_target_specified = true;
            std::env::set_var(env_name, &ctx.args_info.output_dep);
        }
    }
}

/// Process the context's original arguments into the three output vectors,
/// populating `ctx.args_info` along the way. A terminal [`Statistic`] means
/// the invocation is not cacheable (or is handled specially upstream).
pub fn process_args(ctx: &mut Context) -> Result<ProcessedArgs, Statistic> {
    if ctx.orig_args.is_empty() {
        return Err(Statistic::BadCompilerArguments);
    }

    // Work on a copy; @file and similar constructs splice into it.
    let mut args = ctx.orig_args.clone();
    for p in default_params() {
        args.add_param(&p.name, &p.splits);
    }

    let mut state = ArgumentProcessingState::new();

    state.common_args.push_back(args[0].clone()); // compiler

    let mut i = 1;
    while i < args.len() {
        dispatch::process_arg(ctx, &mut args, &mut i, &mut state)?;
        i += 1;
    }

    if state.generating_debuginfo_level_3 && !ctx.config.run_second_cpp {
        debug!("generating debug info level 3; not compiling preprocessed code");
        ctx.config.run_second_cpp = true;
    }

    handle_dependency_environment_variables(ctx, &mut state);

    if ctx.args_info.input_file.is_empty() {
        debug!("no input file found");
        return Err(Statistic::NoInputFile);
    }

    if state.found_pch || state.found_fpch_preprocess {
        ctx.args_info.using_precompiled_header = true;
        if !ctx.config.sloppiness.time_macros {
            debug!(
                "precompiled headers need \"time_macros\" sloppiness to get direct hits"
            );
            return Err(Statistic::CouldNotUsePrecompiledHeader);
        }
    }

    if ctx.args_info.profile_path.is_empty() {
        ctx.args_info.profile_path = ctx.apparent_cwd.display().to_string();
    }

    if state.explicit_language.as_deref() == Some("none") {
        state.explicit_language = None;
    }
    state.file_language = language::language_for_file(&ctx.args_info.input_file);
    ctx.args_info.actual_language = match &state.explicit_language {
        Some(lang) => {
            if !language::language_is_supported(lang) {
                debug!(language = lang.as_str(), "unsupported language");
                return Err(Statistic::UnsupportedSourceLanguage);
            }
            Some(lang.clone())
        }
        None => state.file_language.map(str::to_string),
    };

    let output_is_precompiled_header = ctx
        .args_info
        .actual_language
        .as_deref()
        .map_or(false, |l| l.contains("-header"))
        || util::is_precompiled_header(&ctx.args_info.output_obj);
    ctx.args_info.output_is_precompiled_header = output_is_precompiled_header;

    if output_is_precompiled_header && !ctx.config.sloppiness.pch_defines {
        debug!(
            "creating precompiled headers needs \"pch_defines,time_macros\" sloppiness"
        );
        return Err(Statistic::CouldNotUsePrecompiledHeader);
    }

    if !state.found_c_opt && !state.found_dc_opt && !state.found_s_opt {
        if output_is_precompiled_header {
            state.common_args.push_back_str("-c");
        } else {
            debug!("no -c option found");
            // Autoconf tests are the dominant form of "called for link";
            // counting them separately is useful.
            return Err(if ctx.args_info.input_file.contains("conftest.") {
                Statistic::AutoconfTest
            } else {
                Statistic::CalledForLink
            });
        }
    }

    let actual_language = match ctx.args_info.actual_language.clone() {
        Some(lang) => lang,
        None => {
            debug!(
                file = ctx.args_info.input_file.as_str(),
                "unsupported source extension"
            );
            return Err(Statistic::UnsupportedSourceLanguage);
        }
    };

    if !ctx.config.run_second_cpp && actual_language == "cu" {
        debug!("using CUDA compiler; not compiling preprocessed code");
        ctx.config.run_second_cpp = true;
    }

    ctx.args_info.direct_i_file = language::language_is_preprocessed(&actual_language);

    if output_is_precompiled_header && !ctx.config.run_second_cpp {
        // A .gch cannot be created from preprocessed source.
        debug!("creating precompiled header; not compiling preprocessed code");
        ctx.config.run_second_cpp = true;
    }

    if ctx.config.cpp_extension.is_empty() {
        if let Some(ext) = language::p_language_for_language(&actual_language)
            .and_then(language::extension_for_language)
        {
            ctx.config.cpp_extension = ext[1..].to_string();
        }
    }

    // Don't second-guess the compiler's stdout heuristics.
    if ctx.args_info.output_obj == "-" {
        debug!("output file is -");
        return Err(Statistic::OutputToStdout);
    }

    if ctx.args_info.output_obj.is_empty() {
        if output_is_precompiled_header {
            ctx.args_info.output_obj = format!("{}.gch", ctx.args_info.input_file);
        } else {
            let extension = if state.found_s_opt { ".s" } else { ".o" };
            ctx.args_info.output_obj =
                util::change_extension(util::base_name(&ctx.args_info.input_file), extension);
        }
    }

    if ctx.args_info.seen_split_dwarf {
        match ctx.args_info.output_obj.rfind('.') {
            Some(pos) if pos != ctx.args_info.output_obj.len() - 1 => {
                ctx.args_info.output_dwo =
                    util::change_extension(&ctx.args_info.output_obj, ".dwo");
            }
            _ => {
                debug!("badly formed object filename");
                return Err(Statistic::BadCompilerArguments);
            }
        }
    }

    // Cope with -o /dev/null.
    if ctx.args_info.output_obj != "/dev/null" {
        if let Some(st) = ctx.stat(&ctx.args_info.output_obj) {
            if !st.is_regular() {
                debug!(
                    file = ctx.args_info.output_obj.as_str(),
                    "not a regular file"
                );
                return Err(Statistic::BadOutputFile);
            }
        }
    }

    let output_dir = util::dir_name(&ctx.args_info.output_obj).to_string();
    match ctx.stat(&output_dir) {
        Some(st) if st.is_directory() => {}
        _ => {
            debug!(directory = output_dir.as_str(), "directory does not exist");
            return Err(Statistic::BadOutputFile);
        }
    }

    // Some options must not reach the compiler when it compiles
    // preprocessed code: -finput-charset (conversion would happen twice)
    // and -x (the wrong language would be selected).
    if let Some(option) = &state.input_charset_option {
        state.cpp_args.push_back_str(option);
    }
    if state.found_pch {
        state.cpp_args.push_back_str("-fpch-preprocess");
    }
    if let Some(lang) = state.explicit_language.clone() {
        state.cpp_args.push_back_str("-x");
        state.cpp_args.push_back_str(&lang);
    }

    ctx.args_info.strip_diagnostics_colors = match state.color_diagnostics {
        ColorDiagnostics::Never => true,
        ColorDiagnostics::Always => false,
        ColorDiagnostics::Automatic => !util::color_output_possible(),
    };

    // With output redirected the compiler won't color by default, so force
    // it explicitly.
    match ctx.guessed_compiler {
        GuessedCompiler::Clang => {
            if actual_language != "assembler" {
                if !ctx.config.run_second_cpp {
                    state.cpp_args.push_back_str("-fcolor-diagnostics");
                }
                state.compiler_only_args.push_back_str("-fcolor-diagnostics");
                add_depend_mode_extra_original_args(ctx, "-fcolor-diagnostics");
            }
        }
        GuessedCompiler::Gcc => {
            if !ctx.config.run_second_cpp {
                state.cpp_args.push_back_str("-fdiagnostics-color");
            }
            state.compiler_only_args.push_back_str("-fdiagnostics-color");
            add_depend_mode_extra_original_args(ctx, "-fdiagnostics-color");
        }
        _ => {
            // Other compilers don't color their output.
            ctx.args_info.strip_diagnostics_colors = false;
        }
    }

    if ctx.args_info.generating_dependencies {
        if !state.dependency_filename_specified {
            let default_depfile_name =
                util::change_extension(&ctx.args_info.output_obj, ".d");
            ctx.args_info.output_dep = util::make_relative_path(ctx, &default_depfile_name);
            if !ctx.config.run_second_cpp {
                // The preprocessor gets the dep args and doesn't know the
                // final object path, so point -MF at the right .d file.
                state.dep_args.push_back_str("-MF");
                state.dep_args.push_back_str(&default_depfile_name);
            }
        }

        if !ctx.args_info.dependency_target_specified
            && !state.dependency_implicit_target_specified
            && !ctx.config.run_second_cpp
        {
            // Ditto for the target object name in the .d file.
            state.dep_args.push_back_str("-MQ");
            state.dep_args.push_back_str(&ctx.args_info.output_obj);
        }
    }

    if ctx.args_info.generating_coverage {
        let gcno = util::change_extension(&ctx.args_info.output_obj, ".gcno");
        ctx.args_info.output_cov = util::make_relative_path(ctx, &gcno);
    }

    if ctx.args_info.generating_stackusage {
        let sufile = util::change_extension(&ctx.args_info.output_obj, ".su");
        ctx.args_info.output_su = util::make_relative_path(ctx, &sufile);
    }

    let mut compiler_args = state.common_args.clone();
    compiler_args.extend(&state.compiler_only_args);

    if ctx.config.run_second_cpp {
        compiler_args.extend(&state.cpp_args);
    } else if state.found_directives_only || state.found_rewrite_includes {
        // The macros and other preprocessor directives are needed again.
        compiler_args.extend(&state.cpp_args);
        if state.found_directives_only {
            state.cpp_args.push_back_str("-fdirectives-only");
            // The preprocessed source still needs more preprocessing.
            compiler_args.push_back_str("-fpreprocessed");
            compiler_args.push_back_str("-fdirectives-only");
        }
        if state.found_rewrite_includes {
            state.cpp_args.push_back_str("-frewrite-includes");
            compiler_args.push_back_str("-x");
            compiler_args.push_back_str(&actual_language);
        }
    } else if let Some(lang) = &state.explicit_language {
        // Distcc-style distribution doesn't reset -x, so the preprocessed
        // language must be given explicitly.
        compiler_args.push_back_str("-x");
        if let Some(p_language) = language::p_language_for_language(lang) {
            compiler_args.push_back_str(p_language);
        }
    }

    if state.found_c_opt {
        compiler_args.push_back_str("-c");
    }
    if state.found_dc_opt {
        compiler_args.push_back_str("-dc");
    }

    for arch in &ctx.args_info.arch_args {
        compiler_args.push_back_str("-arch");
        compiler_args.push_back_str(arch);
    }

    let mut preprocessor_args = state.common_args.clone();
    preprocessor_args.extend(&state.cpp_args);

    if ctx.config.run_second_cpp {
        // Dependency arguments go to the compiler: it runs with original
        // sources and e.g. EDG-based compilers don't support -MQ.
        compiler_args.extend(&state.dep_args);
    } else {
        // The compiler won't produce a .d from preprocessed source, so the
        // preprocessor takes the dependency arguments.
        preprocessor_args.extend(&state.dep_args);
    }

    let mut extra_args_to_hash = state.compiler_only_args.clone();
    if ctx.config.run_second_cpp {
        extra_args_to_hash.extend(&state.dep_args);
    }

    Ok(ProcessedArgs {
        preprocessor_args,
        extra_args_to_hash,
        compiler_args,
    })
}
