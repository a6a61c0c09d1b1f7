//! Compiler option classification.
//!
//! One static table carries everything the argument processor needs to know
//! about an option: whether it defeats caching, whether it consumes the next
//! token, whether its argument is a path that should be relativized, and
//! whether it matters to the preprocessor or only to the compiler proper.
//! Unknown options return `false` from every predicate.

const TOO_HARD: u32 = 1 << 0;
const TOO_HARD_DIRECT: u32 = 1 << 1;
const TAKES_ARG: u32 = 1 << 2;
const TAKES_CONCAT_ARG: u32 = 1 << 3;
const TAKES_PATH: u32 = 1 << 4;
const AFFECTS_CPP: u32 = 1 << 5;
const AFFECTS_COMP: u32 = 1 << 6;

struct CompOpt {
    name: &'static str,
    flags: u32,
}

const fn opt(name: &'static str, flags: u32) -> CompOpt {
    CompOpt { name, flags }
}

// Sorted by byte value; the exact lookup binary-searches.
static COMPOPTS: &[CompOpt] = &[
    opt("--Werror", AFFECTS_COMP), // nvcc
    opt("--analyze", TOO_HARD),    // Clang
    opt("--ccache-skip", TAKES_ARG),
    opt("--compiler-bindir", AFFECTS_COMP | TAKES_ARG), // nvcc
    opt("--config", AFFECTS_COMP | TAKES_ARG),          // Clang
    opt("--libdevice-directory", AFFECTS_COMP | TAKES_ARG), // nvcc
    opt("--output-directory", AFFECTS_COMP | TAKES_ARG), // nvcc
    opt("--param", TAKES_ARG),
    opt("--save-temps", TOO_HARD),
    opt("--save-temps=cwd", TOO_HARD),
    opt("--save-temps=obj", TOO_HARD),
    opt("--serialize-diagnostics", TAKES_ARG | TAKES_PATH),
    opt("-A", TAKES_ARG),
    opt("-B", TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-D", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG),
    opt("-E", TOO_HARD),
    opt("-F", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-G", TAKES_ARG),
    opt("-I", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-L", TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-M", TOO_HARD),
    opt("-MF", TAKES_ARG),
    opt("-MM", TOO_HARD),
    opt("-MQ", TAKES_ARG),
    opt("-MT", TAKES_ARG),
    opt("-P", TOO_HARD),
    opt("-U", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG),
    opt("-V", TAKES_ARG),
    opt("-Wa,", TAKES_CONCAT_ARG | AFFECTS_COMP),
    opt("-Werror", AFFECTS_COMP), // don't exit with error when preprocessing
    opt("-Wl,", TAKES_CONCAT_ARG | AFFECTS_COMP),
    opt("-Wno-error", AFFECTS_COMP),
    opt("-Xassembler", TAKES_ARG | AFFECTS_COMP),
    opt("-Xclang", TAKES_ARG),
    opt("-Xlinker", TAKES_ARG | AFFECTS_COMP),
    opt("-Xpreprocessor", AFFECTS_CPP | TOO_HARD_DIRECT | TAKES_ARG),
    opt("-all_load", AFFECTS_COMP),
    opt("-analyze", TOO_HARD), // Clang
    opt("-arch", TAKES_ARG),
    opt("-aux-info", TAKES_ARG),
    opt("-b", TAKES_ARG),
    opt("-bind_at_load", AFFECTS_COMP),
    opt("-bundle", AFFECTS_COMP),
    opt("-bundle_loader", TAKES_ARG | AFFECTS_COMP),
    opt("-ccbin", AFFECTS_COMP | TAKES_ARG), // nvcc
    opt("-fno-working-directory", AFFECTS_CPP),
    opt("-fplugin=libcc1plugin", TOO_HARD), // interaction with GDB
    opt("-frepo", TOO_HARD),
    opt("-ftime-trace", TOO_HARD), // Clang
    opt("-fworking-directory", AFFECTS_CPP),
    opt("-gtoggle", TOO_HARD),
    opt("-idirafter", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-iframework", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-imacros", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-imultilib", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-include", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-include-pch", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-include-pth", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-install_name", TAKES_ARG | AFFECTS_COMP), // macOS linker
    opt("-iprefix", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-iquote", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-isysroot", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-isystem", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-iwithprefix", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-iwithprefixbefore", AFFECTS_CPP | TAKES_ARG | TAKES_CONCAT_ARG | TAKES_PATH),
    opt("-ldir", TAKES_ARG), // nvcc
    opt("-nolibc", AFFECTS_COMP),
    opt("-nostdinc", AFFECTS_CPP),
    opt("-nostdinc++", AFFECTS_CPP),
    opt("-odir", TAKES_ARG), // nvcc
    opt("-pie", AFFECTS_COMP),
    opt("-prebind", AFFECTS_COMP),
    opt("-preload", AFFECTS_COMP),
    opt("-rdynamic", AFFECTS_COMP),
    opt("-remap", AFFECTS_CPP),
    opt("-save-temps", TOO_HARD),
    opt("-save-temps=cwd", TOO_HARD),
    opt("-save-temps=obj", TOO_HARD),
    opt("-stdlib=", AFFECTS_CPP | TAKES_CONCAT_ARG),
    opt("-trigraphs", AFFECTS_CPP),
    opt("-u", TAKES_ARG | TAKES_CONCAT_ARG),
];

fn find(option: &str) -> Option<&'static CompOpt> {
    COMPOPTS
        .binary_search_by(|c| c.name.cmp(option))
        .ok()
        .map(|i| &COMPOPTS[i])
}

fn find_prefix(option: &str) -> Option<&'static CompOpt> {
    COMPOPTS.iter().find(|c| option.starts_with(c.name))
}

fn has_flag(option: &str, flag: u32) -> bool {
    find(option).map_or(false, |c| c.flags & flag != 0)
}

fn prefix_has_flag(option: &str, flag: u32) -> bool {
    find_prefix(option).map_or(false, |c| c.flags & flag != 0)
}

/// The option defeats caching entirely.
pub fn too_hard(option: &str) -> bool {
    has_flag(option, TOO_HARD)
}

/// The option forces fallback from direct mode to preprocessor mode.
pub fn too_hard_for_direct_mode(option: &str) -> bool {
    has_flag(option, TOO_HARD_DIRECT)
}

/// The option consumes the next token as its argument.
pub fn takes_arg(option: &str) -> bool {
    has_flag(option, TAKES_ARG)
}

/// The option's argument may be glued to it (`-I/path`).
pub fn takes_concat_arg(option: &str) -> bool {
    has_flag(option, TAKES_CONCAT_ARG)
}

/// The option's argument is a filesystem path.
pub fn takes_path(option: &str) -> bool {
    has_flag(option, TAKES_PATH)
}

/// The option influences preprocessing output.
pub fn affects_cpp(option: &str) -> bool {
    has_flag(option, AFFECTS_CPP)
}

/// Some entry in the table is a prefix of the option and influences
/// preprocessing output.
pub fn prefix_affects_cpp(option: &str) -> bool {
    prefix_has_flag(option, AFFECTS_CPP)
}

/// The option influences compilation only and must not reach the
/// preprocessor.
pub fn affects_comp(option: &str) -> bool {
    has_flag(option, AFFECTS_COMP)
}

/// Prefix variant of [`affects_comp`].
pub fn prefix_affects_comp(option: &str) -> bool {
    prefix_has_flag(option, AFFECTS_COMP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted() {
        for pair in COMPOPTS.windows(2) {
            assert!(
                pair[0].name < pair[1].name,
                "{} must sort before {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn test_cpp_and_comp_are_disjoint() {
        for c in COMPOPTS {
            assert!(
                c.flags & AFFECTS_CPP == 0 || c.flags & AFFECTS_COMP == 0,
                "{} claims to affect both preprocessing and compilation",
                c.name
            );
        }
    }

    #[test]
    fn test_exact_lookup() {
        assert!(too_hard("-save-temps"));
        assert!(too_hard("-M"));
        assert!(!too_hard("-MD"));
        assert!(too_hard_for_direct_mode("-Xpreprocessor"));
        assert!(takes_arg("-include"));
        assert!(takes_concat_arg("-I"));
        assert!(takes_path("-isystem"));
        assert!(affects_cpp("-D"));
        assert!(affects_comp("-Werror"));
        assert!(!affects_comp("-D"));
    }

    #[test]
    fn test_prefix_lookup() {
        assert!(prefix_affects_comp("-Wa,-mbig-obj"));
        assert!(prefix_affects_comp("-Xlinker,fum"));
        assert!(prefix_affects_cpp("-DFOO=bar"));
        assert!(prefix_affects_cpp("-stdlib=libc++"));
        assert!(!prefix_affects_cpp("-Wall"));
    }

    #[test]
    fn test_unknown_options_are_all_false() {
        for option in ["-funknown", "--weird", "-Wall", "foo.c"] {
            assert!(!too_hard(option));
            assert!(!too_hard_for_direct_mode(option));
            assert!(!takes_arg(option));
            assert!(!takes_concat_arg(option));
            assert!(!takes_path(option));
            assert!(!affects_cpp(option));
            assert!(!affects_comp(option));
        }
    }
}
