//! Path and terminal helpers shared across the crate.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::context::Context;

/// The part of `path` after the last slash.
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// The part of `path` before the last slash, `.` when there is none.
pub fn dir_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(pos) => &path[..pos],
        None => ".",
    }
}

/// The extension of `path` including the dot, or `""`. Dots in directory
/// components do not count.
pub fn get_extension(path: &str) -> &str {
    match path.rfind(['.', '/']) {
        Some(pos) if path.as_bytes()[pos] == b'.' => &path[pos..],
        _ => "",
    }
}

/// Replace (or append) the extension of `path` with `new_ext` (including
/// the dot).
pub fn change_extension(path: &str, new_ext: &str) -> String {
    let stem = &path[..path.len() - get_extension(path).len()];
    format!("{}{}", stem, new_ext)
}

pub fn is_absolute_path(path: &str) -> bool {
    path.starts_with('/')
}

/// Whether `path` names a precompiled header artifact.
pub fn is_precompiled_header(path: &str) -> bool {
    matches!(get_extension(path), ".gch" | ".pch" | ".pth")
}

/// Resolve symlinks and `..` components, if the path exists.
pub fn real_path(path: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok()
}

/// Length of the common directory prefix of two absolute paths, i.e. the
/// byte offset of the slash after the last shared component.
fn common_dir_prefix_length(dir: &str, path: &str) -> usize {
    let dir_parts: Vec<&str> = dir.split('/').filter(|c| !c.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let mut len = 0;
    for (d, p) in dir_parts.iter().zip(path_parts.iter()) {
        if d != p {
            break;
        }
        len += 1 + d.len();
    }
    len
}

/// Express the absolute `path` relative to the absolute directory `dir`.
/// Paths at or below `dir` render with a `./` prefix; others climb with
/// `..` components.
pub fn get_relative_path(dir: &str, path: &str) -> String {
    debug_assert!(is_absolute_path(dir));
    debug_assert!(is_absolute_path(path));

    let common = common_dir_prefix_length(dir, path);
    let ups = dir[common..].split('/').filter(|c| !c.is_empty()).count();
    let rest = path[common..].trim_matches('/');

    if ups == 0 {
        if rest.is_empty() {
            ".".to_string()
        } else {
            format!("./{}", rest)
        }
    } else {
        let mut result = vec![".."; ups].join("/");
        if !rest.is_empty() {
            result.push('/');
            result.push_str(rest);
        }
        result
    }
}

/// Lexically squash `.` and `..` components of an absolute path.
fn normalize_absolute_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            c => parts.push(c),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Canonicalize where the filesystem allows, falling back to canonicalizing
/// the parent directory and finally to lexical normalization.
fn canonical_or_normalized(path: &str) -> String {
    if let Some(real) = real_path(Path::new(path)) {
        return real.display().to_string();
    }
    let dir = dir_name(path);
    let base = base_name(path);
    if let Some(real_dir) = real_path(Path::new(dir)) {
        return format!("{}/{}", real_dir.display(), base);
    }
    normalize_absolute_path(path)
}

/// Rewrite an absolute path under the configured base directory to one
/// relative to the apparent working directory. Anything else passes
/// through untouched.
pub fn make_relative_path(ctx: &Context, path: &str) -> String {
    let base_dir = &ctx.config.base_dir;
    if base_dir.is_empty() || !is_absolute_path(path) || !path.starts_with(base_dir.as_str()) {
        return path.to_string();
    }
    let normalized = canonical_or_normalized(path);
    let cwd = ctx.apparent_cwd.display().to_string();
    get_relative_path(&cwd, &normalized)
}

/// Whether the compiler could sensibly color its stderr output.
pub fn color_output_possible() -> bool {
    let term_ok = std::env::var("TERM")
        .map(|t| !t.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false);
    std::io::stderr().is_terminal() && term_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_and_dir_name() {
        assert_eq!(base_name("/a/b/c.o"), "c.o");
        assert_eq!(base_name("c.o"), "c.o");
        assert_eq!(dir_name("/a/b/c.o"), "/a/b");
        assert_eq!(dir_name("c.o"), ".");
        assert_eq!(dir_name("/c.o"), "/");
    }

    #[test]
    fn test_change_extension() {
        assert_eq!(change_extension("foo.c", ".o"), "foo.o");
        assert_eq!(change_extension("foo", ".o"), "foo.o");
        assert_eq!(change_extension("a.b/foo", ".o"), "a.b/foo.o");
        assert_eq!(change_extension("a/foo.c.in", ".d"), "a/foo.c.d");
    }

    #[test]
    fn test_is_precompiled_header() {
        assert!(is_precompiled_header("pre.h.gch"));
        assert!(is_precompiled_header("pre.pch"));
        assert!(is_precompiled_header("pre.pth"));
        assert!(!is_precompiled_header("pre.h"));
    }

    #[test]
    fn test_get_relative_path_below_cwd() {
        assert_eq!(get_relative_path("/work", "/work/foo/bar"), "./foo/bar");
        assert_eq!(get_relative_path("/work", "/work"), ".");
        assert_eq!(get_relative_path("/", "/work"), "./work");
    }

    #[test]
    fn test_get_relative_path_above_cwd() {
        assert_eq!(get_relative_path("/work/sub", "/work"), "..");
        assert_eq!(get_relative_path("/work/sub", "/work/other"), "../other");
        assert_eq!(get_relative_path("/a/b/c", "/a/x"), "../../x");
    }

    #[test]
    fn test_normalize_absolute_path() {
        assert_eq!(normalize_absolute_path("/a/./b//c"), "/a/b/c");
        assert_eq!(normalize_absolute_path("/a/b/../c"), "/a/c");
        assert_eq!(normalize_absolute_path("/.."), "/");
    }
}
