//! Command-line argument model.
//!
//! An [`Arg`] is one command-line token, optionally split into a key and a
//! value across a known separator so that rewrites can preserve the original
//! gluing style (`-MF=x` vs `-MF x` vs `-MFx`). [`Args`] is an ordered
//! sequence of tokens with bulk mutation operations and a reparse pass
//! ([`Args::add_param`]) that fuses registered multi-token options.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::common::error::{CompcacheError, Result};

/// How an option key and its value were joined on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgSplit {
    /// The token is not an option/value pair.
    None,
    /// `key=value`
    EqualSign,
    /// `key value` (two tokens fused into one)
    Space,
    /// `keyvalue`
    WrittenTogether,
}

impl ArgSplit {
    fn separator(self) -> &'static str {
        match self {
            ArgSplit::None => unreachable!("no separator for an unsplit arg"),
            ArgSplit::EqualSign => "=",
            ArgSplit::Space => " ",
            ArgSplit::WrittenTogether => "",
        }
    }
}

/// One command-line token.
///
/// Equality and hashing consider the rendered form and the split style, so a
/// fused `-MF foo.d` compares different from an unrelated plain token only by
/// its text.
#[derive(Debug, Clone)]
pub struct Arg {
    full: String,
    key_len: usize,
    split: ArgSplit,
}

impl Arg {
    /// Parse a raw token. A token containing `=` is split on the first `=`.
    pub fn from_token(token: &str) -> Self {
        match token.find('=') {
            Some(pos) => Arg {
                full: token.to_string(),
                key_len: pos,
                split: ArgSplit::EqualSign,
            },
            None => Arg {
                full: token.to_string(),
                key_len: 0,
                split: ArgSplit::None,
            },
        }
    }

    /// Build an option/value pair with an explicit split style.
    ///
    /// `ArgSplit::None` is not a valid pair style and is rejected.
    pub fn from_parts(key: &str, split: ArgSplit, value: &str) -> Result<Self> {
        if split == ArgSplit::None {
            return Err(CompcacheError::InvalidArg(format!(
                "cannot join {:?} and {:?} without a separator style",
                key, value
            )));
        }
        Ok(Self::join(key, split, value))
    }

    pub(crate) fn join(key: &str, split: ArgSplit, value: &str) -> Self {
        debug_assert!(split != ArgSplit::None);
        Arg {
            full: format!("{}{}{}", key, split.separator(), value),
            key_len: key.len(),
            split,
        }
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn key(&self) -> &str {
        if self.has_been_split() {
            &self.full[..self.key_len]
        } else {
            ""
        }
    }

    pub fn value(&self) -> &str {
        match self.split {
            ArgSplit::None => "",
            ArgSplit::EqualSign | ArgSplit::Space => &self.full[self.key_len + 1..],
            ArgSplit::WrittenTogether => &self.full[self.key_len..],
        }
    }

    pub fn split_char(&self) -> ArgSplit {
        self.split
    }

    pub fn has_been_split(&self) -> bool {
        self.split != ArgSplit::None
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full && self.split == other.split
    }
}

impl Eq for Arg {}

impl Hash for Arg {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full.hash(state);
        self.split.hash(state);
    }
}

impl PartialEq<&str> for Arg {
    fn eq(&self, other: &&str) -> bool {
        self.full == *other
    }
}

impl PartialEq<str> for Arg {
    fn eq(&self, other: &str) -> bool {
        self.full == other
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// A multi-token option and the join styles [`Args::add_param`] may fuse.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub splits: Vec<ArgSplit>,
}

impl ParamSpec {
    pub fn new(name: &str, splits: &[ArgSplit]) -> Self {
        ParamSpec {
            name: name.to_string(),
            splits: splits.to_vec(),
        }
    }
}

/// An ordered, mutable argument vector.
#[derive(Debug, Clone, Default)]
pub struct Args {
    args: VecDeque<Arg>,
    params: Vec<ParamSpec>,
}

impl Args {
    pub fn new() -> Self {
        Args::default()
    }

    /// Copy a raw argv verbatim, one [`Arg`] per element.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Self {
        let mut args = Args::new();
        for a in argv {
            args.push_back(Arg::from_token(a.as_ref()));
        }
        args
    }

    /// Shell-like split of a command string: backslash escapes the next
    /// character, single and double quotes delimit literal runs. The given
    /// parameter registrations are applied after tokenization.
    pub fn from_string(command: &str, params: &[ParamSpec]) -> Self {
        let mut args = Args::new();
        for token in split_command(command) {
            args.push_back(Arg::from_token(&token));
        }
        for p in params {
            args.add_param(&p.name, &p.splits);
        }
        args
    }

    /// Read a GCC-style `@file` response file.
    ///
    /// Tokenization follows GCC: backslash escapes the next character; each
    /// of `'`, `"` and backtick groups characters until the matching closing
    /// quote; unquoted whitespace (space, tab, newline, CR, VT, FF)
    /// separates tokens.
    pub fn from_gcc_atfile<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|_| CompcacheError::BadArgFile(path.as_ref().display().to_string()))?;
        let mut args = Args::new();
        for token in split_atfile(&text) {
            args.push_back(Arg::from_token(&token));
        }
        Ok(args)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arg> {
        self.args.iter()
    }

    /// The argument list as raw strings, suitable for joining into an exec
    /// vector. Fused pairs render as their joined form.
    pub fn to_argv(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.full()).collect()
    }

    pub fn push_back(&mut self, arg: Arg) {
        self.args.push_back(arg);
    }

    pub fn push_back_str(&mut self, token: &str) {
        self.args.push_back(Arg::from_token(token));
    }

    pub fn push_front(&mut self, arg: Arg) {
        self.args.push_front(arg);
    }

    /// Remove the last `count` arguments.
    pub fn pop_back(&mut self, count: usize) {
        for _ in 0..count {
            self.args.pop_back();
        }
    }

    /// Remove the first `count` arguments.
    pub fn pop_front(&mut self, count: usize) {
        for _ in 0..count {
            self.args.pop_front();
        }
    }

    /// Append all arguments of `other`.
    pub fn extend(&mut self, other: &Args) {
        for arg in other.iter() {
            self.args.push_back(arg.clone());
        }
    }

    /// Insert all arguments of `other` at `index`.
    pub fn insert(&mut self, index: usize, other: &Args) {
        for arg in other.iter().rev() {
            self.args.insert(index, arg.clone());
        }
    }

    /// Replace the argument at `index` with all arguments of `other`.
    pub fn replace(&mut self, index: usize, other: &Args) {
        self.args.remove(index);
        self.insert(index, other);
    }

    /// Remove every argument whose rendered form starts with `prefix`.
    pub fn erase_with_prefix(&mut self, prefix: &str) {
        self.args.retain(|a| !a.full().starts_with(prefix));
    }

    /// Register a multi-token parameter and reparse the vector, fusing
    /// occurrences according to the allowed split styles. Returns how many
    /// occurrences were found. The pass is idempotent.
    pub fn add_param(&mut self, name: &str, splits: &[ArgSplit]) -> usize {
        self.params.push(ParamSpec::new(name, splits));

        let mut found = 0;
        let mut i = 0;
        while i < self.args.len() {
            let arg = &self.args[i];
            if splits.contains(&ArgSplit::Space)
                && !arg.has_been_split()
                && arg.full() == name
                && i + 1 < self.args.len()
                && !self.args[i + 1].full().starts_with('-')
            {
                if let Some(value) = self.args.remove(i + 1) {
                    self.args[i] = Arg::join(name, ArgSplit::Space, value.full());
                    found += 1;
                }
            } else if splits.contains(&ArgSplit::WrittenTogether)
                && !arg.has_been_split()
                && arg.full().len() > name.len()
                && arg.full().starts_with(name)
            {
                let value = arg.full()[name.len()..].to_string();
                self.args[i] = Arg::join(name, ArgSplit::WrittenTogether, &value);
                found += 1;
            } else if splits.contains(&ArgSplit::EqualSign)
                && arg.split_char() == ArgSplit::EqualSign
                && arg.key() == name
            {
                found += 1;
            }
            i += 1;
        }
        found
    }

    /// The parameter registrations recorded so far.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }
}

impl PartialEq for Args {
    fn eq(&self, other: &Self) -> bool {
        self.args == other.args
    }
}

impl Eq for Args {}

impl std::ops::Index<usize> for Args {
    type Output = Arg;

    fn index(&self, index: usize) -> &Arg {
        &self.args[index]
    }
}

impl std::ops::IndexMut<usize> for Args {
    fn index_mut(&mut self, index: usize) -> &mut Arg {
        &mut self.args[index]
    }
}

impl fmt::Display for Args {
    /// Space-delimited rendering. No quoting is performed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arg in &self.args {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(arg.full())?;
            first = false;
        }
        Ok(())
    }
}

fn split_command(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut chars = command.chars();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    has_token = true;
                }
            }
            '\'' | '"' if quote == Some(c) => {
                quote = None;
            }
            '\'' | '"' if quote.is_none() => {
                quote = Some(c);
                has_token = true;
            }
            c if quote.is_none() && (c == ' ' || c == '\t') => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

fn is_atfile_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{b}' | '\u{c}')
}

fn split_atfile(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    has_token = true;
                }
            }
            '\'' | '"' | '`' => {
                // Quote runs group characters until the matching close quote;
                // backslash still escapes inside.
                has_token = true;
                while let Some(q) = chars.next() {
                    match q {
                        '\\' => {
                            if let Some(next) = chars.next() {
                                current.push(next);
                            }
                        }
                        q if q == c => break,
                        q => current.push(q),
                    }
                }
            }
            c if is_atfile_whitespace(c) => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_token_with_equal_sign() {
        let arg = Arg::from_token("-MF=foo.d");
        assert_eq!(arg.full(), "-MF=foo.d");
        assert_eq!(arg.key(), "-MF");
        assert_eq!(arg.value(), "foo.d");
        assert_eq!(arg.split_char(), ArgSplit::EqualSign);
        assert!(arg.has_been_split());
    }

    #[test]
    fn test_from_token_plain() {
        let arg = Arg::from_token("-c");
        assert_eq!(arg.full(), "-c");
        assert_eq!(arg.key(), "");
        assert_eq!(arg.value(), "");
        assert!(!arg.has_been_split());
    }

    #[test]
    fn test_from_parts_round_trip() {
        let built = Arg::from_parts("-MF", ArgSplit::EqualSign, "foo.d").unwrap();
        assert_eq!(built, Arg::from_token("-MF=foo.d"));

        let spaced = Arg::from_parts("-MF", ArgSplit::Space, "foo.d").unwrap();
        assert_eq!(spaced.full(), "-MF foo.d");
        assert_eq!(spaced.value(), "foo.d");

        let glued = Arg::from_parts("-MF", ArgSplit::WrittenTogether, "foo.d").unwrap();
        assert_eq!(glued.full(), "-MFfoo.d");
        assert_eq!(glued.value(), "foo.d");
    }

    #[test]
    fn test_from_parts_rejects_unsplit() {
        assert!(Arg::from_parts("-MF", ArgSplit::None, "foo.d").is_err());
    }

    #[test]
    fn test_from_string_tokenization() {
        let args = Args::from_string(r#"cc -DX='a b' -c "foo bar.c" back\ slash"#, &[]);
        let argv = args.to_argv();
        assert_eq!(argv, vec!["cc", "-DX=a b", "-c", "foo bar.c", "back slash"]);
    }

    #[test]
    fn test_add_param_space_fusion() {
        let mut args = Args::from_string("cc -MF foo.d -c foo.c", &[]);
        let found = args.add_param("-MF", &[ArgSplit::Space, ArgSplit::WrittenTogether]);
        assert_eq!(found, 1);
        assert_eq!(args.len(), 4);
        assert_eq!(args[1].key(), "-MF");
        assert_eq!(args[1].value(), "foo.d");
        assert_eq!(args[1].split_char(), ArgSplit::Space);
    }

    #[test]
    fn test_add_param_written_together_fusion() {
        let mut args = Args::from_string("cc -MFfoo.d -c foo.c", &[]);
        args.add_param("-MF", &[ArgSplit::Space, ArgSplit::WrittenTogether]);
        assert_eq!(args[1].value(), "foo.d");
        assert_eq!(args[1].split_char(), ArgSplit::WrittenTogether);
    }

    #[test]
    fn test_add_param_skips_option_values() {
        // A following token that looks like an option is not a value.
        let mut args = Args::from_string("cc -MF -c foo.c", &[]);
        let found = args.add_param("-MF", &[ArgSplit::Space]);
        assert_eq!(found, 0);
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_add_param_is_idempotent() {
        let mut once = Args::from_string("cc -x c -xc++ -MF=d foo.c", &[]);
        once.add_param("-x", &[ArgSplit::Space, ArgSplit::WrittenTogether]);
        once.add_param(
            "-MF",
            &[ArgSplit::Space, ArgSplit::EqualSign, ArgSplit::WrittenTogether],
        );
        let mut twice = once.clone();
        twice.add_param("-x", &[ArgSplit::Space, ArgSplit::WrittenTogether]);
        twice.add_param(
            "-MF",
            &[ArgSplit::Space, ArgSplit::EqualSign, ArgSplit::WrittenTogether],
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn test_mutations() {
        let mut args = Args::from_string("a b c d", &[]);
        args.pop_front(1);
        args.pop_back(1);
        assert_eq!(args.to_argv(), vec!["b", "c"]);

        args.push_front(Arg::from_token("front"));
        args.push_back_str("back");
        assert_eq!(args.to_argv(), vec!["front", "b", "c", "back"]);

        let sub = Args::from_string("x y", &[]);
        args.replace(1, &sub);
        assert_eq!(args.to_argv(), vec!["front", "x", "y", "c", "back"]);

        args.insert(0, &sub);
        assert_eq!(args.to_argv(), vec!["x", "y", "front", "x", "y", "c", "back"]);
    }

    #[test]
    fn test_erase_with_prefix() {
        let mut args = Args::from_string("cc -I. -Ifoo -c foo.c", &[]);
        args.erase_with_prefix("-I");
        assert_eq!(args.to_argv(), vec!["cc", "-c", "foo.c"]);
    }

    #[test]
    fn test_to_string_joins_with_spaces() {
        let args = Args::from_string("cc -c foo.c", &[]);
        assert_eq!(args.to_string(), "cc -c foo.c");
    }

    #[test]
    fn test_atfile_tokenization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opts.rsp");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, "-DX=1\n\t-I 'quoted dir'\r\n\"two words\" back\\ slash `tick`").unwrap();
        drop(f);

        let args = Args::from_gcc_atfile(&path).unwrap();
        assert_eq!(
            args.to_argv(),
            vec!["-DX=1", "-I", "quoted dir", "two words", "back slash", "tick"]
        );
    }

    #[test]
    fn test_atfile_missing_file() {
        assert!(Args::from_gcc_atfile("/nonexistent/opts.rsp").is_err());
    }
}
