use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Outcome of a cache attempt, doubling as a statistics counter key.
///
/// The argument processor returns one of these when an invocation cannot be
/// cached; the wrapper additionally counts hits, misses and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    None = 0,
    CacheHitDirect,
    CacheHitPreprocessed,
    CacheMiss,
    CompileFailed,
    CalledForLink,
    CalledForPreprocessing,
    AutoconfTest,
    MultipleSourceFiles,
    UnsupportedSourceLanguage,
    UnsupportedCompilerOption,
    BadCompilerArguments,
    BadOutputFile,
    OutputToStdout,
    NoInputFile,
    CouldNotUseModules,
    CouldNotUsePrecompiledHeader,
}

impl Statistic {
    pub const ALL: [Statistic; 17] = [
        Statistic::None,
        Statistic::CacheHitDirect,
        Statistic::CacheHitPreprocessed,
        Statistic::CacheMiss,
        Statistic::CompileFailed,
        Statistic::CalledForLink,
        Statistic::CalledForPreprocessing,
        Statistic::AutoconfTest,
        Statistic::MultipleSourceFiles,
        Statistic::UnsupportedSourceLanguage,
        Statistic::UnsupportedCompilerOption,
        Statistic::BadCompilerArguments,
        Statistic::BadOutputFile,
        Statistic::OutputToStdout,
        Statistic::NoInputFile,
        Statistic::CouldNotUseModules,
        Statistic::CouldNotUsePrecompiledHeader,
    ];

    pub fn message(&self) -> &'static str {
        match self {
            Statistic::None => "no statistic",
            Statistic::CacheHitDirect => "cache hit (direct)",
            Statistic::CacheHitPreprocessed => "cache hit (preprocessed)",
            Statistic::CacheMiss => "cache miss",
            Statistic::CompileFailed => "compile failed",
            Statistic::CalledForLink => "called for link",
            Statistic::CalledForPreprocessing => "called for preprocessing",
            Statistic::AutoconfTest => "autoconf compile/link",
            Statistic::MultipleSourceFiles => "multiple source files",
            Statistic::UnsupportedSourceLanguage => "unsupported source language",
            Statistic::UnsupportedCompilerOption => "unsupported compiler option",
            Statistic::BadCompilerArguments => "bad compiler arguments",
            Statistic::BadOutputFile => "could not write to output file",
            Statistic::OutputToStdout => "compiler produced stdout",
            Statistic::NoInputFile => "no input file",
            Statistic::CouldNotUseModules => "could not use modules",
            Statistic::CouldNotUsePrecompiledHeader => "could not use precompiled header",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Statistics counters, one slot per [`Statistic`].
#[derive(Debug, Clone, Default)]
pub struct Counters {
    counters: Vec<u64>,
}

impl Counters {
    pub fn new() -> Self {
        Counters::default()
    }

    pub fn get(&self, statistic: Statistic) -> u64 {
        self.get_raw(statistic as usize)
    }

    pub fn set(&mut self, statistic: Statistic, value: u64) {
        self.set_raw(statistic as usize, value);
    }

    pub fn get_raw(&self, index: usize) -> u64 {
        self.counters.get(index).copied().unwrap_or(0)
    }

    pub fn set_raw(&mut self, index: usize, value: u64) {
        if index >= self.counters.len() {
            self.counters.resize(index + 1, 0);
        }
        self.counters[index] = value;
    }

    pub fn increment(&mut self, statistic: Statistic, value: u64) {
        let current = self.get(statistic);
        self.set(statistic, current + value);
    }

    pub fn size(&self) -> usize {
        self.counters.len()
    }

    /// Return true if all counters are zero, false otherwise.
    pub fn all_zero(&self) -> bool {
        self.counters.iter().all(|c| *c == 0)
    }

    /// Load counters from a stats file, one value per line by counter
    /// index. A missing file yields zeroed counters.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut counters = Counters::new();
        let content = match fs::read_to_string(path.as_ref()) {
            Ok(content) => content,
            Err(_) => return Ok(counters),
        };
        for (index, line) in content.lines().enumerate() {
            let value = line
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Bad counter value in stats file: {:?}", line))?;
            counters.set_raw(index, value);
        }
        Ok(counters)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut content = String::new();
        for value in &self.counters {
            content.push_str(&value.to_string());
            content.push('\n');
        }
        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write stats to {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_counters_get_set_increment() {
        let mut counters = Counters::new();
        assert!(counters.all_zero());
        assert_eq!(counters.get(Statistic::CacheMiss), 0);

        counters.increment(Statistic::CacheMiss, 1);
        counters.increment(Statistic::CacheMiss, 2);
        assert_eq!(counters.get(Statistic::CacheMiss), 3);
        assert!(!counters.all_zero());

        counters.set(Statistic::CalledForLink, 7);
        assert_eq!(counters.get(Statistic::CalledForLink), 7);
        // Slots below the highest written index exist but stay zero.
        assert_eq!(counters.get(Statistic::CacheHitDirect), 0);
    }

    #[test]
    fn test_counters_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stats");

        let mut counters = Counters::new();
        counters.increment(Statistic::CacheHitDirect, 4);
        counters.increment(Statistic::UnsupportedCompilerOption, 2);
        counters.save(&path).unwrap();

        let loaded = Counters::load(&path).unwrap();
        assert_eq!(loaded.get(Statistic::CacheHitDirect), 4);
        assert_eq!(loaded.get(Statistic::UnsupportedCompilerOption), 2);
        assert_eq!(loaded.get(Statistic::CacheMiss), 0);
    }

    #[test]
    fn test_counters_missing_file_is_zeroed() {
        let loaded = Counters::load("/nonexistent/stats").unwrap();
        assert!(loaded.all_zero());
    }
}
