//! Source language tables.
//!
//! Maps file extensions to languages, languages to their preprocessed
//! counterparts and preprocessed languages back to the extension the
//! preprocessed file should carry. Extension matching is case sensitive:
//! `.C` is C++, `.c` is C.

/// File extension to language.
static EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    (".c", "c"),
    (".C", "c++"),
    (".cc", "c++"),
    (".CC", "c++"),
    (".cp", "c++"),
    (".CP", "c++"),
    (".cpp", "c++"),
    (".CPP", "c++"),
    (".cxx", "c++"),
    (".CXX", "c++"),
    (".c++", "c++"),
    (".C++", "c++"),
    (".m", "objective-c"),
    (".M", "objective-c++"),
    (".mm", "objective-c++"),
    (".sx", "assembler-with-cpp"),
    (".S", "assembler-with-cpp"),
    (".cu", "cu"),
    // Preprocessed:
    (".i", "cpp-output"),
    (".ii", "c++-cpp-output"),
    (".mi", "objective-c-cpp-output"),
    (".mii", "objective-c++-cpp-output"),
    (".s", "assembler"),
    // Header files (for precompilation):
    (".h", "c-header"),
    (".H", "c++-header"),
    (".h++", "c++-header"),
    (".H++", "c++-header"),
    (".hh", "c++-header"),
    (".HH", "c++-header"),
    (".hp", "c++-header"),
    (".HP", "c++-header"),
    (".hpp", "c++-header"),
    (".HPP", "c++-header"),
    (".hxx", "c++-header"),
    (".HXX", "c++-header"),
    (".tcc", "c++-header"),
    (".TCC", "c++-header"),
];

/// Language to the language of its preprocessed form.
static PREPROCESSED_LANGUAGES: &[(&str, &str)] = &[
    ("c", "cpp-output"),
    ("cpp-output", "cpp-output"),
    ("c-header", "cpp-output"),
    ("c++", "c++-cpp-output"),
    ("c++-cpp-output", "c++-cpp-output"),
    ("c++-header", "c++-cpp-output"),
    ("cu", "cpp-output"),
    ("objective-c", "objective-c-cpp-output"),
    ("objective-c-header", "objective-c-cpp-output"),
    ("objc-cpp-output", "objective-c-cpp-output"),
    ("objective-c-cpp-output", "objective-c-cpp-output"),
    ("objective-c++", "objective-c++-cpp-output"),
    ("objc++-cpp-output", "objective-c++-cpp-output"),
    ("objective-c++-header", "objective-c++-cpp-output"),
    ("objective-c++-cpp-output", "objective-c++-cpp-output"),
    ("assembler-with-cpp", "assembler"),
    ("assembler", "assembler"),
];

/// Preprocessed language to the extension of the preprocessed file.
static PREPROCESSED_EXTENSIONS: &[(&str, &str)] = &[
    ("cpp-output", ".i"),
    ("c++-cpp-output", ".ii"),
    ("objective-c-cpp-output", ".mi"),
    ("objective-c++-cpp-output", ".mii"),
    ("assembler", ".s"),
];

/// The language deduced from a file name's extension, if recognized.
pub fn language_for_file(fname: &str) -> Option<&'static str> {
    let ext = match fname.rfind(['.', '/']) {
        Some(pos) if fname.as_bytes()[pos] == b'.' => &fname[pos..],
        _ => return None,
    };
    EXTENSION_LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, l)| *l)
}

/// The language the preprocessor turns `language` into.
pub fn p_language_for_language(language: &str) -> Option<&'static str> {
    PREPROCESSED_LANGUAGES
        .iter()
        .find(|(l, _)| *l == language)
        .map(|(_, p)| *p)
}

/// The extension a preprocessed file of `p_language` should carry.
pub fn extension_for_language(p_language: &str) -> Option<&'static str> {
    PREPROCESSED_EXTENSIONS
        .iter()
        .find(|(p, _)| *p == p_language)
        .map(|(_, e)| *e)
}

pub fn language_is_supported(language: &str) -> bool {
    p_language_for_language(language).is_some()
}

/// True when the language denotes already-preprocessed source.
pub fn language_is_preprocessed(language: &str) -> bool {
    p_language_for_language(language) == Some(language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_file() {
        assert_eq!(language_for_file("foo.c"), Some("c"));
        assert_eq!(language_for_file("foo.C"), Some("c++"));
        assert_eq!(language_for_file("dir.with.dots/foo.cpp"), Some("c++"));
        assert_eq!(language_for_file("foo.mm"), Some("objective-c++"));
        assert_eq!(language_for_file("foo.cu"), Some("cu"));
        assert_eq!(language_for_file("foo.i"), Some("cpp-output"));
        assert_eq!(language_for_file("foo.hpp"), Some("c++-header"));
        assert_eq!(language_for_file("foo.o"), None);
        assert_eq!(language_for_file("foo"), None);
    }

    #[test]
    fn test_preprocessed_language() {
        assert_eq!(p_language_for_language("c"), Some("cpp-output"));
        assert_eq!(p_language_for_language("c++-header"), Some("c++-cpp-output"));
        assert_eq!(p_language_for_language("fortran"), None);
    }

    #[test]
    fn test_every_language_round_trips_to_an_extension() {
        for (lang, p_lang) in PREPROCESSED_LANGUAGES {
            assert!(
                extension_for_language(p_lang).is_some(),
                "{} maps to {} which has no extension",
                lang,
                p_lang
            );
        }
    }

    #[test]
    fn test_language_is_preprocessed() {
        assert!(language_is_preprocessed("cpp-output"));
        assert!(language_is_preprocessed("assembler"));
        assert!(!language_is_preprocessed("c"));
        assert!(!language_is_preprocessed("assembler-with-cpp"));
    }

    #[test]
    fn test_language_is_supported() {
        assert!(language_is_supported("c"));
        assert!(language_is_supported("cu"));
        assert!(!language_is_supported("rust"));
    }
}
