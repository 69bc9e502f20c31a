//! POSIX shell quoting for paths embedded in command strings.

use std::borrow::Cow;
use std::path::Path;

/// Quote `s` so `sh` reads it back as one literal word.
///
/// NUL bytes cannot be passed through a command line and are dropped.
pub fn shell_quote(s: &str) -> Cow<'_, str> {
    match shlex::try_quote(s) {
        Ok(quoted) => quoted,
        Err(_) => {
            let cleaned = s.replace('\0', "");
            Cow::Owned(shlex::try_quote(&cleaned).map(Cow::into_owned).unwrap_or_default())
        }
    }
}

/// Quote a path. Non UTF-8 bytes are replaced.
pub fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reads_back(s: &str) {
        let quoted = shell_quote(s);
        assert_eq!(shlex::split(&quoted), Some(vec![s.to_string()]), "{quoted}");
    }

    #[test]
    fn test_plain_words_pass_through() {
        assert_eq!(shell_quote("/data/run_01/Project-A/s1.fastq.gz"), "/data/run_01/Project-A/s1.fastq.gz");
    }

    #[test]
    fn test_spaces_and_metachars_are_quoted() {
        assert_eq!(shell_quote("my file"), "'my file'");
        assert_eq!(shell_quote("a;rm -rf"), "'a;rm -rf'");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
    }

    #[test]
    fn test_single_quotes_read_back() {
        reads_back("it's");
        reads_back("Project 'B' $x `y`");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_nul_is_dropped() {
        assert_eq!(shell_quote("a\0b"), "ab");
    }
}
