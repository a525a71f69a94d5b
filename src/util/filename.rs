//! Numbered output file names
//!
//! A pattern such as `atari###.avi` expands to `atari000.avi`,
//! `atari001.avi`, ... The run of `#` characters sets the number of digits.
//! A pattern without `#` names a single file that is overwritten each time.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Widest counter a pattern may ask for
const MAX_DIGITS: usize = 9;

/// Parsed file name pattern with the last number handed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePattern {
    prefix: String,
    digits: usize,
    suffix: String,
    last: Option<u32>,
}

impl FilenamePattern {
    /// Parse a pattern, using the first run of `#` as the counter
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::config("Empty filename pattern"));
        }

        let (prefix, digits, suffix) = match pattern.find('#') {
            Some(start) => {
                let digits = pattern[start..].chars().take_while(|&c| c == '#').count();
                if digits > MAX_DIGITS {
                    return Err(Error::config(format!(
                        "Filename pattern '{}' has more than {} digits",
                        pattern, MAX_DIGITS
                    )));
                }
                (
                    pattern[..start].to_string(),
                    digits,
                    pattern[start + digits..].to_string(),
                )
            }
            None => (pattern.to_string(), 0, String::new()),
        };

        Ok(FilenamePattern {
            prefix,
            digits,
            suffix,
            last: None,
        })
    }

    /// Largest number the pattern can hold
    pub fn max_number(&self) -> u32 {
        if self.digits == 0 {
            0
        } else {
            10u32.pow(self.digits as u32) - 1
        }
    }

    /// Whether the pattern contains a counter
    pub fn is_numbered(&self) -> bool {
        self.digits > 0
    }

    /// Expand the pattern for a given number
    pub fn format(&self, number: u32) -> String {
        if self.digits == 0 {
            return self.prefix.clone();
        }
        format!(
            "{}{:0width$}{}",
            self.prefix,
            number,
            self.suffix,
            width = self.digits
        )
    }

    /// Next name after the last one handed out that does not exist on disk.
    ///
    /// Returns `None` once every number in the pattern is taken.
    pub fn next_free(&mut self) -> Option<PathBuf> {
        if !self.is_numbered() {
            return Some(PathBuf::from(&self.prefix));
        }

        let start = self.last.map_or(0, |n| n.saturating_add(1));
        for number in start..=self.max_number() {
            let path = PathBuf::from(self.format(number));
            if !path.exists() {
                self.last = Some(number);
                return Some(path);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let pattern = FilenamePattern::parse("atari###.wav").unwrap();
        assert!(pattern.is_numbered());
        assert_eq!(pattern.max_number(), 999);
        assert_eq!(pattern.format(7), "atari007.wav");
        assert_eq!(pattern.format(123), "atari123.wav");
    }

    #[test]
    fn test_literal_pattern() {
        let mut pattern = FilenamePattern::parse("capture.avi").unwrap();
        assert!(!pattern.is_numbered());
        assert_eq!(pattern.next_free(), Some(PathBuf::from("capture.avi")));
        assert_eq!(pattern.next_free(), Some(PathBuf::from("capture.avi")));
    }

    #[test]
    fn test_rejects_bad_patterns() {
        assert!(FilenamePattern::parse("").is_err());
        assert!(FilenamePattern::parse("x##########.avi").is_err());
    }

    #[test]
    fn test_next_free_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("rec##.wav");
        std::fs::write(dir.path().join("rec00.wav"), b"").unwrap();
        std::fs::write(dir.path().join("rec01.wav"), b"").unwrap();

        let mut pattern = FilenamePattern::parse(base.to_str().unwrap()).unwrap();
        assert_eq!(pattern.next_free(), Some(dir.path().join("rec02.wav")));
        // Numbers only move forward, even if nothing was created
        assert_eq!(pattern.next_free(), Some(dir.path().join("rec03.wav")));
    }

    #[test]
    fn test_next_free_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        for n in 0..10 {
            std::fs::write(dir.path().join(format!("f{}.avi", n)), b"").unwrap();
        }
        let base = dir.path().join("f#.avi");
        let mut pattern = FilenamePattern::parse(base.to_str().unwrap()).unwrap();
        assert_eq!(pattern.next_free(), None);
    }
}
