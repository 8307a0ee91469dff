//! SQL text matching
//!
//! Every lookup of recorded statements and every fixture lookup goes through
//! [`MatchOptions::matches`], so the three switches behave the same everywhere:
//!
//! | regex | exact | semantics                                             |
//! |-------|-------|-------------------------------------------------------|
//! | false | false | `pattern` occurs anywhere in `candidate` (default)    |
//! | false | true  | `pattern` equals `candidate`                          |
//! | true  | any   | the regular expression matches the whole `candidate`  |
//!
//! `case_sensitive` applies to all three rows. In regex mode it is expressed
//! through the regex engine's case-insensitive flag, and special characters in
//! the pattern must be escaped by the caller.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// Switches controlling how a pattern is matched against SQL text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    pub exact: bool,
    pub regex: bool,
}

impl MatchOptions {
    pub fn new(case_sensitive: bool, exact: bool, regex: bool) -> Self {
        Self {
            case_sensitive,
            exact,
            regex,
        }
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn with_regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    /// Whether `candidate` satisfies `pattern` under these options
    pub fn matches(&self, candidate: &str, pattern: &str) -> bool {
        matches(candidate, pattern, self.case_sensitive, self.exact, self.regex)
    }

    /// Short human-readable description, used in verification messages
    pub fn describe(&self) -> String {
        let mode = if self.regex {
            "regex"
        } else if self.exact {
            "exact"
        } else {
            "substring"
        };
        let case = if self.case_sensitive {
            "case-sensitive"
        } else {
            "case-insensitive"
        };
        format!("{}, {}", mode, case)
    }
}

/// Match `candidate` against `pattern`
///
/// An invalid regular expression matches nothing.
pub fn matches(
    candidate: &str,
    pattern: &str,
    case_sensitive: bool,
    exact: bool,
    regex: bool,
) -> bool {
    if regex {
        return regex_matches(candidate, pattern, case_sensitive);
    }

    if case_sensitive {
        if exact {
            candidate == pattern
        } else {
            candidate.contains(pattern)
        }
    } else {
        let candidate = candidate.to_lowercase();
        let pattern = pattern.to_lowercase();
        if exact {
            candidate == pattern
        } else {
            candidate.contains(&pattern)
        }
    }
}

fn regex_matches(candidate: &str, pattern: &str, case_sensitive: bool) -> bool {
    let anchored = format!("^(?:{})$", pattern);
    match RegexBuilder::new(&anchored)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(re) => re.is_match(candidate),
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "invalid regular expression");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const UPDATE: &str = "UPDATE akkount SET balance = balance + ? WHERE id = ?";
    const SELECT: &str = "select balance from account where id=1";
    const INSERT: &str = "insert into test (col1, col2) values(?, ?)";

    #[test]
    fn test_default_is_case_insensitive_substring() {
        let options = MatchOptions::default();
        assert!(options.matches(UPDATE, "update akkount"));
        assert!(!options.matches(SELECT, "update akkount"));
        assert!(options.matches(SELECT, "select balance"));
        assert!(!options.matches(UPDATE, "select balance"));
    }

    #[rstest]
    #[case::substring_ci(false, false, "insert INTO", true)]
    #[case::substring_cs(true, false, "insert INTO", false)]
    #[case::substring_cs_ok(true, false, "insert into", true)]
    #[case::exact_partial(false, true, "insert into", false)]
    #[case::exact_ci(false, true, "INSERT INTO TEST (COL1, COL2) VALUES(?, ?)", true)]
    #[case::exact_cs(true, true, "INSERT INTO TEST (COL1, COL2) VALUES(?, ?)", false)]
    fn test_literal_modes(
        #[case] case_sensitive: bool,
        #[case] exact: bool,
        #[case] pattern: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(matches(INSERT, pattern, case_sensitive, exact, false), expected);
    }

    #[test]
    fn test_exact_rejects_what_substring_accepts() {
        let substring = MatchOptions::default();
        let exact = substring.with_exact(true);
        assert!(substring.matches(INSERT, "insert"));
        assert!(!exact.matches(INSERT, "insert"));
        assert!(exact.matches(INSERT, INSERT));
    }

    #[rstest]
    #[case("insert into.*", false, true)]
    #[case("insert", false, false)]
    #[case("insert (.*) TEST.*", false, true)]
    #[case("insert (.*) TEST.*", true, false)]
    #[case("insert into test \\(col1, col2\\) .*", true, true)]
    fn test_regex_matches_whole_candidate(
        #[case] pattern: &str,
        #[case] case_sensitive: bool,
        #[case] expected: bool,
    ) {
        let options = MatchOptions::default()
            .with_regex(true)
            .with_case_sensitive(case_sensitive);
        assert_eq!(options.matches(INSERT, pattern), expected);
    }

    #[test]
    fn test_regex_ignores_exact_flag() {
        let options = MatchOptions::new(true, true, true);
        assert!(options.matches("UPDATE", "UPDATE.*"));
        assert!(options.matches("UPDATE", "UPDATE"));
        assert!(!options.matches("UPDATE", "update"));
    }

    #[test]
    fn test_regex_alternation_is_anchored_as_a_group() {
        let options = MatchOptions::default().with_regex(true);
        assert!(options.matches("select", "select|update"));
        assert!(!options.matches("xselect", "select|update"));
        assert!(!options.matches("updatex", "select|update"));
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        let options = MatchOptions::default().with_regex(true);
        assert!(!options.matches("{call getData(?, ?)}", "{call getData(?"));
    }

    #[test]
    fn test_matching_is_idempotent() {
        let options = MatchOptions::default().with_regex(true);
        let first: Vec<bool> = [INSERT, SELECT, UPDATE]
            .iter()
            .map(|c| options.matches(c, ".*balance.*"))
            .collect();
        let second: Vec<bool> = [INSERT, SELECT, UPDATE]
            .iter()
            .map(|c| options.matches(c, ".*balance.*"))
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![false, true, true]);
    }

    #[test]
    fn test_describe() {
        assert_eq!(MatchOptions::default().describe(), "substring, case-insensitive");
        assert_eq!(
            MatchOptions::new(true, true, false).describe(),
            "exact, case-sensitive"
        );
    }
}
