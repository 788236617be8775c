//! Binary relevance verdict for a single retrieved chunk.
//!
//! The judge prompt asks for a bare `YES` or `NO`. Anything else, including
//! an empty reply or a reply containing both words, is a rejection. A
//! verdict is never an error.

use serde::{Deserialize, Serialize};

use super::parser::strip_reasoning;

/// Affirmative token.
const ACCEPT_TOKEN: &str = "YES";
/// Negative token.
const REJECT_TOKEN: &str = "NO";

/// Outcome of a per-chunk relevance judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The chunk helps answer at least one question.
    Accept,
    /// The chunk is irrelevant, or the reply was unusable.
    Reject,
}

impl Verdict {
    /// Reads a judge reply.
    ///
    /// Words are compared case-insensitively after dropping any reasoning
    /// block, so `"Yes."` accepts while `"NOT"` or `"KNOWN"` do not count as
    /// the negative token.
    #[must_use]
    pub fn parse(response: &str) -> Self {
        let upper = strip_reasoning(response).to_uppercase();
        let mut accept = false;
        let mut reject = false;
        for word in upper.split(|c: char| !c.is_alphanumeric()) {
            match word {
                ACCEPT_TOKEN => accept = true,
                REJECT_TOKEN => reject = true,
                _ => {}
            }
        }
        if accept && !reject {
            Self::Accept
        } else {
            Self::Reject
        }
    }

    /// Returns `true` for [`Verdict::Accept`].
    #[must_use]
    pub const fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("YES", Verdict::Accept ; "bare yes")]
    #[test_case("yes.", Verdict::Accept ; "lowercase with punctuation")]
    #[test_case("<think>hmm, NO wait</think>YES", Verdict::Accept ; "reasoning dropped")]
    #[test_case("NO", Verdict::Reject ; "bare no")]
    #[test_case("YES and NO", Verdict::Reject ; "both tokens")]
    #[test_case("", Verdict::Reject ; "empty")]
    #[test_case("Maybe", Verdict::Reject ; "ambiguous")]
    #[test_case("YES, it is NOT irrelevant", Verdict::Accept ; "not is not no")]
    #[test_case("YESTERDAY", Verdict::Reject ; "substring does not count")]
    fn test_verdict_parse(input: &str, expected: Verdict) {
        assert_eq!(Verdict::parse(input), expected);
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Accept.to_string(), "accept");
        assert!(!Verdict::Reject.is_accept());
    }
}
