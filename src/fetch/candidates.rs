//! Candidate locators for one request.
//!
//! A single input URL expands into at most three attempts, tried in this
//! order:
//!
//! 1. the URL as given
//! 2. the same URL with `http` and `https` swapped (only for those two schemes)
//! 3. the URL with its query string removed (only when it has one)
//!
//! Duplicates are dropped, first occurrence wins.

use crate::request::InputError;
use url::Url;

/// A validated absolute locator.
///
/// Keeps the caller's spelling for candidate generation; the parsed form is
/// only used to answer structural questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    raw: String,
    url: Url,
}

impl Locator {
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(InputError::MissingLocator);
        }
        let url = Url::parse(raw).map_err(|e| InputError::MalformedLocator {
            locator: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !url.has_host() {
            return Err(InputError::MalformedLocator {
                locator: raw.to_string(),
                reason: "URL has no host".into(),
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn has_query(&self) -> bool {
        self.url.query().is_some()
    }
}

/// Ordered, duplicate-free attempt list. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    locators: Vec<String>,
}

impl CandidateSet {
    pub fn generate(locator: &Locator) -> Self {
        let original = locator.as_str();
        let mut locators = vec![original.to_string()];

        let mut push = |candidate: String| {
            if !locators.contains(&candidate) {
                locators.push(candidate);
            }
        };
        if let Some(swapped) = swap_scheme(original) {
            push(swapped);
        }
        if locator.has_query() {
            push(strip_query(original).to_string());
        }

        Self { locators }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.locators.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.locators
    }
}

/// `http:` ↔ `https:`. Any other scheme yields `None`.
fn swap_scheme(locator: &str) -> Option<String> {
    let (scheme, rest) = locator.split_once(':')?;
    if scheme.eq_ignore_ascii_case("http") {
        Some(format!("https:{rest}"))
    } else if scheme.eq_ignore_ascii_case("https") {
        Some(format!("http:{rest}"))
    } else {
        None
    }
}

/// Everything before the first `?`.
fn strip_query(locator: &str) -> &str {
    locator.split_once('?').map_or(locator, |(head, _)| head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(input: &str) -> Vec<String> {
        CandidateSet::generate(&Locator::parse(input).unwrap())
            .as_slice()
            .to_vec()
    }

    #[test]
    fn http_with_query_yields_three() {
        assert_eq!(
            candidates("http://img.test/a.jpg?size=large"),
            vec![
                "http://img.test/a.jpg?size=large",
                "https://img.test/a.jpg?size=large",
                "http://img.test/a.jpg",
            ]
        );
    }

    #[test]
    fn https_without_query_yields_two() {
        assert_eq!(
            candidates("https://img.test/a.png"),
            vec!["https://img.test/a.png", "http://img.test/a.png"]
        );
    }

    #[test]
    fn other_schemes_are_not_swapped() {
        assert_eq!(
            candidates("ftp://files.test/a.png?x=1"),
            vec!["ftp://files.test/a.png?x=1", "ftp://files.test/a.png"]
        );
    }

    #[test]
    fn empty_query_still_stripped() {
        assert_eq!(
            candidates("https://img.test/a.png?"),
            vec![
                "https://img.test/a.png?",
                "http://img.test/a.png?",
                "https://img.test/a.png",
            ]
        );
    }

    #[test]
    fn fragment_question_mark_is_not_a_query() {
        assert_eq!(
            candidates("https://img.test/a.png#what?"),
            vec!["https://img.test/a.png#what?", "http://img.test/a.png#what?"]
        );
    }

    #[test]
    fn original_always_first() {
        for input in ["http://a.test/x", "https://a.test/x?y", "ftp://a.test/"] {
            let set = CandidateSet::generate(&Locator::parse(input).unwrap());
            assert!(!set.is_empty());
            assert_eq!(set.iter().next(), Some(input));
        }
    }

    #[test]
    fn no_duplicates() {
        let set = candidates("HTTP://a.test/x?q");
        let mut deduped = set.clone();
        deduped.dedup();
        assert_eq!(set, deduped);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn input_is_trimmed() {
        let locator = Locator::parse("  https://a.test/x  ").unwrap();
        assert_eq!(locator.as_str(), "https://a.test/x");
        assert_eq!(locator.scheme(), "https");
    }

    #[test]
    fn malformed_locators_rejected() {
        for input in ["not a url", "/relative/path.png", "http://", "data:image/png;base64,AA"] {
            assert!(
                matches!(
                    Locator::parse(input),
                    Err(InputError::MalformedLocator { .. })
                ),
                "{input}"
            );
        }
        assert_eq!(Locator::parse(""), Err(InputError::MissingLocator));
    }
}
