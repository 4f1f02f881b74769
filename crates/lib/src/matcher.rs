//! Action/intent matching against a resolved message.
//!
//! A [`Target`] is a name, a literal, a regular expression, or a list of those. Matching is a pure
//! predicate over fields the resolver already wrote; it never fails and never touches the network.

use regex::{Regex, RegexBuilder};

use crate::message::Message;

/// Default minimum confidence for a match.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// What to match a resolved action (or intent) against.
#[derive(Debug, Clone)]
pub enum Target {
    /// Whole-string, case-insensitive pattern: `"pickFruit"`, `"pick(.*)"`. Must match the entire
    /// value, so `"pick"` does not match `pickFruit`. Invalid patterns are matched literally.
    Name(Anchored),
    /// Whole-string, case-insensitive literal; regex metacharacters have no meaning.
    Literal(Anchored),
    /// Unanchored search with the expression's own flags (`(?i)` for case-insensitivity).
    Regex(Regex),
    /// Matches if any element matches. Empty never matches.
    Any(Vec<Target>),
}

impl Target {
    pub fn name(s: impl Into<String>) -> Self {
        Target::Name(Anchored::pattern(s.into()))
    }

    pub fn literal(s: impl Into<String>) -> Self {
        Target::Literal(Anchored::literal(s.into()))
    }

    /// True when this target accepts `value`. Empty values never match.
    pub fn is_match(&self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        match self {
            Target::Name(a) | Target::Literal(a) => a.is_match(value),
            Target::Regex(re) => re.is_match(value),
            Target::Any(targets) => targets.iter().any(|t| t.is_match(value)),
        }
    }
}

/// A whole-string, case-insensitive matcher compiled once from its source text.
#[derive(Debug, Clone)]
pub struct Anchored {
    source: String,
    /// `None` only when even the escaped literal exceeds the regex size limit.
    regex: Option<Regex>,
}

impl Anchored {
    /// The source must parse as a regex on its own before it is wrapped; otherwise a stray `)`
    /// could close the anchoring group. Sources that do not parse are matched literally.
    fn pattern(source: String) -> Self {
        match Regex::new(&source).ok().and_then(|_| anchored(&source)) {
            Some(re) => Self {
                source,
                regex: Some(re),
            },
            None => Self::literal(source),
        }
    }

    fn literal(source: String) -> Self {
        let regex = anchored(&regex::escape(&source));
        Self { source, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn is_match(&self, value: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(value),
            None => self.source.to_lowercase() == value.to_lowercase(),
        }
    }
}

/// `^(?:pattern)$`, case-insensitive. The group keeps alternations inside the anchors.
fn anchored(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(&format!("^(?:{})$", pattern))
        .case_insensitive(true)
        .build()
        .ok()
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target::name(s)
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target::name(s)
    }
}

impl From<&String> for Target {
    fn from(s: &String) -> Self {
        Target::name(s.as_str())
    }
}

/// Reuses an already compiled target; the regexes are shared, not rebuilt.
impl From<&Target> for Target {
    fn from(t: &Target) -> Self {
        t.clone()
    }
}

impl From<Regex> for Target {
    fn from(re: Regex) -> Self {
        Target::Regex(re)
    }
}

impl<T: Into<Target>> From<Vec<T>> for Target {
    fn from(items: Vec<T>) -> Self {
        Target::Any(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Target>, const N: usize> From<[T; N]> for Target {
    fn from(items: [T; N]) -> Self {
        Target::Any(items.into_iter().map(Into::into).collect())
    }
}

/// Confidence-gated matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matcher {
    min_confidence: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CONFIDENCE)
    }
}

impl Matcher {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// True when the message's resolved action matches `target`.
    pub fn action(&self, target: &Target, message: &Message) -> bool {
        self.passes_gate(message) && target.is_match(&message.action)
    }

    /// True when the message's resolved intent name matches `target`.
    pub fn hears(&self, target: &Target, message: &Message) -> bool {
        self.passes_gate(message)
            && message
                .intent
                .as_deref()
                .is_some_and(|intent| target.is_match(intent))
    }

    /// A reported confidence below the threshold (or NaN) blocks every match; no score at all does not.
    fn passes_gate(&self, message: &Message) -> bool {
        match message.confidence {
            Some(c) => !c.is_nan() && c >= self.min_confidence,
            None => true,
        }
    }
}
