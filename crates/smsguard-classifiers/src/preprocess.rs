//! Text normalization applied before any model sees raw message text
//!
//! Literal URLs, e-mail addresses, phone numbers, money amounts and numbers are
//! replaced with typed placeholder tokens, in that order. The URL pass must run
//! before the looser numeric passes or they would split URLs apart.

use regex::{Captures, Regex};
use smsguard_core::{Error, Result};
use std::sync::OnceLock;

pub const URL_TOKEN: &str = "<URL>";
pub const EMAIL_TOKEN: &str = "<EMAIL>";
pub const PHONE_TOKEN: &str = "<PHONE>";
pub const MONEY_TOKEN: &str = "<MONEY>";
pub const NUM_TOKEN: &str = "<NUM>";

/// Deterministic, stateless SMS text cleaner
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    placeholder_regex: Regex,
    url_regex: Regex,
    email_regex: Regex,
    phone_regex: Regex,
    money_regex: Regex,
    num_regex: Regex,
    strip_regex: Regex,
    space_regex: Regex,
}

fn compile(pattern: &str, what: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::config(format!("Failed to compile {} regex: {}", what, e)))
}

impl TextNormalizer {
    /// Create a new normalizer
    pub fn new() -> Result<Self> {
        Ok(Self {
            placeholder_regex: compile(r"<(url|email|phone|money|num)>", "placeholder")?,
            url_regex: compile(r"(?i)(https?://\S+|www\.\S+)", "url")?,
            email_regex: compile(r"(?i)\b[\w.-]+@[\w.-]+\.\w+\b", "email")?,
            phone_regex: compile(r"\b\+?\d[\d\s-]{7,}\d\b", "phone")?,
            money_regex: compile(
                r"(?:\$|£|€)\s?\d+(?:\.\d+)?|\b\d+(?:\.\d+)?\s?(?:\$|£|€)",
                "money",
            )?,
            num_regex: compile(r"\b\d+(?:\.\d+)?\b", "number")?,
            strip_regex: compile(r"[^\w<>\s]", "strip")?,
            space_regex: compile(r"\s+", "whitespace")?,
        })
    }

    /// Process-wide instance; the patterns are constant so compiling them once is enough
    pub fn shared() -> &'static TextNormalizer {
        static SHARED: OnceLock<TextNormalizer> = OnceLock::new();
        SHARED.get_or_init(|| TextNormalizer::new().expect("normalizer patterns are valid"))
    }

    /// Normalize one message. `None` is treated as the empty string.
    pub fn normalize<'a>(&self, text: impl Into<Option<&'a str>>) -> String {
        let lowered = text.into().unwrap_or("").trim().to_lowercase();

        // Placeholders typed in by the sender (or left by an earlier pass) keep their case.
        let t = self
            .placeholder_regex
            .replace_all(&lowered, |caps: &Captures<'_>| {
                format!("<{}>", caps[1].to_uppercase())
            });

        let t = self.url_regex.replace_all(&t, " <URL> ");
        let t = self.email_regex.replace_all(&t, " <EMAIL> ");
        let t = self.phone_regex.replace_all(&t, " <PHONE> ");
        let t = self.money_regex.replace_all(&t, " <MONEY> ");
        let t = self.num_regex.replace_all(&t, " <NUM> ");
        let t = self.strip_regex.replace_all(&t, " ");
        let t = self.space_regex.replace_all(&t, " ");

        t.trim().to_string()
    }

    /// Normalize every element independently; output is 1:1 with the input
    pub fn normalize_batch<'a, I, T>(&self, texts: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: Into<Option<&'a str>>,
    {
        texts.into_iter().map(|text| self.normalize(text)).collect()
    }
}

/// Normalize with the shared normalizer
pub fn normalize<'a>(text: impl Into<Option<&'a str>>) -> String {
    TextNormalizer::shared().normalize(text)
}

/// Batch variant of [`normalize`]
pub fn normalize_batch<'a, I, T>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = T>,
    T: Into<Option<&'a str>>,
{
    TextNormalizer::shared().normalize_batch(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_placeholder_precedence() {
        let out = normalize("call 0123456789 now, win $50 at http://x.co");
        assert_eq!(out, "call <PHONE> now win <MONEY> at <URL>");
        assert!(!out.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_none_and_blank() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize("   \t\n "), "");
    }

    #[test]
    fn test_email_and_url_variants() {
        assert_eq!(
            normalize("Mail John.Doe@Example.com or visit WWW.Prizes.biz/claim"),
            "mail <EMAIL> or visit <URL>"
        );
        assert_eq!(normalize("see HTTPS://a.b/c?d=1"), "see <URL>");
    }

    #[test]
    fn test_money_and_numbers() {
        assert_eq!(normalize("only £1.50 today"), "only <MONEY> today");
        assert_eq!(normalize("pay 20€ now"), "pay <MONEY> now");
        assert_eq!(normalize("reply 2 stop, 3.5 stars"), "reply <NUM> stop <NUM> stars");
    }

    #[test]
    fn test_phone_with_separators() {
        assert_eq!(normalize("ring +44 7700-900 123 today"), "ring <PHONE> today");
    }

    #[test]
    fn test_punctuation_and_whitespace() {
        assert_eq!(normalize("  FREE!!!   entry...  "), "free entry");
        assert_eq!(normalize("a<b>c"), "a<b>c");
    }

    #[test]
    fn test_batch_is_one_to_one() {
        let out = normalize_batch(vec![Some("Hi!"), None, Some("")]);
        assert_eq!(out, vec!["hi".to_string(), String::new(), String::new()]);
    }

    #[test]
    fn test_typed_placeholders_survive() {
        assert_eq!(normalize("click <url> now"), "click <URL> now");
        assert_eq!(
            normalize(normalize("WIN $50 at www.x.co").as_str()),
            "win <MONEY> at <URL>"
        );
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(text in "[a-zA-Z0-9 .,:/@$£€+<>!?_-]{0,80}") {
            let once = normalize(text.as_str());
            let twice = normalize(once.as_str());
            prop_assert_eq!(once, twice);
        }
    }
}
