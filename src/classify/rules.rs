use serde::{Deserialize, Serialize};

use crate::domain::category::Category;
use crate::mail::decoders::truncate_chars;

/// Only this much of the body is searched for keywords.
pub const BODY_SCAN_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Sender,
    Subject,
    Body,
}

/// Keywords for one category and the fields they are looked for in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub category: Category,
    pub fields: Vec<Field>,
    pub keywords: Vec<String>,
}

impl Rule {
    fn new(category: Category, fields: &[Field], keywords: &[&str]) -> Self {
        Self {
            category,
            fields: fields.to_vec(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Ordered keyword rules; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        use Field::*;
        Self {
            rules: vec![
                Rule::new(
                    Category::SecurityAlert,
                    &[Sender, Subject, Body],
                    &[
                        "security alert",
                        "verification code",
                        "2fa",
                        "unauthorized access",
                        "password reset",
                    ],
                ),
                Rule::new(
                    Category::JobApplication,
                    &[Sender, Subject],
                    &[
                        "application",
                        "interview",
                        "offer",
                        "reject",
                        "candidate",
                        "linkedin",
                        "workday",
                        "greenhouse",
                        "lever",
                        "recruiter",
                        "admission",
                        "grad school",
                        "university",
                        "phd",
                        "master",
                    ],
                ),
                Rule::new(
                    Category::Newsletter,
                    &[Sender],
                    &[
                        "newsletter",
                        "digest",
                        "weekly",
                        "edition",
                        "unsubscribe",
                        "medium",
                        "substack",
                    ],
                ),
                Rule::new(
                    Category::PromotionSpam,
                    &[Subject],
                    &["sale", "discount", "% off", "deal", "limited time"],
                ),
            ],
        }
    }
}

impl RuleSet {
    /// Case-insensitive substring match; `None` when no rule applies.
    pub fn classify(&self, sender: &str, subject: &str, body: &str) -> Option<Category> {
        let sender = sender.to_lowercase();
        let subject = subject.to_lowercase();
        let body = truncate_chars(body, BODY_SCAN_CHARS).to_lowercase();

        self.rules
            .iter()
            .find(|rule| {
                rule.fields.iter().any(|field| {
                    let haystack = match field {
                        Field::Sender => &sender,
                        Field::Subject => &subject,
                        Field::Body => &body,
                    };
                    rule.keywords
                        .iter()
                        .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
                })
            })
            .map(|rule| rule.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(sender: &str, subject: &str, body: &str) -> Option<Category> {
        RuleSet::default().classify(sender, subject, body)
    }

    #[test]
    fn security_beats_job_application() {
        assert_eq!(
            classify("jobs@corp.com", "Security alert on your application", ""),
            Some(Category::SecurityAlert)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            classify("x@y.com", "Your INTERVIEW schedule", ""),
            Some(Category::JobApplication)
        );
        assert_eq!(
            classify("The Weekly Digest <news@y.com>", "hello", ""),
            Some(Category::Newsletter)
        );
        assert_eq!(
            classify("shop@y.com", "50% OFF everything", ""),
            Some(Category::PromotionSpam)
        );
    }

    #[test]
    fn body_only_counts_within_first_500_chars() {
        let early = "Your verification code is 1234";
        assert_eq!(classify("a@b.c", "hi", early), Some(Category::SecurityAlert));

        let late = format!("{}verification code", "x".repeat(600));
        assert_eq!(classify("a@b.c", "hi", &late), None);
    }

    #[test]
    fn fields_are_scoped_per_rule() {
        // promotion keywords are only looked for in the subject
        assert_eq!(classify("sale@shop.com", "hello", "big discount"), None);
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(classify("mom@family.org", "dinner sunday?", "love you"), None);
    }

    #[test]
    fn rules_round_trip_through_toml() {
        let text = toml::to_string(&RuleSet::default()).unwrap();
        let back: RuleSet = toml::from_str(&text).unwrap();
        assert_eq!(back, RuleSet::default());
    }
}
