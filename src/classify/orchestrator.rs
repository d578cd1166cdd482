use crate::classify::rules::RuleSet;
use crate::domain::category::Category;
use crate::domain::email::Message;
use crate::llm::TextGenerator;
use crate::mail::decoders::truncate_chars;

const MODEL_BODY_CHARS: usize = 1000;

/// Where a category came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageSource {
    Rule,
    Model,
    /// The model failed or answered outside the vocabulary.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triage {
    pub category: Category,
    pub source: TriageSource,
}

enum Stage {
    RuleMatch(Category),
    FallbackNeeded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriageReport {
    pub by_rule: usize,
    pub by_model: usize,
    pub defaulted: usize,
}

/// Keyword rules first, the language model only when no rule matches.
pub struct Classifier<'a> {
    rules: &'a RuleSet,
    model: &'a dyn TextGenerator,
}

impl<'a> Classifier<'a> {
    pub fn new(rules: &'a RuleSet, model: &'a dyn TextGenerator) -> Self {
        Self { rules, model }
    }

    /// Never fails; anything the model cannot settle becomes `Personal`.
    pub fn classify(&self, sender: &str, subject: &str, body: &str) -> Triage {
        let stage = match self.rules.classify(sender, subject, body) {
            Some(category) => Stage::RuleMatch(category),
            None => Stage::FallbackNeeded,
        };

        match stage {
            Stage::RuleMatch(category) => Triage {
                category,
                source: TriageSource::Rule,
            },
            Stage::FallbackNeeded => self.ask_model(sender, subject, body),
        }
    }

    fn ask_model(&self, sender: &str, subject: &str, body: &str) -> Triage {
        let prompt = classification_prompt(sender, subject, body);
        let answer = match self.model.generate(&prompt) {
            Ok(answer) => Category::find_in(&answer),
            Err(e) => {
                log::warn!("model classification failed: {e}");
                None
            }
        };
        match answer {
            Some(category) => Triage {
                category,
                source: TriageSource::Model,
            },
            None => Triage {
                category: Category::Personal,
                source: TriageSource::Default,
            },
        }
    }

    pub fn triage(&self, message: &mut Message) -> Triage {
        let t = self.classify(&message.sender, &message.subject, &message.body);
        message.category = Some(t.category);
        t
    }

    /// Classify every message in order, in place.
    pub fn triage_all(&self, messages: &mut [Message]) -> TriageReport {
        let mut report = TriageReport::default();
        for m in messages.iter_mut() {
            match self.triage(m).source {
                TriageSource::Rule => report.by_rule += 1,
                TriageSource::Model => report.by_model += 1,
                TriageSource::Default => report.defaulted += 1,
            }
        }
        log::info!(
            "triaged {} messages ({} by rule, {} by model, {} defaulted)",
            messages.len(),
            report.by_rule,
            report.by_model,
            report.defaulted
        );
        report
    }
}

pub fn classification_prompt(sender: &str, subject: &str, body: &str) -> String {
    let names: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("'{}'", c.as_str()))
        .collect();
    format!(
        "Classify this email into exactly one of these categories: [{}].\n\
         Sender: {sender}\n\
         Subject: {subject}\n\
         Body: {}\n\
         Reply ONLY with the category name.",
        names.join(", "),
        truncate_chars(body, MODEL_BODY_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::sample;
    use crate::llm::tests::ScriptedGenerator;

    #[test]
    fn rule_match_skips_the_model() {
        let rules = RuleSet::default();
        let model = ScriptedGenerator::failing();
        let c = Classifier::new(&rules, &model);
        let t = c.classify("security@bank.com", "Security alert", "");
        assert_eq!(t.category, Category::SecurityAlert);
        assert_eq!(t.source, TriageSource::Rule);
        assert!(model.prompts.borrow().is_empty());
    }

    #[test]
    fn model_answer_accepted_when_canonical() {
        let rules = RuleSet::default();
        let model = ScriptedGenerator::answering(&["I think this is a Newsletter."]);
        let t = Classifier::new(&rules, &model).classify("a@b.c", "hi", "hello");
        assert_eq!(t.category, Category::Newsletter);
        assert_eq!(t.source, TriageSource::Model);
        assert!(model.prompts.borrow()[0].contains("'Promotion/Spam'"));
    }

    #[test]
    fn unexpected_or_failed_answers_default_to_personal() {
        let rules = RuleSet::default();

        let model = ScriptedGenerator::answering(&["work stuff"]);
        let t = Classifier::new(&rules, &model).classify("a@b.c", "hi", "hello");
        assert_eq!(t.category, Category::Personal);
        assert_eq!(t.source, TriageSource::Default);

        let model = ScriptedGenerator::failing();
        let t = Classifier::new(&rules, &model).classify("a@b.c", "hi", "hello");
        assert_eq!(t.category, Category::Personal);
        assert_eq!(t.source, TriageSource::Default);
    }

    #[test]
    fn triage_all_mutates_in_place_and_is_repeatable() {
        let rules = RuleSet::default();
        let model = ScriptedGenerator::failing();
        let c = Classifier::new(&rules, &model);

        let mut msgs = vec![
            sample(1, "hr@corp.com", "Interview invitation", "..."),
            sample(2, "friend@x.io", "hey", "..."),
        ];
        let report = c.triage_all(&mut msgs);
        assert_eq!(msgs[0].category, Some(Category::JobApplication));
        assert_eq!(msgs[1].category, Some(Category::Personal));
        assert_eq!(
            report,
            TriageReport {
                by_rule: 1,
                by_model: 0,
                defaulted: 1
            }
        );

        let before: Vec<_> = msgs.iter().map(|m| m.category).collect();
        c.triage_all(&mut msgs);
        let after: Vec<_> = msgs.iter().map(|m| m.category).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn prompt_body_is_capped() {
        let p = classification_prompt("a", "b", &"z".repeat(5000));
        assert_eq!(p.matches('z').count(), MODEL_BODY_CHARS);
    }
}
