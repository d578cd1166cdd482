use std::collections::HashMap;

use crate::domain::email::Message;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Counts behind the inbox composition and top-sender views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxStats {
    /// (label, count), most frequent first.
    pub categories: Vec<(String, usize)>,
    pub top_senders: Vec<(String, usize)>,
}

pub fn inbox_stats(messages: &[Message], top_n: usize) -> InboxStats {
    let categories = count_desc(messages.iter().map(|m| {
        m.category
            .map_or_else(|| UNCATEGORIZED.to_string(), |c| c.to_string())
    }));

    let mut top_senders = count_desc(messages.iter().map(|m| m.sender.clone()));
    top_senders.truncate(top_n);

    InboxStats {
        categories,
        top_senders,
    }
}

fn count_desc(keys: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for k in keys {
        *counts.entry(k).or_default() += 1;
    }
    let mut out: Vec<_> = counts.into_iter().collect();
    // ties broken by name so output is stable
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::Category;
    use crate::domain::email::sample;

    #[test]
    fn counts_categories_and_senders() {
        let mut a = sample(1, "A <a@x.io>", "s", "b");
        a.category = Some(Category::Newsletter);
        let mut b = sample(2, "A <a@x.io>", "s", "b");
        b.category = Some(Category::Newsletter);
        let c = sample(3, "B <b@x.io>", "s", "b");

        let stats = inbox_stats(&[a, b, c], 5);
        assert_eq!(
            stats.categories,
            vec![("Newsletter".to_string(), 2), (UNCATEGORIZED.to_string(), 1)]
        );
        assert_eq!(stats.top_senders[0], ("A <a@x.io>".to_string(), 2));
        assert_eq!(stats.top_senders.len(), 2);
    }

    #[test]
    fn top_senders_truncated() {
        let msgs: Vec<_> = (0..8)
            .map(|i| sample(i, &format!("s{i}@x.io"), "s", "b"))
            .collect();
        assert_eq!(inbox_stats(&msgs, 5).top_senders.len(), 5);
    }
}
