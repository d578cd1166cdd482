use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed triage vocabulary. Badge colors and list ordering derive from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Job Application")]
    JobApplication,
    #[serde(rename = "Security Alert")]
    SecurityAlert,
    #[serde(rename = "Personal")]
    Personal,
    #[serde(rename = "Newsletter")]
    Newsletter,
    #[serde(rename = "Promotion/Spam")]
    PromotionSpam,
}

impl Category {
    /// Canonical order, also used when scanning model output for a name.
    pub const ALL: [Category; 5] = [
        Category::JobApplication,
        Category::SecurityAlert,
        Category::Personal,
        Category::Newsletter,
        Category::PromotionSpam,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::JobApplication => "Job Application",
            Category::SecurityAlert => "Security Alert",
            Category::Personal => "Personal",
            Category::Newsletter => "Newsletter",
            Category::PromotionSpam => "Promotion/Spam",
        }
    }

    /// First canonical name contained verbatim in `text`.
    pub fn find_in(text: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| text.contains(c.as_str()))
    }

    /// Sort rank in the inbox list; untriaged messages use [`UNTRIAGED_RANK`].
    pub fn rank(self) -> u8 {
        match self {
            Category::SecurityAlert => 0,
            Category::JobApplication => 1,
            Category::Personal => 2,
            Category::Newsletter => 3,
            Category::PromotionSpam => 4,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Category::SecurityAlert => "#ff4b4b",
            Category::JobApplication => "#00c853",
            Category::Personal => "#29b6f6",
            Category::Newsletter => "#ffa726",
            Category::PromotionSpam => UNTRIAGED_COLOR,
        }
    }
}

pub const UNTRIAGED_RANK: u8 = 5;
pub const UNTRIAGED_COLOR: &str = "#808080";

pub fn rank_of(category: Option<Category>) -> u8 {
    category.map_or(UNTRIAGED_RANK, Category::rank)
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
