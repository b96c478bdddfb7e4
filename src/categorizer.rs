use serde::{Deserialize, Serialize};

/// Label for descriptions that no rule matches.
pub const FALLBACK_CATEGORY: &str = "Miscellaneous";

/// A category and the keywords that select it. Rules are evaluated in the
/// order they are configured and the first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("Housing", &["rent", "mortgage", "property tax"]),
        CategoryRule::new(
            "Food",
            &["starbucks", "walmart", "grocery", "uber eats", "restaurant", "mcdonalds"],
        ),
        CategoryRule::new(
            "Utilities",
            &["electric", "water", "internet", "verizon", "at&t", "utility"],
        ),
        CategoryRule::new("Transport", &["gas", "shell", "uber", "lyft", "parking", "auto"]),
        CategoryRule::new("Income", &["payroll", "deposit", "dividend", "interest"]),
        CategoryRule::new(
            "Entertainment",
            &["netflix", "spotify", "steam", "hulu", "disney+"],
        ),
    ]
}

/// Case-insensitive substring matcher over an ordered rule list.
///
/// Matching is plain containment, not word-boundary aware, so short keywords
/// like "gas" also hit "Vegas Hotel".
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(String, Vec<String>)>,
    fallback: String,
}

impl Categorizer {
    pub fn new(rules: &[CategoryRule], fallback: &str) -> Self {
        let rules = rules
            .iter()
            .map(|r| {
                let keywords = r
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (r.category.clone(), keywords)
            })
            .collect();
        Self {
            rules,
            fallback: fallback.to_string(),
        }
    }

    pub fn categorize(&self, description: &str) -> &str {
        let desc = description.trim().to_lowercase();
        if desc.is_empty() {
            return &self.fallback;
        }
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| desc.contains(k.as_str())))
            .map(|(category, _)| category.as_str())
            .unwrap_or(&self.fallback)
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(&default_rules(), FALLBACK_CATEGORY)
    }
}
