//! Prompt classifier.
//!
//! Pure function `classify`; keyword data lives in `classifier_keywords`.

use serde::{Deserialize, Serialize};

use crate::classifier_keywords::CATEGORIES;
use crate::context::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CodeGeneration,
    DocumentCreation,
    BusinessDevelopment,
    HumanResources,
    AccountingFinance,
    GeneralQa,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CodeGeneration => "code_generation",
            Category::DocumentCreation => "document_creation",
            Category::BusinessDevelopment => "business_development",
            Category::HumanResources => "human_resources",
            Category::AccountingFinance => "accounting_finance",
            Category::GeneralQa => "general_qa",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
    pub secondary: Option<Category>,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '&' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

fn count_whole_word(haystack: &str, word: &str) -> u32 {
    haystack
        .match_indices(word)
        .filter(|(idx, matched)| {
            let before_ok = haystack[..*idx]
                .chars()
                .last()
                .map_or(true, |c| !is_word_char(c));
            let end = idx + matched.len();
            let after_ok = haystack[end..]
                .chars()
                .next()
                .map_or(true, |c| !is_word_char(c));
            before_ok && after_ok
        })
        .count() as u32
}

fn score_category(normalized: &str, phrases: &[&str], words: &[&str]) -> u32 {
    let mut score = 0u32;
    for phrase in phrases {
        score += 3 * normalized.matches(phrase).count() as u32;
    }
    for word in words {
        if word.contains('&') {
            score += normalized.matches(word).count() as u32;
        } else {
            score += count_whole_word(normalized, word);
        }
    }
    score
}

/// Normalizes and scores every non-fallback category in fixed declaration order,
/// applies the CLI bias to `code_generation`, then ranks. Ties resolve toward the
/// earlier-declared category.
pub fn classify(text: &str, source: Source) -> Classification {
    let normalized = normalize(text);

    let mut scores: Vec<(Category, u32)> = CATEGORIES
        .iter()
        .map(|def| (def.category, score_category(&normalized, def.phrases, def.words)))
        .collect();

    if source == Source::Cli {
        if let Some(entry) = scores
            .iter_mut()
            .find(|(c, _)| *c == Category::CodeGeneration)
        {
            entry.1 += 4;
        }
    }

    let mut top_idx = 0usize;
    for i in 1..scores.len() {
        if scores[i].1 > scores[top_idx].1 {
            top_idx = i;
        }
    }
    let top_score = scores[top_idx].1;

    if top_score == 0 {
        return Classification {
            category: Category::GeneralQa,
            confidence: 1.0,
            secondary: None,
        };
    }

    let mut second_score = 0u32;
    let mut second_category = None;
    for (i, (category, score)) in scores.iter().enumerate() {
        if i == top_idx {
            continue;
        }
        if *score > second_score {
            second_score = *score;
            second_category = Some(*category);
        }
    }

    let confidence = if second_score == 0 {
        1.0
    } else {
        let raw = top_score as f64 / (top_score + second_score) as f64;
        (raw * 100.0).round() / 100.0
    };

    Classification {
        category: scores[top_idx].0,
        confidence,
        secondary: if second_score > 0 { second_category } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_bias_tips_ambiguous_prompt_to_code_generation() {
        let web = classify("help me with this task", Source::Web);
        assert_eq!(web.category, Category::GeneralQa);

        let cli = classify("help me with this task", Source::Cli);
        assert_eq!(cli.category, Category::CodeGeneration);
    }

    #[test]
    fn no_keyword_hits_fall_back_to_general_qa_with_full_confidence() {
        let c = classify("what is the weather like today", Source::Web);
        assert_eq!(c.category, Category::GeneralQa);
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.secondary, None);
    }

    #[test]
    fn phrase_match_outweighs_single_word_match() {
        let c = classify("please write a function to parse this invoice", Source::Web);
        assert_eq!(c.category, Category::CodeGeneration);
    }

    #[test]
    fn ampersand_keyword_matches_as_substring() {
        let c = classify("need help with the gov&edu pipeline rfp", Source::Web);
        assert_eq!(c.category, Category::BusinessDevelopment);
    }

    #[test]
    fn confidence_is_rounded_ratio_of_top_to_top_plus_second() {
        // "report" (document_creation word, +1) vs "invoice" (accounting word, +1): tie,
        // document_creation wins by declaration order.
        let c = classify("report and invoice", Source::Web);
        assert_eq!(c.category, Category::DocumentCreation);
        assert_eq!(c.secondary, Some(Category::AccountingFinance));
        assert_eq!(c.confidence, 0.5);
    }
}
