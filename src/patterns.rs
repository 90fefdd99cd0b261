//! Hearst-style templates with two word slots.
//!
//! A pattern is a sentence template with exactly two `{}` slots: the first
//! takes the hyponym, the second the hypernym. Built-in sets cover the five
//! base patterns plus the ten from "Hearst Patterns Revisited" (Roller et
//! al., 2018), in Portuguese and English.

use crate::error::{ProbeError, Result};

/// Marker substituted into a slot when the word there is to be masked.
pub const MASK_SLOT: &str = "[MASK]";

/// A two-slot sentence template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    template: String,
}

impl Pattern {
    /// Validates that the template has exactly two `{}` slots.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let slots = template.matches("{}").count();
        if slots != 2 {
            return Err(ProbeError::InvalidInput(format!(
                "Pattern '{template}' has {slots} slots, expected 2"
            )));
        }
        Ok(Self { template })
    }

    /// The raw template text, used as the key in reports.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Fill both slots: hyponym first, hypernym second.
    pub fn fill(&self, hyponym: &str, hypernym: &str) -> String {
        let filled = self.template.replacen("{}", hyponym, 1);
        filled.replacen("{}", hypernym, 1)
    }

    /// The pattern text alone, both slots emptied and whitespace trimmed.
    pub fn bare(&self) -> String {
        self.fill("", "").trim().to_string()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

/// Language of the built-in pattern sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternLanguage {
    Portuguese,
    English,
}

const PT_PATTERNS: &[&str] = &[
    "{} é um tipo de {}",
    "{} é um {}",
    "{} e outros {}",
    "{} ou outro {}",
    "{} , um {}",
    "{} que é um exemplo de {}",
    "{} que é uma classe de {}",
    "{} que é um tipo de {}",
    "{} e qualquer outro {}",
    "{} e algum outro {}",
    "{} ou qualquer outro {}",
    "{} ou algum outro {}",
    "{} que é chamado de {}",
    "{} é um caso especial de {}",
    "{} incluindo {}",
];

const EN_PATTERNS: &[&str] = &[
    "{} is a type of {}",
    "{} is a {}",
    "{} and others {}",
    "{} or others {}",
    "{} , a {}",
    "{} which is a example of {}",
    "{} which is a class of {}",
    "{} which is kind of {}",
    "{} and any other {}",
    "{} and some other {}",
    "{} or any other {}",
    "{} or some other {}",
    "{} which is called {}",
    "{} a special case of {}",
    "{} including {}",
];

/// The built-in Hearst pattern set for `language`.
pub fn builtin_patterns(language: PatternLanguage) -> Vec<Pattern> {
    let templates = match language {
        PatternLanguage::Portuguese => PT_PATTERNS,
        PatternLanguage::English => EN_PATTERNS,
    };
    templates
        .iter()
        .map(|t| Pattern::new(*t).expect("built-in template is well-formed"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_substitutes_in_order() {
        let p = Pattern::new("{} is a type of {}").unwrap();
        assert_eq!(p.fill("tiger", "animal"), "tiger is a type of animal");
    }

    #[test]
    fn fill_with_mask_slot() {
        let p = Pattern::new("{} is a {}").unwrap();
        assert_eq!(p.fill(MASK_SLOT, "animal"), "[MASK] is a animal");
        assert_eq!(p.fill("tiger", MASK_SLOT), "tiger is a [MASK]");
    }

    #[test]
    fn bare_strips_slots_and_whitespace() {
        let p = Pattern::new("{} é um tipo de {}").unwrap();
        assert_eq!(p.bare(), "é um tipo de");
    }

    #[test]
    fn rejects_wrong_slot_count() {
        assert!(Pattern::new("no slots here").is_err());
        assert!(Pattern::new("{} one slot").is_err());
        assert!(Pattern::new("{} {} three {}").is_err());
    }

    #[test]
    fn builtin_sets_have_fifteen_patterns() {
        assert_eq!(builtin_patterns(PatternLanguage::Portuguese).len(), 15);
        assert_eq!(builtin_patterns(PatternLanguage::English).len(), 15);
    }
}
