//! Allergen extraction and emphasis.
//!
//! Allergens come from the comma-separated allergen field of each ingredient
//! record. They are normalized to lower case, deduplicated, and then used to
//! emphasize whole-word occurrences inside free text such as ingredient
//! compositions: `"Contiene soja"` becomes `"Contiene **SOJA**"`.

use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use tracing::warn;

use crate::model::IngredientRecord;

/// Normalized (trimmed, lower-cased) allergen tokens in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergenSet(BTreeSet<String>);

impl AllergenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every token of a comma-separated allergen field.
    pub fn insert_field(&mut self, field: &str) {
        for token in field.split(',') {
            self.insert(token);
        }
    }

    /// Adds one token after normalization. Blank tokens are ignored.
    pub fn insert(&mut self, token: &str) -> bool {
        let normalized = token.trim().to_lowercase();
        if normalized.is_empty() {
            return false;
        }
        self.0.insert(normalized)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tokens in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Compiles the set into a reusable highlighter.
    pub fn highlighter(&self) -> Highlighter {
        Highlighter::new(self.iter())
    }
}

impl<'a> FromIterator<&'a str> for AllergenSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = AllergenSet::new();
        for token in iter {
            set.insert(token);
        }
        set
    }
}

/// Unions the allergen fields of `records`. The result does not depend on the
/// order of the records.
pub fn extract_allergens<'a, I>(records: I) -> AllergenSet
where
    I: IntoIterator<Item = &'a IngredientRecord>,
{
    let mut set = AllergenSet::new();
    for record in records {
        if let Some(field) = record.allergens.as_deref() {
            set.insert_field(field);
        }
    }
    set
}

/// Emphasizes every whole-word, case-insensitive occurrence of an allergen in
/// `text` as `**UPPERCASE**`.
pub fn highlight(text: &str, allergens: &AllergenSet) -> String {
    allergens.highlighter().apply(text).into_owned()
}

/// A compiled single-pass matcher over a set of allergen tokens.
///
/// All tokens are combined into one alternation, longest first, so that a
/// longer token ("nueces") is preferred over a shorter one sharing its start
/// ("nuez") and no replacement is ever re-scanned by another token. Text that
/// has already been highlighted is not recognised, so applying twice nests
/// the markers.
#[derive(Debug, Clone)]
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    pub fn new<'a, I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tokens: Vec<&str> = tokens
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Self { pattern: None };
        }
        tokens.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
        tokens.dedup();

        let alternation = tokens
            .iter()
            .map(|t| word_bounded(t))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = match RegexBuilder::new(&alternation).case_insensitive(true).build() {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, tokens = tokens.len(), "allergen pattern too large; text left unhighlighted");
                None
            }
        };
        Self { pattern }
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.pattern {
            Some(re) if !text.is_empty() => {
                re.replace_all(text, |caps: &Captures| format!("**{}**", caps[0].to_uppercase()))
            }
            _ => Cow::Borrowed(text),
        }
    }
}

// `\b` only makes sense next to a word character; a token that starts or ends
// with punctuation is anchored on that side by the punctuation itself.
fn word_bounded(token: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let leading = token.chars().next().is_some_and(is_word);
    let trailing = token.chars().last().is_some_and(is_word);
    format!(
        "{}{}{}",
        if leading { r"\b" } else { "" },
        regex::escape(token),
        if trailing { r"\b" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Nutrients;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn with_allergens(name: &str, allergens: Option<&str>) -> IngredientRecord {
        let record = IngredientRecord::new(name, "S", Nutrients::default());
        match allergens {
            Some(a) => record.with_allergens(a),
            None => record,
        }
    }

    fn set(tokens: &[&str]) -> AllergenSet {
        tokens.iter().copied().collect()
    }

    #[test]
    fn test_extract_normalizes_and_sorts() {
        let records = vec![
            with_allergens("Galleta", Some(" Gluten, LECHE ,, ")),
            with_allergens("Chocolate", Some("leche,Soja")),
            with_allergens("Agua", None),
            with_allergens("Sal", Some("")),
        ];
        let allergens = extract_allergens(&records);
        assert_eq!(allergens.to_vec(), vec!["gluten", "leche", "soja"]);
    }

    #[test]
    fn test_extract_is_order_independent_and_idempotent() {
        let mut records = vec![
            with_allergens("A", Some("Huevo")),
            with_allergens("B", Some("frutos de cáscara, sésamo")),
            with_allergens("C", Some("SOJA, huevo")),
            with_allergens("D", Some("mostaza")),
            with_allergens("E", None),
        ];
        let expected = extract_allergens(&records);
        assert_eq!(extract_allergens(&records), expected);

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            records.shuffle(&mut rng);
            assert_eq!(extract_allergens(&records), expected);
        }
    }

    #[test]
    fn test_highlight_whole_words_case_insensitive() {
        assert_eq!(
            highlight("Contiene soja y leche", &set(&["soja", "leche"])),
            "Contiene **SOJA** y **LECHE**"
        );
        assert_eq!(
            highlight("Leche desnatada, SOJA", &set(&["soja", "leche"])),
            "**LECHE** desnatada, **SOJA**"
        );
    }

    #[test]
    fn test_highlight_does_not_match_inside_words() {
        assert_eq!(highlight("sojamiel", &set(&["soja"])), "sojamiel");
        assert_eq!(highlight("lecherita", &set(&["leche"])), "lecherita");
    }

    #[test]
    fn test_highlight_non_ascii_tokens() {
        assert_eq!(
            highlight("harina, sésamo tostado", &set(&["sésamo"])),
            "harina, **SÉSAMO** tostado"
        );
        assert_eq!(highlight("SÉSAMO", &set(&["sésamo"])), "**SÉSAMO**");
    }

    #[test]
    fn test_longer_token_preferred() {
        assert_eq!(
            highlight("nueces y nuez", &set(&["nuez", "nueces"])),
            "**NUECES** y **NUEZ**"
        );
        assert_eq!(
            highlight("frutos de cáscara", &set(&["frutos de cáscara", "cáscara"])),
            "**FRUTOS DE CÁSCARA**"
        );
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert_eq!(highlight("contiene e.330", &set(&["e.330"])), "contiene **E.330**");
        assert_eq!(highlight("contiene e4330", &set(&["e.330"])), "contiene e4330");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(highlight("", &set(&["soja"])), "");
        assert_eq!(highlight("Contiene soja", &AllergenSet::new()), "Contiene soja");
        assert!(set(&["", "  "]).is_empty());
    }
}
