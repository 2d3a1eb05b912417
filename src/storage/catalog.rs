use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use super::IngredientLookup;
use crate::error::{LabelError, LabelResult};
use crate::model::{IngredientKey, IngredientRecord};

/// A data-quality finding: the same (name, supplier) appears more than once
/// in the catalog with different composition or allergen text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergentEntry {
    pub key: IngredientKey,
    pub kept_composition: Option<String>,
    pub ignored_composition: Option<String>,
    pub kept_allergens: Option<String>,
    pub ignored_allergens: Option<String>,
}

/// In-memory index of ingredient records keyed by (name, supplier).
///
/// Records keep their load order; when a key repeats, the first record wins.
#[derive(Debug, Clone, Default)]
pub struct IngredientCatalog {
    records: Vec<IngredientRecord>,
    index: HashMap<IngredientKey, usize>,
    divergent: Vec<DivergentEntry>,
}

impl IngredientCatalog {
    pub fn from_records(records: impl IntoIterator<Item = IngredientRecord>) -> Self {
        let mut catalog = Self::default();
        for record in records {
            catalog.insert(record);
        }
        catalog
    }

    /// Adds `record` unless its key is already present. Returns whether it was added.
    pub fn insert(&mut self, record: IngredientRecord) -> bool {
        let key = record.key();
        if let Some(&existing_idx) = self.index.get(&key) {
            let existing = &self.records[existing_idx];
            if existing.composition != record.composition || existing.allergens != record.allergens {
                warn!(
                    ingredient = %key.name,
                    supplier = %key.supplier,
                    "duplicate catalog entry with different composition or allergens; keeping the first"
                );
                self.divergent.push(DivergentEntry {
                    key,
                    kept_composition: existing.composition.clone(),
                    ignored_composition: record.composition,
                    kept_allergens: existing.allergens.clone(),
                    ignored_allergens: record.allergens,
                });
            } else {
                warn!(ingredient = %key.name, supplier = %key.supplier, "duplicate catalog entry ignored");
            }
            return false;
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[IngredientRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn divergent_entries(&self) -> &[DivergentEntry] {
        &self.divergent
    }

    /// Distinct non-blank client names, sorted.
    pub fn clients(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.client.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records belonging to `client` (exact match after trimming).
    pub fn for_client<'a>(&'a self, client: &'a str) -> impl Iterator<Item = &'a IngredientRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.client.as_deref().map(str::trim) == Some(client.trim()))
    }
}

impl IngredientLookup for IngredientCatalog {
    fn lookup_ingredient(&self, name: &str, supplier: &str) -> Option<&IngredientRecord> {
        let key = IngredientKey::new(name, supplier);
        self.index.get(&key).map(|&idx| &self.records[idx])
    }
}

/// Nutrient values must be finite and not negative.
pub fn validate_nutrients(record: &IngredientRecord) -> LabelResult<()> {
    match record.per_100g.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
        Some((nutrient, value)) => Err(LabelError::InvalidNutrientValue {
            ingredient: record.name.clone(),
            nutrient,
            value,
        }),
        None => Ok(()),
    }
}
