pub mod catalog;
pub mod csv_store;

use anyhow::Result;

use crate::model::{IngredientRecord, RecipeLine};

pub use catalog::IngredientCatalog;
pub use csv_store::CsvStore;

/// Resolves a recipe line's (name, supplier) to its catalog entry.
pub trait IngredientLookup {
    fn lookup_ingredient(&self, name: &str, supplier: &str) -> Option<&IngredientRecord>;
}

/// Read/append access to stored recipe lines.
pub trait RecipeSource {
    /// All lines of `recipe`, restricted to `client` when given, in stored order.
    fn list_recipe_lines(&self, client: Option<&str>, recipe: &str) -> Result<Vec<RecipeLine>>;

    /// Distinct recipe names in first-seen order.
    fn list_recipes(&self, client: Option<&str>) -> Result<Vec<String>>;

    fn append_recipe_line(&mut self, line: &RecipeLine) -> Result<()>;
}

pub trait IngredientSink {
    fn append_ingredient(&mut self, record: &IngredientRecord) -> Result<()>;
}
