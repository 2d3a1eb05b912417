use std::path::PathBuf;

pub const CATALOG_ENV_VAR: &str = "RECIPE_LABEL_CATALOG";
pub const RECIPES_ENV_VAR: &str = "RECIPE_LABEL_RECIPES";
pub const DEFAULT_CATALOG_PATH: &str = "ingredients.csv";
pub const DEFAULT_RECIPES_PATH: &str = "recipes.csv";

/// Where the two record collections live. Passed explicitly to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub catalog_path: PathBuf,
    pub recipes_path: PathBuf,
}

impl StoreConfig {
    pub fn new(catalog_path: impl Into<PathBuf>, recipes_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            recipes_path: recipes_path.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_PATH, DEFAULT_RECIPES_PATH)
    }
}

/// How decimals are written in rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalStyle {
    #[default]
    Point,
    Comma,
}

impl DecimalStyle {
    pub fn format(self, value: f64, decimals: usize) -> String {
        let s = format!("{:.*}", decimals, value);
        match self {
            DecimalStyle::Point => s,
            DecimalStyle::Comma => s.replace('.', ","),
        }
    }
}
