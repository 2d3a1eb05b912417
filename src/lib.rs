pub mod allergens;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingredient_list;
pub mod mass_share;
pub mod model;
pub mod recipe_aggregator;
pub mod report;
pub mod storage;

pub use allergens::{extract_allergens, highlight, AllergenSet};
pub use error::{LabelError, LabelResult};
pub use mass_share::{mass_shares, MassShareRow};
pub use recipe_aggregator::{aggregate, AggregationResult};
