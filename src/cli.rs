use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    DecimalStyle, StoreConfig, CATALOG_ENV_VAR, DEFAULT_CATALOG_PATH, DEFAULT_RECIPES_PATH, RECIPES_ENV_VAR,
};
use crate::model::{IngredientRecord, Nutrients};

#[derive(Parser, Debug)]
#[command(author, version, about = "Nutrition and allergen labelling for recipes", long_about = None)]
pub struct Cli {
    /// Ingredient catalog CSV
    #[arg(long, global = true, env = CATALOG_ENV_VAR, default_value = DEFAULT_CATALOG_PATH)]
    pub catalog: PathBuf,

    /// Recipe lines CSV
    #[arg(long, global = true, env = RECIPES_ENV_VAR, default_value = DEFAULT_RECIPES_PATH)]
    pub recipes: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.catalog.clone(), self.recipes.clone())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print nutrition per 100 g, ingredient shares and allergens
    Analyze(AnalyzeArgs),
    /// List the clients found in the ingredient catalog
    Clients,
    /// List recipe names
    Recipes {
        #[arg(long)]
        client: Option<String>,
    },
    /// Append an ingredient to the catalog
    AddIngredient(AddIngredientArgs),
    /// Append one ingredient quantity to a recipe
    AddRecipeLine(AddRecipeLineArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Recipe name
    #[arg(short, long, required_unless_present = "all")]
    pub recipe: Option<String>,

    #[arg(long)]
    pub client: Option<String>,

    /// Analyze every recipe (of --client, when given)
    #[arg(long, conflicts_with = "recipe")]
    pub all: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Write decimals with a comma
    #[arg(long)]
    pub decimal_comma: bool,
}

impl AnalyzeArgs {
    pub fn decimal_style(&self) -> DecimalStyle {
        if self.decimal_comma {
            DecimalStyle::Comma
        } else {
            DecimalStyle::Point
        }
    }
}

#[derive(Args, Debug)]
pub struct AddIngredientArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub supplier: String,
    #[arg(long)]
    pub client: Option<String>,
    #[arg(long)]
    pub reference: Option<String>,
    /// Detailed composition text
    #[arg(long)]
    pub composition: Option<String>,
    /// Allergens, comma separated
    #[arg(long)]
    pub allergens: Option<String>,

    /// kcal per 100 g
    #[arg(long, default_value_t = 0.0)]
    pub energy: f64,
    #[arg(long, default_value_t = 0.0)]
    pub protein: f64,
    #[arg(long, default_value_t = 0.0)]
    pub fat: f64,
    #[arg(long, default_value_t = 0.0)]
    pub saturated_fat: f64,
    #[arg(long, default_value_t = 0.0)]
    pub carbohydrate: f64,
    #[arg(long, default_value_t = 0.0)]
    pub sugars: f64,
    #[arg(long, default_value_t = 0.0)]
    pub fiber: f64,
    #[arg(long, default_value_t = 0.0)]
    pub salt: f64,
}

impl AddIngredientArgs {
    pub fn to_record(&self) -> IngredientRecord {
        IngredientRecord {
            client: self.client.clone(),
            name: self.name.trim().to_string(),
            supplier: self.supplier.trim().to_string(),
            reference: self.reference.clone(),
            composition: self.composition.clone(),
            allergens: self.allergens.clone(),
            per_100g: Nutrients {
                energy_kcal: self.energy,
                protein_g: self.protein,
                fat_g: self.fat,
                saturated_fat_g: self.saturated_fat,
                carbohydrate_g: self.carbohydrate,
                sugars_g: self.sugars,
                fiber_g: self.fiber,
                salt_g: self.salt,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct AddRecipeLineArgs {
    #[arg(long)]
    pub recipe: String,
    #[arg(long)]
    pub ingredient: String,
    /// Defaults to the only catalog supplier of the ingredient
    #[arg(long)]
    pub supplier: Option<String>,
    #[arg(long)]
    pub client: Option<String>,
    /// Grams
    #[arg(long)]
    pub quantity: f64,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
