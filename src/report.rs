use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::allergens::{extract_allergens, AllergenSet};
use crate::config::DecimalStyle;
use crate::error::{LabelError, LabelResult};
use crate::ingredient_list::format_ingredient_list;
use crate::mass_share::{mass_shares, MassShareRow};
use crate::model::{IngredientRecord, Nutrient, RecipeLine};
use crate::recipe_aggregator::{aggregate, AggregationResult, DISPLAY_DECIMALS};
use crate::storage::{IngredientLookup, RecipeSource};

/// Everything shown for one recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeReport {
    pub recipe: String,
    pub client: Option<String>,
    /// `None` when the recipe weighs 0 g.
    pub nutrition: Option<AggregationResult>,
    pub mass_shares: Vec<MassShareRow>,
    pub allergens: AllergenSet,
    /// Ingredients heaviest first, with allergens emphasized.
    pub ingredient_list: String,
}

impl RecipeReport {
    pub fn is_zero_mass(&self) -> bool {
        self.nutrition.is_none()
    }
}

/// Runs both engines over one recipe.
///
/// A zero-mass recipe still yields a report (without nutrition) so the caller
/// can show the tables next to a warning; an empty recipe or a missing catalog
/// entry does not.
pub fn analyze_recipe<L>(
    recipe: &str,
    client: Option<&str>,
    lines: &[RecipeLine],
    catalog: &L,
) -> LabelResult<RecipeReport>
where
    L: IngredientLookup + ?Sized,
{
    if lines.is_empty() {
        return Err(LabelError::EmptyRecipe {
            recipe: recipe.to_string(),
            client: client.map(str::to_string),
        });
    }

    let nutrition = match aggregate(lines, catalog) {
        Ok(result) => Some(result),
        Err(LabelError::ZeroMassRecipe) => {
            warn!(recipe, "recipe has no quantities assigned");
            None
        }
        Err(e) => return Err(e),
    };

    let shares = mass_shares(lines);
    // aggregate has already resolved every line
    let used = used_ingredients(lines, catalog);
    let allergens = extract_allergens(used.iter().copied());
    let plain_list = format_ingredient_list(&shares, |key| {
        catalog
            .lookup_ingredient(&key.name, &key.supplier)
            .and_then(|r| r.composition.as_deref())
    });
    let ingredient_list = allergens.highlighter().apply(&plain_list).into_owned();

    Ok(RecipeReport {
        recipe: recipe.to_string(),
        client: client.map(str::to_string),
        nutrition,
        mass_shares: shares,
        allergens,
        ingredient_list,
    })
}

/// Fetches and analyzes every recipe of `client` (all recipes when `None`).
/// Recipes are independent, so the analyses run in parallel; results keep the
/// store's recipe order.
pub fn analyze_client_recipes<S>(
    store: &S,
    client: Option<&str>,
) -> Result<Vec<(String, LabelResult<RecipeReport>)>>
where
    S: RecipeSource + IngredientLookup + Sync,
{
    let mut batch = Vec::new();
    for recipe in store.list_recipes(client)? {
        let lines = store.list_recipe_lines(client, &recipe)?;
        batch.push((recipe, lines));
    }
    info!(recipes = batch.len(), "analyzing recipes");

    Ok(batch
        .into_par_iter()
        .map(|(recipe, lines)| {
            let outcome = analyze_recipe(&recipe, client, &lines, store);
            (recipe, outcome)
        })
        .collect())
}

/// Plain-text rendering: nutrient table, mass-share table, ingredient list
/// and allergens.
pub fn render_text(report: &RecipeReport, style: DecimalStyle) -> String {
    let decimals = DISPLAY_DECIMALS as usize;
    let mut out = String::new();

    match &report.client {
        Some(client) => out.push_str(&format!("Recipe: {} ({})\n\n", report.recipe, client)),
        None => out.push_str(&format!("Recipe: {}\n\n", report.recipe)),
    }

    match &report.nutrition {
        Some(nutrition) => {
            let rounded = nutrition.rounded_per_100g();
            out.push_str("Nutrition per 100 g\n");
            for nutrient in Nutrient::ALL {
                let label = format!("{} ({})", nutrient.label(), nutrient.unit());
                let value = style.format(rounded.get(nutrient), decimals);
                out.push_str(&format!("  {:<22} {:>10}\n", label, value));
            }
            out.push_str(&format!(
                "  {:<22} {:>10}\n",
                "Total mass (g)",
                style.format(nutrition.total_mass_g, decimals)
            ));
        }
        None => {
            out.push_str("WARNING: the recipe has no quantities assigned; nutrition per 100 g is undefined.\n");
        }
    }

    out.push_str("\nIngredient share\n");
    out.push_str(&format!("  {:<30} {:>12} {:>8}\n", "Ingredient", "Quantity (g)", "%"));
    for row in &report.mass_shares {
        let percent = row.percent.map(|p| style.format(p, decimals)).unwrap_or_default();
        out.push_str(&format!(
            "  {:<30} {:>12} {:>8}\n",
            row.ingredient,
            style.format(row.quantity_g, decimals),
            percent
        ));
    }

    out.push_str(&format!("\nIngredients: {}\n", report.ingredient_list));
    if report.allergens.is_empty() {
        out.push_str("Allergens: none declared\n");
    } else {
        let allergens: Vec<&str> = report.allergens.iter().collect();
        out.push_str(&format!("Allergens: {}\n", allergens.join(", ")));
    }
    out
}

/// Distinct ingredient identities used by `lines`, in first-seen order.
pub fn used_ingredients<'a, L>(lines: &[RecipeLine], catalog: &'a L) -> Vec<&'a IngredientRecord>
where
    L: IngredientLookup + ?Sized,
{
    let mut seen = HashSet::new();
    lines
        .iter()
        .filter(|l| seen.insert(l.key()))
        .filter_map(|l| catalog.lookup_ingredient(&l.ingredient, &l.supplier))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Nutrients;
    use crate::storage::IngredientCatalog;

    fn catalog() -> IngredientCatalog {
        IngredientCatalog::from_records(vec![
            IngredientRecord::new(
                "Chocolate",
                "Valor",
                Nutrients {
                    energy_kcal: 540.0,
                    ..Default::default()
                },
            )
            .with_composition("cacao, azúcar, leche en polvo, lecitina de soja")
            .with_allergens("Leche, soja"),
            IngredientRecord::new(
                "Harina de trigo",
                "Molinos",
                Nutrients {
                    energy_kcal: 364.0,
                    ..Default::default()
                },
            )
            .with_allergens("trigo"),
            IngredientRecord::new("Agua", "Grifo", Nutrients::default()),
        ])
    }

    #[test]
    fn test_full_report() {
        let lines = vec![
            RecipeLine::new("Brownie", "Harina de trigo", "Molinos", 100.0),
            RecipeLine::new("Brownie", "Chocolate", "Valor", 300.0),
            RecipeLine::new("Brownie", "Agua", "Grifo", 100.0),
        ];
        let report = analyze_recipe("Brownie", Some("Safood"), &lines, &catalog()).unwrap();

        let nutrition = report.nutrition.as_ref().unwrap();
        assert_eq!(nutrition.total_mass_g, 500.0);
        assert_eq!(nutrition.rounded_per_100g().energy_kcal, 396.8);

        assert_eq!(report.allergens.to_vec(), vec!["leche", "soja", "trigo"]);
        assert_eq!(
            report.ingredient_list,
            "Chocolate (cacao, azúcar, **LECHE** en polvo, lecitina de **SOJA**), Harina de **TRIGO**, Agua"
        );
        assert_eq!(report.mass_shares[0].percent, Some(60.0));
    }

    #[test]
    fn test_zero_mass_still_reports_tables() {
        let lines = vec![
            RecipeLine::new("Vacía", "Chocolate", "Valor", 0.0),
            RecipeLine::new("Vacía", "Agua", "Grifo", 0.0),
        ];
        let report = analyze_recipe("Vacía", None, &lines, &catalog()).unwrap();
        assert!(report.is_zero_mass());
        assert_eq!(report.mass_shares.len(), 2);
        assert!(report.mass_shares.iter().all(|r| r.percent.is_none()));
        assert_eq!(report.allergens.len(), 2);

        let text = render_text(&report, DecimalStyle::Point);
        assert!(text.contains("WARNING"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn test_empty_recipe_names_recipe_and_client() {
        let err = analyze_recipe("Tarta", Some("Safood"), &[], &catalog()).unwrap_err();
        assert_eq!(
            err,
            LabelError::EmptyRecipe {
                recipe: "Tarta".to_string(),
                client: Some("Safood".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_record_aborts_report() {
        let lines = vec![RecipeLine::new("R", "Chocolate", "Otro", 10.0)];
        assert!(matches!(
            analyze_recipe("R", None, &lines, &catalog()),
            Err(LabelError::MissingIngredientRecord { .. })
        ));
    }

    #[test]
    fn test_render_decimal_comma() {
        let lines = vec![
            RecipeLine::new("R", "Chocolate", "Valor", 1.0),
            RecipeLine::new("R", "Agua", "Grifo", 2.0),
        ];
        let report = analyze_recipe("R", None, &lines, &catalog()).unwrap();
        let text = render_text(&report, DecimalStyle::Comma);
        assert!(text.contains("180,00"), "{}", text);
        assert!(text.contains("33,33"), "{}", text);
        assert!(text.contains("Allergens: leche, soja"));
    }

    #[test]
    fn test_used_ingredients_deduplicates() {
        let lines = vec![
            RecipeLine::new("R", "Agua", "Grifo", 1.0),
            RecipeLine::new("R", "Chocolate", "Valor", 1.0),
            RecipeLine::new("R", "Agua", "Grifo", 1.0),
            RecipeLine::new("R", "Nada", "X", 1.0),
        ];
        let catalog = catalog();
        let names: Vec<&str> = used_ingredients(&lines, &catalog).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Agua", "Chocolate"]);
    }
}
