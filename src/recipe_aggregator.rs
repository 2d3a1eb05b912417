use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LabelError, LabelResult};
use crate::model::{Nutrients, RecipeLine};
use crate::storage::IngredientLookup;

/// Decimal places used when nutrition figures are presented.
pub const DISPLAY_DECIMALS: u32 = 2;

// Holds both the absolute totals and the per-100g normalized values, at full precision.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregationResult {
    pub total_mass_g: f64,
    pub totals: Nutrients,
    pub per_100g: Nutrients,
}

impl AggregationResult {
    /// The per-100g vector rounded for display.
    pub fn rounded_per_100g(&self) -> Nutrients {
        self.per_100g.rounded(DISPLAY_DECIMALS)
    }
}

/// Joins every line to its catalog record, scales each nutrient by the line's
/// quantity and normalizes the sum to 100 g of finished recipe.
///
/// Every line is resolved, including zero-quantity ones, so a broken catalog
/// reference is reported even when it would contribute nothing.
///
/// `lines` carry no recipe name when empty, so the `EmptyRecipe` returned here
/// is unnamed; `report::analyze_recipe` checks first and names the recipe.
pub fn aggregate<L>(lines: &[RecipeLine], catalog: &L) -> LabelResult<AggregationResult>
where
    L: IngredientLookup + ?Sized,
{
    let Some(first) = lines.first() else {
        return Err(LabelError::EmptyRecipe {
            recipe: String::new(),
            client: None,
        });
    };

    let mut totals = Nutrients::default();
    let mut total_mass_g = 0.0_f64;

    for line in lines {
        validate_quantity(line)?;
        let record = catalog
            .lookup_ingredient(&line.ingredient, &line.supplier)
            .ok_or_else(|| LabelError::MissingIngredientRecord {
                ingredient: line.ingredient.clone(),
                supplier: line.supplier.clone(),
            })?;

        // contribution = value_per_100g * quantity / 100
        totals.add_assign(&record.per_100g.scaled(line.quantity_g / 100.0));
        total_mass_g += line.quantity_g;
    }

    if total_mass_g == 0.0 {
        debug!(recipe = %first.recipe, "all recipe lines have zero quantity");
        return Err(LabelError::ZeroMassRecipe);
    }

    let per_100g = totals.scaled(100.0 / total_mass_g);
    debug!(recipe = %first.recipe, lines = lines.len(), total_mass_g, "recipe aggregated");

    Ok(AggregationResult {
        total_mass_g,
        totals,
        per_100g,
    })
}

/// Quantities must be finite and not negative.
pub fn validate_quantity(line: &RecipeLine) -> LabelResult<()> {
    if line.quantity_g.is_finite() && line.quantity_g >= 0.0 {
        Ok(())
    } else {
        Err(LabelError::InvalidQuantity {
            ingredient: line.ingredient.clone(),
            quantity: line.quantity_g,
        })
    }
}
