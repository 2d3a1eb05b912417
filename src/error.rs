use thiserror::Error;

use crate::model::Nutrient;

/// Recoverable outcomes of a recipe analysis. None of these are defaulted to
/// zero; the caller decides how to present them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelError {
    #[error("no catalog entry for ingredient '{ingredient}' from supplier '{supplier}'")]
    MissingIngredientRecord { ingredient: String, supplier: String },

    #[error("recipe has a total mass of 0 g; nutrition per 100 g is undefined")]
    ZeroMassRecipe,

    #[error("no lines found for recipe{}{}", recipe_suffix(.recipe), client_suffix(.client))]
    EmptyRecipe {
        recipe: String,
        client: Option<String>,
    },

    #[error("invalid quantity {quantity} g for ingredient '{ingredient}'")]
    InvalidQuantity { ingredient: String, quantity: f64 },

    #[error("invalid {} value {value} for ingredient '{ingredient}'", .nutrient.label())]
    InvalidNutrientValue {
        ingredient: String,
        nutrient: Nutrient,
        value: f64,
    },
}

impl LabelError {
    /// Process exit status used by the command line front end.
    pub fn exit_code(&self) -> u8 {
        match self {
            LabelError::MissingIngredientRecord { .. } | LabelError::EmptyRecipe { .. } => 2,
            LabelError::ZeroMassRecipe => 3,
            LabelError::InvalidQuantity { .. } | LabelError::InvalidNutrientValue { .. } => 1,
        }
    }
}

pub type LabelResult<T> = Result<T, LabelError>;

fn recipe_suffix(recipe: &str) -> String {
    if recipe.is_empty() {
        String::new()
    } else {
        format!(" '{}'", recipe)
    }
}

fn client_suffix(client: &Option<String>) -> String {
    match client {
        Some(c) => format!(" of client '{}'", c),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_missing_key() {
        let err = LabelError::MissingIngredientRecord {
            ingredient: "Harina".to_string(),
            supplier: "Molinos".to_string(),
        };
        assert!(err.to_string().contains("'Harina'"));
        assert!(err.to_string().contains("'Molinos'"));
    }

    #[test]
    fn test_empty_recipe_message_with_and_without_client() {
        let with_client = LabelError::EmptyRecipe {
            recipe: "Brownie".to_string(),
            client: Some("Safood".to_string()),
        };
        assert_eq!(
            with_client.to_string(),
            "no lines found for recipe 'Brownie' of client 'Safood'"
        );
        let without = LabelError::EmptyRecipe {
            recipe: "Brownie".to_string(),
            client: None,
        };
        assert_eq!(without.to_string(), "no lines found for recipe 'Brownie'");
    }

    #[test]
    fn test_unnamed_empty_recipe_and_nutrient_messages() {
        let unnamed = LabelError::EmptyRecipe {
            recipe: String::new(),
            client: None,
        };
        assert_eq!(unnamed.to_string(), "no lines found for recipe");

        let err = LabelError::InvalidNutrientValue {
            ingredient: "Leche".to_string(),
            nutrient: Nutrient::SaturatedFat,
            value: -5.0,
        };
        assert_eq!(err.to_string(), "invalid Saturated fat value -5 for ingredient 'Leche'");
        assert_eq!(err.exit_code(), 1);
    }
}
