use crate::mass_share::MassShareRow;
use crate::model::IngredientKey;

/// Builds the label ingredient list from mass shares already sorted heaviest
/// first: `"Name (composition)"` when a non-blank composition is known, else
/// just `"Name"`, joined with `", "`.
pub fn format_ingredient_list<'a, F>(shares: &[MassShareRow], composition_of: F) -> String
where
    F: Fn(&IngredientKey) -> Option<&'a str>,
{
    shares
        .iter()
        .map(|row| {
            let name = row.ingredient.trim();
            match composition_of(&row.key()).map(str::trim) {
                Some(composition) if !composition.is_empty() => format!("{} ({})", name, composition),
                _ => name.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
