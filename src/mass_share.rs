use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{round_to, IngredientKey, RecipeLine};

/// One ingredient's share of the recipe weight.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MassShareRow {
    pub ingredient: String,
    pub supplier: String,
    pub quantity_g: f64,
    /// Rounded to 2 decimals. `None` when the recipe weighs 0 g.
    pub percent: Option<f64>,
}

impl MassShareRow {
    pub fn key(&self) -> IngredientKey {
        IngredientKey::new(self.ingredient.clone(), self.supplier.clone())
    }
}

/// Groups lines by (name, supplier), sums their quantities and reports each
/// group's percentage of the total, heaviest first.
///
/// Groups with equal quantity keep the order in which they first appear in
/// `lines`, so identical input always yields identical output.
pub fn mass_shares(lines: &[RecipeLine]) -> Vec<MassShareRow> {
    let mut rows: Vec<MassShareRow> = Vec::new();
    let mut positions: HashMap<IngredientKey, usize> = HashMap::new();

    for line in lines {
        let key = line.key();
        match positions.get(&key) {
            Some(&idx) => rows[idx].quantity_g += line.quantity_g,
            None => {
                positions.insert(key, rows.len());
                rows.push(MassShareRow {
                    ingredient: line.ingredient.clone(),
                    supplier: line.supplier.clone(),
                    quantity_g: line.quantity_g,
                    percent: None,
                });
            }
        }
    }

    let total_mass_g: f64 = rows.iter().map(|r| r.quantity_g).sum();
    if total_mass_g > 0.0 {
        for row in rows.iter_mut() {
            row.percent = Some(round_to(row.quantity_g / total_mass_g * 100.0, 2));
        }
    }

    // sort_by is stable
    rows.sort_by(|a, b| b.quantity_g.total_cmp(&a.quantity_g));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_shares_sorted_descending() {
        let lines = vec![
            RecipeLine::new("Bizcocho", "Huevo", "Granja", 200.0),
            RecipeLine::new("Bizcocho", "Harina", "Molinos", 500.0),
            RecipeLine::new("Bizcocho", "Azúcar", "Acor", 300.0),
        ];
        let shares = mass_shares(&lines);
        let names: Vec<&str> = shares.iter().map(|r| r.ingredient.as_str()).collect();
        assert_eq!(names, vec!["Harina", "Azúcar", "Huevo"]);
        assert_eq!(shares[0].percent, Some(50.0));
        assert_eq!(shares[1].percent, Some(30.0));
        assert_eq!(shares[2].percent, Some(20.0));
    }

    #[test]
    fn test_duplicate_identity_is_summed_once() {
        let lines = vec![
            RecipeLine::new("R", "Harina", "Molinos", 100.0),
            RecipeLine::new("R", "Agua", "Grifo", 150.0),
            RecipeLine::new("R", "Harina", "Molinos", 100.0),
        ];
        let shares = mass_shares(&lines);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].ingredient, "Harina");
        assert_eq!(shares[0].quantity_g, 200.0);
        assert_eq!(shares[0].percent, Some(57.14));
    }

    #[test]
    fn test_same_name_different_supplier_stays_separate() {
        let lines = vec![
            RecipeLine::new("R", "Harina", "Molinos", 100.0),
            RecipeLine::new("R", "Harina", "Harinera", 100.0),
        ];
        assert_eq!(mass_shares(&lines).len(), 2);
    }

    #[test]
    fn test_ties_keep_input_order_across_runs() {
        let lines = vec![
            RecipeLine::new("R", "Cacao", "A", 50.0),
            RecipeLine::new("R", "Leche", "B", 100.0),
            RecipeLine::new("R", "Azúcar", "C", 50.0),
            RecipeLine::new("R", "Sal", "D", 50.0),
        ];
        let first = mass_shares(&lines);
        let names: Vec<&str> = first.iter().map(|r| r.ingredient.as_str()).collect();
        assert_eq!(names, vec!["Leche", "Cacao", "Azúcar", "Sal"]);
        for _ in 0..10 {
            assert_eq!(mass_shares(&lines), first);
        }
    }

    #[test]
    fn test_zero_mass_has_no_percentages() {
        let lines = vec![
            RecipeLine::new("R", "Harina", "Molinos", 0.0),
            RecipeLine::new("R", "Agua", "Grifo", 0.0),
        ];
        let shares = mass_shares(&lines);
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|r| r.percent.is_none()));
        assert!(shares.iter().all(|r| r.quantity_g == 0.0));
    }

    #[test]
    fn test_percentages_sum_to_100_within_rounding() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let count = rng.gen_range(1..=20);
            let lines: Vec<RecipeLine> = (0..count)
                .map(|i| {
                    RecipeLine::new("R", format!("Ing{}", i), "S", rng.gen_range(0.5..2000.0))
                })
                .collect();
            let sum: f64 = mass_shares(&lines).iter().filter_map(|r| r.percent).sum();
            assert!((sum - 100.0).abs() <= 0.1, "sum was {}", sum);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(mass_shares(&[]).is_empty());
    }
}
