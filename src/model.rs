use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight nutrients declared on a label, in label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Energy,
    Protein,
    Fat,
    SaturatedFat,
    Carbohydrate,
    Sugars,
    Fiber,
    Salt,
}

impl Nutrient {
    pub const ALL: [Nutrient; 8] = [
        Nutrient::Energy,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::SaturatedFat,
        Nutrient::Carbohydrate,
        Nutrient::Sugars,
        Nutrient::Fiber,
        Nutrient::Salt,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Energy => "Energy",
            Nutrient::Protein => "Protein",
            Nutrient::Fat => "Fat",
            Nutrient::SaturatedFat => "Saturated fat",
            Nutrient::Carbohydrate => "Carbohydrate",
            Nutrient::Sugars => "Sugars",
            Nutrient::Fiber => "Fiber",
            Nutrient::Salt => "Salt",
        }
    }

    /// Energy is declared in kcal, everything else in grams.
    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Energy => "kcal",
            _ => "g",
        }
    }
}

/// One value per nutrient. Depending on context the values are per 100g of an
/// ingredient, absolute amounts contributed by a quantity, or per 100g of a recipe.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Nutrients {
    pub energy_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub saturated_fat_g: f64,
    pub carbohydrate_g: f64,
    pub sugars_g: f64,
    pub fiber_g: f64,
    pub salt_g: f64,
}

macro_rules! for_each_field {
    ($mac:ident) => {
        $mac!(energy_kcal);
        $mac!(protein_g);
        $mac!(fat_g);
        $mac!(saturated_fat_g);
        $mac!(carbohydrate_g);
        $mac!(sugars_g);
        $mac!(fiber_g);
        $mac!(salt_g);
    };
}

impl Nutrients {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Energy => self.energy_kcal,
            Nutrient::Protein => self.protein_g,
            Nutrient::Fat => self.fat_g,
            Nutrient::SaturatedFat => self.saturated_fat_g,
            Nutrient::Carbohydrate => self.carbohydrate_g,
            Nutrient::Sugars => self.sugars_g,
            Nutrient::Fiber => self.fiber_g,
            Nutrient::Salt => self.salt_g,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        let slot = match nutrient {
            Nutrient::Energy => &mut self.energy_kcal,
            Nutrient::Protein => &mut self.protein_g,
            Nutrient::Fat => &mut self.fat_g,
            Nutrient::SaturatedFat => &mut self.saturated_fat_g,
            Nutrient::Carbohydrate => &mut self.carbohydrate_g,
            Nutrient::Sugars => &mut self.sugars_g,
            Nutrient::Fiber => &mut self.fiber_g,
            Nutrient::Salt => &mut self.salt_g,
        };
        *slot = value;
    }

    /// Every value multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Nutrients {
        let mut out = *self;
        macro_rules! scale {
            ($field:ident) => {
                out.$field *= factor;
            };
        }
        for_each_field!(scale);
        out
    }

    pub fn add_assign(&mut self, other: &Nutrients) {
        macro_rules! add {
            ($field:ident) => {
                self.$field += other.$field;
            };
        }
        for_each_field!(add);
    }

    /// Rounded to `decimals` places; a presentation step only.
    pub fn rounded(&self, decimals: u32) -> Nutrients {
        let mut out = *self;
        macro_rules! round {
            ($field:ident) => {
                out.$field = round_to(out.$field, decimals);
            };
        }
        for_each_field!(round);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        Nutrient::ALL.into_iter().map(move |n| (n, self.get(n)))
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Catalog identity of an ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngredientKey {
    pub name: String,
    pub supplier: String,
}

impl IngredientKey {
    pub fn new(name: impl Into<String>, supplier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supplier: supplier.into(),
        }
    }
}

impl fmt::Display for IngredientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.supplier)
    }
}

/// A catalog entry. Nutrient values are per 100g of the ingredient as received.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngredientRecord {
    pub client: Option<String>,
    pub name: String,
    pub supplier: String,
    pub reference: Option<String>,
    pub composition: Option<String>,
    /// Comma-separated free text, matched case-insensitively.
    pub allergens: Option<String>,
    pub per_100g: Nutrients,
}

impl IngredientRecord {
    pub fn new(name: impl Into<String>, supplier: impl Into<String>, per_100g: Nutrients) -> Self {
        Self {
            client: None,
            name: name.into(),
            supplier: supplier.into(),
            reference: None,
            composition: None,
            allergens: None,
            per_100g,
        }
    }

    pub fn with_composition(mut self, composition: impl Into<String>) -> Self {
        self.composition = Some(composition.into());
        self
    }

    pub fn with_allergens(mut self, allergens: impl Into<String>) -> Self {
        self.allergens = Some(allergens.into());
        self
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn key(&self) -> IngredientKey {
        IngredientKey::new(self.name.clone(), self.supplier.clone())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecipeLine {
    pub client: Option<String>,
    pub recipe: String,
    pub ingredient: String,
    pub supplier: String,
    pub quantity_g: f64,
}

impl RecipeLine {
    pub fn new(
        recipe: impl Into<String>,
        ingredient: impl Into<String>,
        supplier: impl Into<String>,
        quantity_g: f64,
    ) -> Self {
        Self {
            client: None,
            recipe: recipe.into(),
            ingredient: ingredient.into(),
            supplier: supplier.into(),
            quantity_g,
        }
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn key(&self) -> IngredientKey {
        IngredientKey::new(self.ingredient.clone(), self.supplier.clone())
    }
}
