use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::catalog::validate_nutrients;
use super::{IngredientCatalog, IngredientLookup, IngredientSink, RecipeSource};
use crate::config::StoreConfig;
use crate::model::{IngredientRecord, Nutrient, Nutrients, RecipeLine};

// Ingredient sheet headers
const CLIENT_COL: &str = "Client";
const NAME_COL: &str = "Name";
const SUPPLIER_COL: &str = "Supplier";
const REFERENCE_COL: &str = "Reference";
const COMPOSITION_COL: &str = "Composition";
const ALLERGENS_COL: &str = "Allergens";
const ENERGY_COL: &str = "Energy (kcal/100g)";
const PROTEIN_COL: &str = "Protein (g/100g)";
const FAT_COL: &str = "Fat (g/100g)";
const SAT_FAT_COL: &str = "Saturated fat (g/100g)";
const CARB_COL: &str = "Carbohydrate (g/100g)";
const SUGARS_COL: &str = "Sugars (g/100g)";
const FIBER_COL: &str = "Fiber (g/100g)";
const SALT_COL: &str = "Salt (g/100g)";

// Recipe sheet headers
const RECIPE_COL: &str = "Recipe";
const INGREDIENT_COL: &str = "Ingredient";
const QUANTITY_COL: &str = "Quantity (g)";

pub const INGREDIENT_HEADERS: [&str; 14] = [
    CLIENT_COL,
    NAME_COL,
    SUPPLIER_COL,
    REFERENCE_COL,
    COMPOSITION_COL,
    ALLERGENS_COL,
    ENERGY_COL,
    PROTEIN_COL,
    FAT_COL,
    SAT_FAT_COL,
    CARB_COL,
    SUGARS_COL,
    FIBER_COL,
    SALT_COL,
];

pub const RECIPE_HEADERS: [&str; 5] = [CLIENT_COL, RECIPE_COL, INGREDIENT_COL, SUPPLIER_COL, QUANTITY_COL];

fn nutrient_column(nutrient: Nutrient) -> &'static str {
    match nutrient {
        Nutrient::Energy => ENERGY_COL,
        Nutrient::Protein => PROTEIN_COL,
        Nutrient::Fat => FAT_COL,
        Nutrient::SaturatedFat => SAT_FAT_COL,
        Nutrient::Carbohydrate => CARB_COL,
        Nutrient::Sugars => SUGARS_COL,
        Nutrient::Fiber => FIBER_COL,
        Nutrient::Salt => SALT_COL,
    }
}

fn required_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("Column '{}' not found", name))
}

fn optional_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn optional_text(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parses a non-negative amount. Blank cells count as 0; a decimal comma is accepted.
fn parse_amount(raw: &str, column: &str, line_no: usize) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = trimmed
        .replace(',', ".")
        .parse()
        .with_context(|| format!("Invalid number '{}' in column '{}' at line {}", trimmed, column, line_no))?;
    if !value.is_finite() || value < 0.0 {
        bail!("Negative or non-finite value '{}' in column '{}' at line {}", trimmed, column, line_no);
    }
    Ok(value)
}

fn open_reader(path: &Path, what: &str) -> Result<csv::Reader<std::fs::File>> {
    if !path.exists() {
        bail!("{} file not found at: {:?}", what, path);
    }
    let file =
        std::fs::File::open(path).with_context(|| format!("Failed to open {} file at {:?}", what, path))?;
    Ok(ReaderBuilder::new().has_headers(true).flexible(true).from_reader(file))
}

pub fn load_ingredient_catalog(csv_path: &Path) -> Result<IngredientCatalog> {
    let mut rdr = open_reader(csv_path, "Ingredient catalog")?;
    let headers = rdr.headers()?.clone();

    let name_idx = required_column(&headers, NAME_COL)?;
    let supplier_idx = required_column(&headers, SUPPLIER_COL)?;
    let mut nutrient_idx = Vec::with_capacity(Nutrient::ALL.len());
    for nutrient in Nutrient::ALL {
        nutrient_idx.push((nutrient, required_column(&headers, nutrient_column(nutrient))?));
    }
    let client_idx = optional_column(&headers, CLIENT_COL);
    let reference_idx = optional_column(&headers, REFERENCE_COL);
    let composition_idx = optional_column(&headers, COMPOSITION_COL);
    let allergens_idx = optional_column(&headers, ALLERGENS_COL);

    let mut catalog = IngredientCatalog::default();
    for (row_index, result) in rdr.records().enumerate() {
        let line_no = row_index + 2; // header is line 1
        let record = result.with_context(|| format!("Failed to read ingredient at line {}", line_no))?;

        let name = record.get(name_idx).unwrap_or("").trim().to_string();
        if name.is_empty() {
            debug!(line = line_no, "skipping ingredient row with empty name");
            continue;
        }

        let mut per_100g = Nutrients::default();
        for &(nutrient, idx) in &nutrient_idx {
            let value = parse_amount(record.get(idx).unwrap_or(""), nutrient_column(nutrient), line_no)?;
            per_100g.set(nutrient, value);
        }

        catalog.insert(IngredientRecord {
            client: optional_text(&record, client_idx),
            name,
            supplier: record.get(supplier_idx).unwrap_or("").trim().to_string(),
            reference: optional_text(&record, reference_idx),
            composition: optional_text(&record, composition_idx),
            allergens: optional_text(&record, allergens_idx),
            per_100g,
        });
    }

    if catalog.is_empty() {
        warn!(path = ?csv_path, "ingredient catalog is empty");
    }
    Ok(catalog)
}

pub fn load_recipe_lines(csv_path: &Path) -> Result<Vec<RecipeLine>> {
    let mut rdr = open_reader(csv_path, "Recipe")?;
    let headers = rdr.headers()?.clone();

    let recipe_idx = required_column(&headers, RECIPE_COL)?;
    let ingredient_idx = required_column(&headers, INGREDIENT_COL)?;
    let supplier_idx = required_column(&headers, SUPPLIER_COL)?;
    let quantity_idx = required_column(&headers, QUANTITY_COL)?;
    let client_idx = optional_column(&headers, CLIENT_COL);

    let mut lines = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let line_no = row_index + 2;
        let record = result.with_context(|| format!("Failed to read recipe line at line {}", line_no))?;

        let recipe = record.get(recipe_idx).unwrap_or("").trim().to_string();
        let ingredient = record.get(ingredient_idx).unwrap_or("").trim().to_string();
        if recipe.is_empty() || ingredient.is_empty() {
            debug!(line = line_no, "skipping recipe row without recipe or ingredient name");
            continue;
        }

        lines.push(RecipeLine {
            client: optional_text(&record, client_idx),
            recipe,
            ingredient,
            supplier: record.get(supplier_idx).unwrap_or("").trim().to_string(),
            quantity_g: parse_amount(record.get(quantity_idx).unwrap_or(""), QUANTITY_COL, line_no)?,
        });
    }
    Ok(lines)
}

/// Header of an existing, non-empty file.
fn existing_headers(path: &Path) -> Result<Option<StringRecord>> {
    let non_empty = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if !non_empty {
        return Ok(None);
    }
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;
    Ok(Some(rdr.headers()?.clone()))
}

/// Appends one row to `path`, placing each `(column, value)` under the file's own
/// header. A new or empty file gets `default_headers` first. Every `required`
/// column must be present in the header.
fn append_row(
    path: &Path,
    default_headers: &[&str],
    required: &[&str],
    values: &[(&str, String)],
) -> Result<()> {
    let existing = existing_headers(path)?;
    let headers = existing
        .clone()
        .unwrap_or_else(|| StringRecord::from(default_headers.to_vec()));
    for column in required {
        required_column(&headers, column).with_context(|| format!("Cannot append to {:?}", path))?;
    }

    let mut row = vec![String::new(); headers.len()];
    for (column, value) in values {
        match optional_column(&headers, column) {
            Some(idx) => row[idx] = value.clone(),
            None if !value.is_empty() => {
                warn!(path = ?path, column = %column, "column not in file header; value not stored");
            }
            None => {}
        }
    }

    // A last line without its newline would swallow the new row.
    let needs_newline = existing.is_some() && std::fs::read(path)?.last() != Some(&b'\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {:?} for appending", path))?;
    if needs_newline {
        file.write_all(b"\n")?;
    }
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if existing.is_none() {
        writer.write_record(default_headers)?;
    }
    writer.write_record(&row)?;
    writer.flush().with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Tabular-file backend: one CSV for the ingredient catalog, one for recipe lines.
///
/// Both files are read once at open; appends go to disk and to the in-memory copy.
#[derive(Debug)]
pub struct CsvStore {
    catalog_path: PathBuf,
    recipes_path: PathBuf,
    catalog: IngredientCatalog,
    lines: Vec<RecipeLine>,
}

impl CsvStore {
    /// Loads both files; either one missing is an error.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let catalog = load_ingredient_catalog(&config.catalog_path)
            .with_context(|| format!("Failed to load ingredient catalog from {:?}", config.catalog_path))?;
        let lines = load_recipe_lines(&config.recipes_path)
            .with_context(|| format!("Failed to load recipes from {:?}", config.recipes_path))?;
        info!(ingredients = catalog.len(), recipe_lines = lines.len(), "store loaded");
        Ok(Self {
            catalog_path: config.catalog_path.clone(),
            recipes_path: config.recipes_path.clone(),
            catalog,
            lines,
        })
    }

    /// Like [`CsvStore::open`], but a missing file is treated as empty so the
    /// first append can create it.
    pub fn open_or_create(config: &StoreConfig) -> Result<Self> {
        let catalog = if config.catalog_path.exists() {
            load_ingredient_catalog(&config.catalog_path)?
        } else {
            IngredientCatalog::default()
        };
        let lines = if config.recipes_path.exists() {
            load_recipe_lines(&config.recipes_path)?
        } else {
            Vec::new()
        };
        Ok(Self {
            catalog_path: config.catalog_path.clone(),
            recipes_path: config.recipes_path.clone(),
            catalog,
            lines,
        })
    }

    pub fn catalog(&self) -> &IngredientCatalog {
        &self.catalog
    }
}

impl IngredientLookup for CsvStore {
    fn lookup_ingredient(&self, name: &str, supplier: &str) -> Option<&IngredientRecord> {
        self.catalog.lookup_ingredient(name, supplier)
    }
}

fn client_matches(line: &RecipeLine, client: Option<&str>) -> bool {
    match client {
        Some(c) => line.client.as_deref().map(str::trim) == Some(c.trim()),
        None => true,
    }
}

impl RecipeSource for CsvStore {
    fn list_recipe_lines(&self, client: Option<&str>, recipe: &str) -> Result<Vec<RecipeLine>> {
        Ok(self
            .lines
            .iter()
            .filter(|l| l.recipe == recipe.trim() && client_matches(l, client))
            .cloned()
            .collect())
    }

    fn list_recipes(&self, client: Option<&str>) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for line in self.lines.iter().filter(|l| client_matches(l, client)) {
            if !names.contains(&line.recipe) {
                names.push(line.recipe.clone());
            }
        }
        Ok(names)
    }

    fn append_recipe_line(&mut self, line: &RecipeLine) -> Result<()> {
        append_row(
            &self.recipes_path,
            &RECIPE_HEADERS,
            &[RECIPE_COL, INGREDIENT_COL, SUPPLIER_COL, QUANTITY_COL],
            &[
                (CLIENT_COL, line.client.clone().unwrap_or_default()),
                (RECIPE_COL, line.recipe.clone()),
                (INGREDIENT_COL, line.ingredient.clone()),
                (SUPPLIER_COL, line.supplier.clone()),
                (QUANTITY_COL, line.quantity_g.to_string()),
            ],
        )?;
        self.lines.push(line.clone());
        Ok(())
    }
}

impl IngredientSink for CsvStore {
    fn append_ingredient(&mut self, record: &IngredientRecord) -> Result<()> {
        validate_nutrients(record)?;

        let mut values = vec![
            (CLIENT_COL, record.client.clone().unwrap_or_default()),
            (NAME_COL, record.name.clone()),
            (SUPPLIER_COL, record.supplier.clone()),
            (REFERENCE_COL, record.reference.clone().unwrap_or_default()),
            (COMPOSITION_COL, record.composition.clone().unwrap_or_default()),
            (ALLERGENS_COL, record.allergens.clone().unwrap_or_default()),
        ];
        values.extend(record.per_100g.iter().map(|(n, v)| (nutrient_column(n), v.to_string())));

        let mut required = vec![NAME_COL, SUPPLIER_COL];
        required.extend(Nutrient::ALL.into_iter().map(nutrient_column));

        append_row(&self.catalog_path, &INGREDIENT_HEADERS, &required, &values)?;
        self.catalog.insert(record.clone());
        Ok(())
    }
}
