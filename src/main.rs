use anyhow::{bail, Result};
use recipe_label::cli::{parse_args, AddRecipeLineArgs, AnalyzeArgs, Cli, Command};
use recipe_label::error::LabelError;
use recipe_label::model::{IngredientKey, IngredientRecord, RecipeLine};
use recipe_label::recipe_aggregator::validate_quantity;
use recipe_label::report::{analyze_client_recipes, analyze_recipe, render_text, RecipeReport};
use recipe_label::storage::catalog::validate_nutrients;
use recipe_label::storage::{CsvStore, IngredientLookup, IngredientSink, RecipeSource};
use serde::Serialize;
use std::collections::HashSet;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct BatchEntry<'a> {
    recipe: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a RecipeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn status_for(report: &RecipeReport) -> u8 {
    if report.is_zero_mass() {
        LabelError::ZeroMassRecipe.exit_code()
    } else {
        0
    }
}

/// Flags catalog keys used here that were listed twice with different text.
fn print_divergence_notes(store: &CsvStore, used: &HashSet<IngredientKey>) {
    for entry in store.catalog().divergent_entries() {
        if used.contains(&entry.key) {
            eprintln!(
                "Note: {} appears more than once in the catalog with different composition or allergens; \
                 the first entry is used.",
                entry.key
            );
        }
    }
}

fn run_analyze_all(store: &CsvStore, args: &AnalyzeArgs) -> Result<u8> {
    let outcomes = analyze_client_recipes(store, args.client.as_deref())?;
    let used: HashSet<IngredientKey> = outcomes
        .iter()
        .filter_map(|(_, outcome)| outcome.as_ref().ok())
        .flat_map(|report| report.mass_shares.iter().map(|row| row.key()))
        .collect();
    print_divergence_notes(store, &used);
    let mut status = 0;
    let mut entries = Vec::with_capacity(outcomes.len());
    for (recipe, outcome) in &outcomes {
        let entry = match outcome {
            Ok(report) => {
                status = status.max(status_for(report));
                BatchEntry {
                    recipe: recipe.as_str(),
                    report: Some(report),
                    error: None,
                }
            }
            Err(e) => {
                status = status.max(e.exit_code());
                BatchEntry {
                    recipe: recipe.as_str(),
                    report: None,
                    error: Some(e.to_string()),
                }
            }
        };
        entries.push(entry);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(status);
    }
    for entry in &entries {
        if let Some(report) = entry.report {
            println!("{}", render_text(report, args.decimal_style()));
        } else if let Some(error) = &entry.error {
            println!("Recipe: {}\nERROR: {}\n", entry.recipe, error);
        }
    }
    Ok(status)
}

fn run_analyze(cli: &Cli, args: &AnalyzeArgs) -> Result<u8> {
    let store = CsvStore::open(&cli.store_config())?;
    if args.all {
        return run_analyze_all(&store, args);
    }
    let Some(recipe) = args.recipe.as_deref() else {
        bail!("--recipe or --all is required");
    };

    let client = args.client.as_deref();
    let lines = store.list_recipe_lines(client, recipe)?;
    let report = analyze_recipe(recipe, client, &lines, &store)?;
    print_divergence_notes(&store, &lines.iter().map(RecipeLine::key).collect());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report, args.decimal_style()));
    }
    Ok(status_for(&report))
}

fn run_add_recipe_line(cli: &Cli, args: &AddRecipeLineArgs) -> Result<()> {
    let mut store = CsvStore::open_or_create(&cli.store_config())?;
    let ingredient = args.ingredient.trim();

    let supplier = match args.supplier.as_deref() {
        Some(supplier) => supplier.trim().to_string(),
        None => {
            let catalog = store.catalog();
            let records: Box<dyn Iterator<Item = &IngredientRecord> + '_> = match args.client.as_deref() {
                Some(client) => Box::new(catalog.for_client(client)),
                None => Box::new(catalog.records().iter()),
            };
            let candidates: Vec<&str> = records
                .filter(|r| r.name == ingredient)
                .map(|r| r.supplier.as_str())
                .collect();
            match candidates.as_slice() {
                [only] => only.to_string(),
                [] => bail!("Ingredient '{}' is not in the catalog", ingredient),
                _ => bail!(
                    "Ingredient '{}' has several suppliers ({}); pass --supplier",
                    ingredient,
                    candidates.join(", ")
                ),
            }
        }
    };

    if store.lookup_ingredient(ingredient, &supplier).is_none() {
        return Err(LabelError::MissingIngredientRecord {
            ingredient: ingredient.to_string(),
            supplier,
        }
        .into());
    }

    let mut line = RecipeLine::new(args.recipe.trim(), ingredient, supplier, args.quantity);
    if let Some(client) = &args.client {
        line = line.with_client(client.trim());
    }
    validate_quantity(&line)?;
    store.append_recipe_line(&line)?;
    info!(recipe = %line.recipe, ingredient = %line.ingredient, "recipe line saved");
    println!("Saved {} g of {} to recipe '{}'.", line.quantity_g, line.ingredient, line.recipe);
    Ok(())
}

fn run(cli: &Cli) -> Result<u8> {
    match &cli.command {
        Command::Analyze(args) => run_analyze(cli, args),
        Command::Clients => {
            let store = CsvStore::open_or_create(&cli.store_config())?;
            for client in store.catalog().clients() {
                println!("{}", client);
            }
            Ok(0)
        }
        Command::Recipes { client } => {
            let store = CsvStore::open_or_create(&cli.store_config())?;
            for recipe in store.list_recipes(client.as_deref())? {
                println!("{}", recipe);
            }
            Ok(0)
        }
        Command::AddIngredient(args) => {
            let record = args.to_record();
            if record.name.is_empty() || record.supplier.is_empty() {
                bail!("Ingredient name and supplier must not be empty");
            }
            validate_nutrients(&record)?;
            let mut store = CsvStore::open_or_create(&cli.store_config())?;
            store.append_ingredient(&record)?;
            println!("Saved ingredient '{}' from '{}'.", record.name, record.supplier);
            Ok(0)
        }
        Command::AddRecipeLine(args) => run_add_recipe_line(cli, args).map(|_| 0),
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok(); // Load .env file for store paths

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recipe_label=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    match run(&cli) {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<LabelError>() {
                Some(label_error) => ExitCode::from(label_error.exit_code()),
                None => ExitCode::FAILURE,
            }
        }
    }
}
