//! Cascade Console
//!
//! Interactive playground for a cascade configuration: edits an in-memory
//! work item and shows how dependent fields narrow as parents change.

use anyhow::{Context, Result};
use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::info;

use work_item_cascades::cascade::{CascadeConfiguration, CascadeEngine, CascadeOutcome};
use work_item_cascades::form::{FormService, InMemoryForm, StaticFieldCatalog};
use work_item_cascades::hints::TracingHinter;
use work_item_cascades::utils::logging::{init_logging, DEFAULT_FILTER};
use work_item_cascades::validation::ConfigurationValidator;

// ──────────────────────────────────────────────────────────────────────────────
// CONFIGURATION
// ──────────────────────────────────────────────────────────────────────────────

struct ConsoleConfig {
    /// Cascade configuration (JSON or YAML)
    config_file: String,
    /// JSON object of field → allowed values
    schema_file: String,
    project: String,
}

impl ConsoleConfig {
    fn from_env() -> Self {
        Self {
            config_file: env::var("CASCADE_CONFIG").unwrap_or_else(|_| "cascades.json".to_string()),
            schema_file: env::var("CASCADE_SCHEMA").unwrap_or_else(|_| "schema.json".to_string()),
            project: env::var("CASCADE_PROJECT").unwrap_or_else(|_| "default".to_string()),
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging(DEFAULT_FILTER)?;

    let settings = ConsoleConfig::from_env();
    let config = CascadeConfiguration::load(&settings.config_file)
        .await
        .with_context(|| format!("Could not load cascades from '{}'", settings.config_file))?;
    let form = Arc::new(InMemoryForm::from_schema_file(&settings.schema_file).await?);
    let catalog = Arc::new(
        StaticFieldCatalog::new().with_project(settings.project.clone(), form.field_names().map(str::to_string)),
    );

    let validator = ConfigurationValidator::new(settings.project.clone(), catalog);
    report_validation(&validator, &config).await?;

    let engine = CascadeEngine::new(Some(config.clone()), form.clone()).with_hinter(Arc::new(TracingHinter));
    info!("Loaded {} parent fields from '{}'", engine.map().len(), settings.config_file);

    println!("\n💡 Commands: set <field> [value] | show | options <field> | recascade | reset | validate | quit\n");

    loop {
        print!("cascade> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let mut parts = input.split_whitespace();
        let Some(command) = parts.next() else { continue };

        match command.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "set" => {
                let Some(field) = parts.next() else {
                    println!("usage: set <field> [value]");
                    continue;
                };
                let value = parts.collect::<Vec<_>>().join(" ");
                let value = (!value.is_empty()).then_some(value);
                if let Err(e) = form.set_value(field, value.as_deref()).await {
                    println!("❌ {}", e);
                    continue;
                }
                match engine.on_field_changed(field).await {
                    Ok(outcome) => print_outcome(field, &outcome),
                    Err(e) => println!("❌ Cascade failed: {}", e),
                }
            }
            "show" => {
                for field in form.field_names() {
                    let value = form.value(field).await.unwrap_or_default();
                    println!("  {:<24} {}", field, value);
                }
                if let Some(error) = form.error().await {
                    println!("⚠️  {}", error);
                }
            }
            "options" => match parts.next() {
                Some(field) => match form.get_filtered_allowed_field_values(field).await {
                    Ok(values) => println!("  {}: {:?}", field, values),
                    Err(e) => println!("❌ {}", e),
                },
                None => println!("usage: options <field>"),
            },
            "recascade" => match engine.cascade_all().await {
                Ok(outcomes) => {
                    for (parent, outcome) in &outcomes {
                        print_outcome(parent, outcome);
                    }
                }
                Err(e) => println!("❌ Re-cascade failed: {}", e),
            },
            "reset" => match engine.reset_all_cascades().await {
                Ok(()) => println!("🗑️  All cascade restrictions lifted."),
                Err(e) => println!("❌ Reset failed: {}", e),
            },
            "validate" => report_validation(&validator, &config).await?,
            other => println!("Unknown command '{}'", other),
        }
    }

    println!("\n👋 Goodbye!\n");
    Ok(())
}

async fn report_validation(validator: &ConfigurationValidator, config: &CascadeConfiguration) -> Result<()> {
    match validator.validate(config).await? {
        None => println!("✅ Cascade configuration is valid for project '{}'", validator.project()),
        Some(invalid) => println!("⚠️  Unknown fields in cascade configuration: {}", invalid.join(", ")),
    }
    Ok(())
}

fn print_outcome(field: &str, outcome: &CascadeOutcome) {
    match outcome {
        CascadeOutcome::NotAParent => println!("  '{}' does not cascade", field),
        CascadeOutcome::Applied(options) => {
            for (dependent, values) in options.iter() {
                println!("  {} → {}: {:?}", field, dependent, values);
            }
        }
        CascadeOutcome::Invalid { field: invalid, value, .. } => {
            println!("⚠️  '{}' holds '{}', which '{}' no longer allows", invalid, value, field)
        }
    }
}
