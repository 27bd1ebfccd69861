//! Relgraph CLI
//!
//! Migrates a SQLite object store into a property graph log, prints the
//! migration plan for a model, or inspects a finished graph log.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relgraph::migration::{plan_relations, RelationPlan};
use relgraph::naming::expected_table_name;
use relgraph::{recover, BatchInserter, DomainModel, MigrationConfig, Migrator, SqliteSource};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relgraph", version, about = "Relational object store to property graph migrator")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a migration
    Migrate {
        /// Domain model (YAML)
        #[arg(long)]
        model: Option<PathBuf>,

        /// SQLite database to migrate
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output directory for the graph log
        #[arg(long)]
        output: Option<PathBuf>,

        /// OID of the domain root object
        #[arg(long)]
        root_oid: Option<i64>,

        /// Class catalog table
        #[arg(long)]
        catalog_table: Option<String>,
    },
    /// Show tables and join strategies without reading data
    Plan {
        /// Domain model (YAML)
        #[arg(long)]
        model: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Summarize a graph log
    Inspect {
        /// Directory holding the graph log
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ClassPlan {
    class: String,
    table: Option<String>,
}

#[derive(Serialize)]
struct PlanOutput {
    classes: Vec<ClassPlan>,
    relations: Vec<RelationPlan>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MigrationConfig::from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MigrationConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Migrate {
            model,
            source,
            output,
            root_oid,
            catalog_table,
        } => {
            config.model = model.or(config.model);
            config.source = source.or(config.source);
            config.output = output.or(config.output);
            if let Some(oid) = root_oid {
                config.root_oid = oid;
            }
            if let Some(table) = catalog_table {
                config.catalog_table = table;
            }
            run_migrate(&config)
        }
        Commands::Plan { model, json } => {
            config.model = model.or(config.model);
            run_plan(&config, json)
        }
        Commands::Inspect { output, json } => {
            config.output = output.or(config.output);
            run_inspect(&config, json)
        }
    }
}

fn load_model(config: &MigrationConfig) -> Result<DomainModel> {
    let path = config.model_path()?;
    DomainModel::from_path(path).with_context(|| format!("loading domain model from {}", path.display()))
}

fn run_migrate(config: &MigrationConfig) -> Result<()> {
    let model = load_model(config)?;

    let source_path = config.source_path()?;
    let source = SqliteSource::open(source_path)
        .with_context(|| format!("opening source database {}", source_path.display()))?;

    let output = config.output_path()?;
    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;
    let inserter = BatchInserter::open(output)
        .with_context(|| format!("opening graph log in {}", output.display()))?;

    let outcome = Migrator::with_options(model, source, inserter, config.options())
        .migrate()
        .context("migration failed")?;

    let report = &outcome.report;
    println!("Catalog nodes: {}", report.catalog_nodes);
    for (class, count) in &report.objects {
        println!("  {:<40} {:>10} objects", class, count);
    }
    for (relation, count) in &report.relations {
        println!("  {:<40} {:>10} edges", relation, count);
    }
    println!(
        "Total: {} objects, {} edges; store holds {} nodes and {} edges",
        report.total_objects(),
        report.total_edges(),
        outcome.store.node_count(),
        outcome.store.edge_count()
    );
    Ok(())
}

fn run_plan(config: &MigrationConfig, json: bool) -> Result<()> {
    let model = load_model(config)?;
    let classes = model
        .domain_classes()
        .map(|class| ClassPlan {
            class: class.full_name().to_string(),
            table: expected_table_name(class, &model),
        })
        .collect();
    let plan = PlanOutput {
        classes,
        relations: plan_relations(&model)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Classes:");
    for class in &plan.classes {
        match &class.table {
            Some(table) => println!("  {:<40} {}", class.class, table),
            None => println!("  {:<40} (skipped: superclass outside the model)", class.class),
        }
    }
    println!("Relations:");
    for relation in &plan.relations {
        println!(
            "  {:<24} {:<12} {:<24} {} -> {}",
            relation.relation, relation.shape, relation.table, relation.source_column, relation.target_column
        );
    }
    Ok(())
}

fn run_inspect(config: &MigrationConfig, json: bool) -> Result<()> {
    let output = config.output_path()?;
    let store = recover(output).with_context(|| format!("replaying graph log in {}", output.display()))?;
    let stats = store.statistics();
    let violations = store.constraint_violations();

    if json {
        let violations: Vec<_> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "constraint": v.constraint.to_string(),
                    "value": v.value.to_string(),
                    "nodes": v.nodes.iter().map(|n| n.as_u64()).collect::<Vec<_>>(),
                })
            })
            .collect();
        let doc = serde_json::json!({ "statistics": stats, "violations": violations });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Nodes: {}", stats.node_count);
    let mut labels: Vec<_> = stats.label_counts.iter().collect();
    labels.sort();
    for (label, count) in labels {
        println!("  :{:<40} {:>10}", label, count);
    }
    println!("Edges: {}", stats.edge_count);
    let mut types: Vec<_> = stats.edge_type_counts.iter().collect();
    types.sort();
    for (edge_type, count) in types {
        println!("  [{:<39}] {:>10}", edge_type, count);
    }
    if violations.is_empty() {
        println!("No constraint violations");
    } else {
        for v in &violations {
            println!("Violation of {}: {} on nodes {:?}", v.constraint, v.value, v.nodes);
        }
    }
    Ok(())
}
