//! CLI command implementations.

use crate::config::{Config, CONFIG_DIR};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lineage_core::{CorrectionAction, CorrectionDetails, CorrectionLog, CorrectionRecord};
use lineage_graph::{
    load_dataset, DatasetLoad, LineageDirection, LineageGraph, LineageNode, SearchKind,
    SnapshotStore,
};
use lineage_server::{LineageServer, ServerConfig};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Initialize Lineage in a directory.
pub fn init(root: &Path) -> Result<()> {
    let config_path = Config::config_path(root);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let config = Config::default();
    config.write(root)?;
    fs::create_dir_all(root.join(&config.data_dir))?;

    println!("{} Initialized Lineage in {}", "✓".green(), root.display());
    println!(
        "  Place the dataset at {}",
        root.join(&config.data_dir)
            .join(&config.dataset)
            .display()
            .to_string()
            .cyan()
    );
    println!("  Then run {} to build the graph", "lineage index".cyan());

    Ok(())
}

/// Reads the dataset behind a spinner.
fn build_from_dataset(config: &Config) -> Result<DatasetLoad> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Reading {}...", config.dataset.display()));

    let load = load_dataset(&config.dataset);
    spinner.finish_and_clear();

    Ok(load?)
}

fn print_load_summary(load: &DatasetLoad, elapsed: Duration) {
    println!(
        "{} Loaded {} rows: {} people, {} dissertations, {} advisor links in {}ms",
        "✓".green(),
        load.rows_read.to_string().cyan(),
        load.report.people.to_string().cyan(),
        load.report.dissertations.to_string().cyan(),
        load.report.edges.to_string().cyan(),
        elapsed.as_millis()
    );

    if load.report.duplicate_dissertations > 0 || load.report.dangling_advisors > 0 {
        println!(
            "  {} duplicate dissertations, {} unresolved advisors",
            load.report.duplicate_dissertations, load.report.dangling_advisors
        );
    }

    if !load.skipped.is_empty() {
        println!("\n{} {} rows skipped:", "⚠".yellow(), load.skipped.len());
        for skipped in load.skipped.iter().take(5) {
            println!("  {} - {}", format!("row {}", skipped.row).red(), skipped.error);
        }
        if load.skipped.len() > 5 {
            println!("  ... and {} more", load.skipped.len() - 5);
        }
    }
}

/// Build the graph from the dataset and store a snapshot.
pub fn index(config: &Config, force: bool) -> Result<()> {
    let store = SnapshotStore::open(&config.store)?;

    if store.has_graph()? && !force && !config.force_reinit {
        println!("{} Snapshot already built", "✓".green());
        println!("  Run {} to rebuild", "lineage index --force".cyan());
        return Ok(());
    }

    println!("{}", "Indexing dataset...".cyan());
    let start = Instant::now();
    let load = build_from_dataset(config)?;
    store.save_graph(&load.graph)?;

    print_load_summary(&load, start.elapsed());
    println!("{} Snapshot saved to {}", "✓".green(), config.store.display());

    Ok(())
}

/// Loads the stored snapshot, building one from the dataset if missing.
fn open_graph(config: &Config, store: &SnapshotStore) -> Result<LineageGraph> {
    if !config.force_reinit {
        if let Some(graph) = store.load_graph()? {
            return Ok(graph);
        }
    }

    info!("No snapshot available; building from {}", config.dataset.display());
    let load = build_from_dataset(config)?;
    store.save_graph(&load.graph)?;
    Ok(load.graph)
}

/// Search people by name or institution.
pub fn search(config: &Config, query: &str, by_institution: bool, limit: usize) -> Result<()> {
    let store = SnapshotStore::open(&config.store)?;
    let graph = open_graph(config, &store)?;

    let kind = if by_institution {
        SearchKind::Institution
    } else {
        SearchKind::Name
    };
    let results = graph.search(query, kind);

    if results.people.is_empty() {
        println!("No matches found for \"{}\"", query);
        return Ok(());
    }

    if let Some(institution) = &results.institution {
        println!("{}", institution.name.cyan().bold());
    }
    println!("Found {} people:\n", results.people.len());

    for person in results.people.iter().take(limit) {
        let places: Vec<&str> = person.affiliations.iter().map(|a| a.name.as_str()).collect();
        println!(
            "  {} {} {}",
            person.id.yellow(),
            person.name.cyan(),
            person.years.as_deref().unwrap_or_default().dimmed()
        );
        if !places.is_empty() {
            println!("    {}", places.join(", ").dimmed());
        }
    }

    if results.people.len() > limit {
        println!("  ... and {} more", results.people.len() - limit);
    }

    Ok(())
}

/// Show a person's dissertations, advisors and students.
pub fn person(config: &Config, id: &str, json_output: bool) -> Result<()> {
    let store = SnapshotStore::open(&config.store)?;
    let graph = open_graph(config, &store)?;
    let detail = graph.person_detail(id)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let person = &detail.person;
    println!(
        "{} {}",
        person.name.cyan().bold(),
        person.years.as_deref().unwrap_or_default().dimmed()
    );
    println!("  {} {}", "Id:".dimmed(), person.id);

    for dissertation in &detail.dissertations {
        println!();
        println!(
            "  {} {}",
            "Dissertation:".dimmed(),
            dissertation.title.as_deref().unwrap_or("(untitled)")
        );
        let place: Vec<&str> = [
            dissertation.institution.as_deref(),
            dissertation.department.as_deref(),
            dissertation.year.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !place.is_empty() {
            println!("    {}", place.join(", "));
        }
        for advisor in &dissertation.advisors {
            println!(
                "    {} {} ({})",
                format!("{}:", advisor.role).dimmed(),
                advisor.name.cyan(),
                advisor.id
            );
        }
    }

    if !detail.students.is_empty() {
        println!();
        println!("  {} {}", "Students:".dimmed(), detail.students.len());
        for student in &detail.students {
            let year = student.year.as_deref().unwrap_or("?");
            println!(
                "    {} {} ({}) {}",
                year.dimmed(),
                student.name.cyan(),
                student.id,
                student.role.dimmed()
            );
        }
    }

    println!();
    println!(
        "  {} {} descendants over {} generations",
        "Lineage:".dimmed(),
        detail.stats.total_descendants,
        detail.stats.max_generation_depth
    );

    Ok(())
}

fn print_tree(node: &LineageNode, prefix: &str, last: bool) {
    let branch = if last { "└── " } else { "├── " };
    let roles: Vec<String> = node.roles.iter().map(|r| r.to_string()).collect();
    println!(
        "{}{}{} ({}) {}",
        prefix,
        branch,
        node.name.cyan(),
        node.id,
        roles.join(", ").dimmed()
    );

    let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
    for (i, child) in node.children.iter().enumerate() {
        print_tree(child, &child_prefix, i + 1 == node.children.len());
    }
}

/// Show a person's descendant or ancestor tree.
pub fn lineage(
    config: &Config,
    id: &str,
    ancestors: bool,
    depth: Option<usize>,
    json_output: bool,
) -> Result<()> {
    let store = SnapshotStore::open(&config.store)?;
    let graph = open_graph(config, &store)?;

    let direction = if ancestors {
        LineageDirection::Ancestors
    } else {
        LineageDirection::Descendants
    };
    let lineage = graph.lineage(id, direction, depth.unwrap_or(config.max_depth))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&lineage)?);
        return Ok(());
    }

    let tree = &lineage.tree;
    println!(
        "{} of {} (depth {})",
        direction.to_string().yellow().bold(),
        tree.root.name.cyan(),
        tree.max_depth
    );

    if tree.is_empty() {
        println!("  No {} recorded", direction);
        return Ok(());
    }

    println!("{} ({})", tree.root.name.cyan().bold(), tree.root.id);
    for (i, child) in tree.root.children.iter().enumerate() {
        print_tree(child, "", i + 1 == tree.root.children.len());
    }

    println!();
    println!("{} {} people shown", "Total:".dimmed(), tree.node_count);
    if tree.truncated {
        println!("{} Tree truncated; narrow the depth", "⚠".yellow());
    }

    Ok(())
}

/// Show descendant statistics for a person.
pub fn stats(config: &Config, id: &str) -> Result<()> {
    let store = SnapshotStore::open(&config.store)?;
    let graph = open_graph(config, &store)?;

    let person = graph.get_person(id)?;
    let stats = graph.stats(id)?;

    println!("{}", person.name.cyan().bold());
    println!("  {} {}", "Direct students:".dimmed(), stats.direct_students);
    println!("  {} {}", "Descendants:".dimmed(), stats.total_descendants);
    println!("  {} {}", "Generations:".dimmed(), stats.max_generation_depth);

    Ok(())
}

/// Record a correction for later review.
pub fn correct(
    config: &Config,
    submitter: String,
    record_id: Option<String>,
    details: CorrectionDetails,
) -> Result<()> {
    let log = CorrectionLog::new(&config.corrections_log);

    let action = if record_id.is_some() {
        CorrectionAction::Edit
    } else {
        CorrectionAction::AddNew
    };
    let entry = log.append(CorrectionRecord {
        submitter,
        action,
        record_id,
        details,
    })?;

    println!(
        "{} Recorded {} for {}",
        "✓".green(),
        entry.action.as_str(),
        entry.record_id.cyan()
    );
    println!("  Logged to {}", log.path().display());

    Ok(())
}

/// Show index status and statistics.
pub fn status(root: &Path) -> Result<()> {
    if !root.join(CONFIG_DIR).exists() {
        println!("{} Lineage not initialized in this directory", "✗".red());
        println!("  Run {} to initialize", "lineage init".cyan());
        return Ok(());
    }

    let config = Config::load(root)?;
    let store = SnapshotStore::open(&config.store)?;

    println!("{}", "Lineage Status".cyan().bold());
    println!();
    println!("  {} {}", "Dataset:".dimmed(), config.dataset.display());

    match store.load_graph()? {
        Some(graph) => {
            let summary = graph.summary();
            println!("  {} {}", "People:".dimmed(), summary.people);
            println!("  {} {}", "Dissertations:".dimmed(), summary.dissertations);
            println!("  {} {}", "Institutions:".dimmed(), summary.institutions);
            println!("  {} {}", "Advisor links:".dimmed(), summary.edges);
        }
        None => {
            println!("  {} not built", "Snapshot:".dimmed());
            println!("  Run {} to build it", "lineage index".cyan());
        }
    }

    let corrections = CorrectionLog::new(&config.corrections_log).entries()?;
    println!("  {} {}", "Corrections:".dimmed(), corrections.len());

    Ok(())
}

/// Start the Lineage server.
pub async fn serve(config: &Config, port: Option<u16>, headless: bool) -> Result<()> {
    let bind_addr = if headless { "0.0.0.0" } else { "127.0.0.1" };
    let port = port.unwrap_or(config.port);

    if headless {
        println!("{}", "Starting Lineage server in headless mode...".cyan());
    } else {
        println!("{}", "Starting Lineage server...".cyan());
    }

    let store = SnapshotStore::open(&config.store)?;
    let graph = open_graph(config, &store)?;
    drop(store);
    let summary = graph.summary();
    println!(
        "{} Loaded {} people ({} advisor links)",
        "✓".green(),
        summary.people,
        summary.edges
    );

    let addr = format!("{}:{}", bind_addr, port).parse()?;
    let server_config = ServerConfig {
        addr,
        dataset: Some(config.dataset.clone()),
        corrections_log: config.corrections_log.clone(),
        store: Some(config.store.clone()),
    };
    let server = LineageServer::new(graph, server_config);

    println!("{} Listening on ws://{}:{}", "✓".green(), bind_addr, port);
    if headless {
        println!("  Headless mode: accepting connections from any host");
    }
    println!("  Press {} to stop", "Ctrl+C".cyan());

    server.run().await.map_err(|e| e.to_string())?;

    Ok(())
}
