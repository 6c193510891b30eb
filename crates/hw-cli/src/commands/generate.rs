use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use tokio::sync::mpsc;

use hw_gen::{
    GenerationConfig, GenerationOutcome, GenerationSession, GreedyOracle, ProgressEvent, Stage,
};

/// Flags for `hw generate`.
pub struct Options {
    pub max_tiles: usize,
    pub max_iterations: usize,
    pub seed: u64,
    pub plan: String,
    pub diagnostics: bool,
    pub json: bool,
    pub verbose: bool,
    pub journal: bool,
}

pub fn run(catalog_path: &Path, opts: Options) -> Result<(), String> {
    let catalog = Arc::new(super::load_catalog(catalog_path)?);
    let config = GenerationConfig::default()
        .with_max_tiles(opts.max_tiles)
        .with_max_iterations(opts.max_iterations)
        .with_diagnostics(opts.diagnostics)
        .with_seed(opts.seed);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;

    runtime.block_on(async {
        let oracle = GreedyOracle::new(Arc::clone(&catalog), config.seed);
        let mut session = GenerationSession::new(Arc::clone(&catalog), oracle, config)
            .with_plan(opts.plan.clone());

        let printer = if opts.verbose {
            let (tx, rx) = mpsc::unbounded_channel();
            session = session.with_progress_sink(tx);
            Some(tokio::spawn(print_events(rx)))
        } else {
            None
        };

        let outcome = session.run().await;
        let stop = session
            .stop_reason()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        let iterations = session.iterations();
        let pruned = session.journal().total_pruned();
        let journal = session.journal().export_markdown();
        drop(session);

        if let Some(printer) = printer {
            printer
                .await
                .map_err(|e| format!("progress printer failed: {e}"))?;
        }

        let (world, validation) = match outcome {
            GenerationOutcome::Success { world, validation } => (world, validation),
            GenerationOutcome::Error(message) => return Err(message),
            GenerationOutcome::Cancelled => return Err("generation cancelled".to_string()),
        };

        if opts.json {
            let json = serde_json::to_string_pretty(&world.snapshot())
                .map_err(|e| format!("failed to serialize world: {e}"))?;
            println!("{json}");
            return Ok(());
        }

        println!(
            "  {} '{}' {}",
            "Generated".bold(),
            catalog.id(),
            format!("(seed={}, max tiles={})", opts.seed, opts.max_tiles).dimmed()
        );
        println!(
            "  {} tiles, {} addons after {iterations} rounds ({stop})",
            world.tile_count(),
            world.addon_count()
        );
        println!();

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Edges checked", "Valid", "Invalid", "Pruned placements"]);
        table.add_row(vec![
            validation.checked.to_string(),
            validation.valid.to_string(),
            validation.invalid.to_string(),
            pruned.to_string(),
        ]);
        println!("{table}");
        println!();

        let mut usage: BTreeMap<&str, usize> = BTreeMap::new();
        for tile in world.tiles() {
            *usage.entry(tile.tile.as_str()).or_default() += 1;
        }
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Tile", "Placed"]);
        for (tile, count) in usage {
            table.add_row(vec![tile.to_string(), count.to_string()]);
        }
        println!("{table}");
        println!();

        for bad in &validation.invalid_edges {
            println!("  {} {bad}", "WARN".yellow().bold());
        }

        if opts.journal {
            println!("{journal}");
        }
        Ok(())
    })
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        let stage = event.stage.to_string();
        let label = format!("[{stage:<12}]");
        let label = match event.stage {
            Stage::Complete => label.green(),
            Stage::Error => label.red(),
            Stage::Cancelled => label.yellow(),
            _ => label.cyan(),
        };
        eprintln!(
            "  {label} {} {}",
            event.message,
            format!("(tiles: {}, addons: {})", event.tile_count, event.addon_count).dimmed()
        );
    }
}
