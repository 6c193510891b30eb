use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use hw_core::Catalog;
use hw_engine::{validate_edges, validate_structure};

pub fn run(catalog_path: &Path, world_path: Option<&Path>) -> Result<(), String> {
    let catalog = super::load_catalog(catalog_path)?;

    println!(
        "  {} '{}' {}",
        "Catalog".bold(),
        catalog.id(),
        format!(
            "({} edge types, {} tiles, {} addons)",
            catalog.edge_model().len(),
            catalog.tiles().len(),
            catalog.addons().len()
        )
        .dimmed()
    );
    println!();
    print_edge_types(&catalog);
    print_tiles(&catalog);
    if !catalog.addons().is_empty() {
        print_addons(&catalog);
    }

    let Some(world_path) = world_path else {
        println!("  All checks passed for '{}'.", catalog.id());
        return Ok(());
    };

    let world = super::load_world(world_path)?;
    let issues = validate_structure(&world, &catalog);
    let edges = validate_edges(&world, &catalog);

    println!(
        "  {} {} tiles, {} addons; {} edges checked, {} invalid",
        "World".bold(),
        world.tile_count(),
        world.addon_count(),
        edges.checked,
        edges.invalid
    );
    for issue in &issues {
        if issue.is_error {
            eprintln!("  {}", issue.to_string().red());
        } else {
            eprintln!("  {}", issue.to_string().yellow());
        }
    }
    for bad in &edges.invalid_edges {
        eprintln!("  {} {bad}", "invalid edge:".red());
    }

    let errors = issues.iter().filter(|i| i.is_error).count() + edges.invalid;
    if errors > 0 {
        return Err(format!("world check failed with {errors} error(s)"));
    }
    println!("  All checks passed for '{}'.", catalog.id());
    Ok(())
}

fn print_edge_types(catalog: &Catalog) {
    let model = catalog.edge_model();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Edge type", "Compatible with"]);
    for id in model.ids() {
        let partners: Vec<&str> = model
            .ids()
            .iter()
            .filter(|other| model.are_compatible(id, other))
            .map(|other| other.as_str())
            .collect();
        table.add_row(vec![id.to_string(), partners.join(", ")]);
    }
    println!("{table}");
    println!();
}

fn print_tiles(catalog: &Catalog) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Tile", "Edges (0-5)", "Tags"]);
    for tile in catalog.tiles() {
        let edges: Vec<&str> = tile.edges.iter().map(|e| e.as_str()).collect();
        let tags: Vec<&str> = tile.tags.iter().map(String::as_str).collect();
        table.add_row(vec![tile.id.to_string(), edges.join(" "), tags.join(", ")]);
    }
    println!("{table}");
    println!();
}

fn print_addons(catalog: &Catalog) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Addon", "Requires any tag", "Fits tiles"]);
    for addon in catalog.addons() {
        let tags: Vec<&str> = addon.required_tags.iter().map(String::as_str).collect();
        let fits: Vec<&str> = catalog
            .tiles()
            .iter()
            .filter(|t| addon.fits(t))
            .map(|t| t.id.as_str())
            .collect();
        table.add_row(vec![addon.id.to_string(), tags.join(", "), fits.join(", ")]);
    }
    println!("{table}");
    println!();
}
