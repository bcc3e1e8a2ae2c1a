use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use storefront_editor::{mutations, search_blocks, LayoutDocument};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Layout JSON file
    pub layout: PathBuf,

    /// Text to match against block type, variant and settings
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

pub fn search(args: SearchArgs) -> Result<()> {
    let doc = LayoutDocument::load(&args.layout)
        .with_context(|| format!("Failed to load {}", args.layout.display()))?;

    let hits = search_blocks(doc.blocks(), &args.query);
    if hits.is_empty() {
        println!("{} No blocks match {:?}", "⚠️".yellow(), args.query);
        return Ok(());
    }

    println!(
        "{} {} matches for {:?}",
        "🔍".bright_blue(),
        hits.len(),
        args.query
    );
    for hit in hits.iter().take(args.limit) {
        let Some(block) = mutations::find(doc.blocks(), &hit.id) else {
            continue;
        };
        println!(
            "  {:>7.1}  {} {} {}",
            hit.score,
            block.block_type.to_string().cyan(),
            format!("[{}]", block.variant).dimmed(),
            format!("#{}", block.id)
        );
    }
    if hits.len() > args.limit {
        println!("  {}", format!("… {} more", hits.len() - args.limit).dimmed());
    }
    Ok(())
}
