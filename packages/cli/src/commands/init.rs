use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;
use storefront_editor::{Block, BlockType, LayoutDocument};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// File name of the example layout
    #[arg(short, long, default_value = "home.json")]
    pub layout: String,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = Config::default_path(cwd);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!(
        "{}",
        "📝 Initializing storefront project...".bright_blue().bold()
    );

    fs::write(&config_path, serde_json::to_string_pretty(&Config::default())?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let layout_path = cwd.join(&args.layout);
    if !layout_path.exists() || args.force {
        example_layout().save(&layout_path)?;
        println!("  {} Created {}", "✓".green(), args.layout);
    }

    println!();
    println!("{}", "✨ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  storefront inspect {}", args.layout);
    println!("  storefront search {} hero", args.layout);

    Ok(())
}

fn example_layout() -> LayoutDocument {
    let mut doc = LayoutDocument::new(vec![
        Block::new(BlockType::Header, "centered").with_id("header"),
        Block::new(BlockType::Hero, "split")
            .with_id("hero")
            .with_setting("title", "New season")
            .with_setting("cta", "Shop now"),
        Block::new(BlockType::Section, "default")
            .with_id("featured")
            .with_children(vec![
                Block::new(BlockType::Heading, "default")
                    .with_id("featured-title")
                    .with_setting("text", "Featured products"),
                Block::new(BlockType::ProductGrid, "default")
                    .with_id("featured-grid")
                    .with_setting("columns", 4.0),
            ]),
        Block::new(BlockType::Newsletter, "default").with_id("newsletter"),
        Block::new(BlockType::Footer, "default").with_id("footer"),
    ]);
    doc.id = Some("home".to_string());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_config_and_layout() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            layout: "home.json".to_string(),
            force: false,
        };
        init(args, dir.path()).unwrap();

        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config, Config::default());

        let layout = LayoutDocument::load(&dir.path().join("home.json")).unwrap();
        assert_eq!(layout.blocks().len(), 5);
        assert_eq!(layout.blocks()[2].children()[1].order, 1);
    }
}
