use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use storefront_editor::{Block, LayoutDocument};

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Layout JSON file
    pub layout: PathBuf,

    /// Print the normalized layout as JSON instead of a tree
    #[arg(long)]
    pub json: bool,
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    let doc = LayoutDocument::load(&args.layout)
        .with_context(|| format!("Failed to load {}", args.layout.display()))?;

    if args.json {
        println!("{}", doc.to_json()?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        "📄".bright_blue(),
        doc.id.as_deref().unwrap_or("layout").bold(),
        format!(
            "(version {}, {} columns, row {}px, gap {}px)",
            doc.version, doc.layout.columns, doc.layout.row_height, doc.layout.gap
        )
        .dimmed()
    );
    for line in tree_lines(doc.blocks(), 0) {
        println!("{}", line);
    }
    Ok(())
}

/// One indented line per block, children under their container
pub fn tree_lines(blocks: &[Block], depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for block in blocks {
        let mut flags = Vec::new();
        if !block.visible {
            flags.push("hidden".to_string());
        }
        if block.locked {
            flags.push("locked".to_string());
        }
        if let Some(group) = &block.group_id {
            flags.push(format!("group {}", group));
        }
        if let Some(class) = &block.custom_class {
            flags.push(format!(".{}", class));
        }

        let mut line = format!(
            "{}{} {} {}",
            "  ".repeat(depth + 1),
            block.block_type.to_string().cyan(),
            format!("[{}]", block.variant).dimmed(),
            format!("#{}", block.id)
        );
        if !flags.is_empty() {
            line.push_str(&format!(" ({})", flags.join(", ")).yellow().to_string());
        }
        lines.push(line);
        lines.extend(tree_lines(block.children(), depth + 1));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_editor::BlockType;

    #[test]
    fn test_tree_lines_nest_children() {
        colored::control::set_override(false);
        let mut hidden = Block::new(BlockType::Text, "muted").with_id("t");
        hidden.visible = false;
        let blocks = vec![Block::new(BlockType::Section, "default")
            .with_id("s")
            .with_children(vec![hidden])];

        let lines = tree_lines(&blocks, 0);
        assert_eq!(lines, vec!["  section [default] #s", "    text [muted] #t (hidden)"]);
    }
}
