use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use storefront_editor::{
    parse_script, AutosaveScheduler, AutosaveStatus, Editor, LayoutDocument, SaveError,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Layout JSON file to edit
    pub layout: PathBuf,

    /// JSON array of editor commands
    pub script: PathBuf,

    /// Where autosave writes (defaults to the layout file itself)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Run the script without saving anything
    #[arg(long)]
    pub dry_run: bool,
}

/// What a replay did, for the summary and tests
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub applied: usize,
    /// Applied commands that edit the document (not selection or focus)
    pub edits: usize,
    pub rejected: Vec<usize>,
    pub blocks: usize,
    pub undo_depth: usize,
    pub saves: u64,
    pub status: AutosaveStatus,
    pub dirty: bool,
    pub error: Option<String>,
}

pub async fn replay(args: ReplayArgs, config: &Config) -> Result<()> {
    println!("{}", "▶️  Replaying editor script...".bright_blue().bold());

    let report = run(&args, config).await?;

    for index in &report.rejected {
        println!("  {} command #{} had no effect", "✗".yellow(), index);
    }
    println!();
    println!(
        "  {} applied ({} edits), {} rejected, {} blocks, {} undo levels",
        report.applied,
        report.edits,
        report.rejected.len(),
        report.blocks,
        report.undo_depth
    );

    if let Some(error) = &report.error {
        return Err(anyhow!("Autosave failed: {}", error));
    }
    if args.dry_run {
        println!("{} Dry run, nothing saved", "✅".green());
    } else if report.dirty {
        println!("{} Unsaved changes remain", "⚠️".yellow());
    } else {
        let out = args.out.as_ref().unwrap_or(&args.layout);
        println!(
            "{} Saved {} time(s) → {}",
            "✅".green(),
            report.saves,
            out.display()
        );
    }
    Ok(())
}

/// Replay the script through an editor wired to a real autosave scheduler
pub async fn run(args: &ReplayArgs, config: &Config) -> Result<ReplayReport> {
    let base = LayoutDocument::load(&args.layout)
        .with_context(|| format!("Failed to load {}", args.layout.display()))?;
    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read {}", args.script.display()))?;
    let commands = parse_script(&source)
        .with_context(|| format!("Invalid script {}", args.script.display()))?;

    let out = args.out.clone().unwrap_or_else(|| args.layout.clone());
    // Only guard against concurrent writers when overwriting the source
    let check_fresh = args.out.is_none();

    let mut editor = Editor::from_layout(&base, &config.editor);
    let shared = Arc::new(Mutex::new(base));

    let mut autosave_config = config.editor.autosave.clone();
    if args.dry_run {
        autosave_config.enabled = false;
    }
    let scheduler = {
        let shared = Arc::clone(&shared);
        AutosaveScheduler::new(autosave_config, move || {
            let shared = Arc::clone(&shared);
            let out = out.clone();
            async move { persist(&shared, &out, check_fresh) }
        })
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    scheduler.set_observer(move |snapshot| {
        let _ = tx.send(snapshot.clone());
    });

    let mut applied = 0;
    let mut edits = 0;
    let mut rejected = Vec::new();
    for (index, command) in commands.into_iter().enumerate() {
        let revision = editor.revision();
        let is_edit = command.is_mutation();
        if editor.execute(command) {
            applied += 1;
            if is_edit {
                edits += 1;
            }
        } else {
            rejected.push(index);
        }

        if editor.revision() != revision {
            publish(&shared, &editor);
            scheduler.notify_dirty(editor.revision());
        }
        while let Ok(snapshot) = rx.try_recv() {
            editor.apply_autosave_snapshot(&snapshot);
        }
        tokio::task::yield_now().await;
    }

    if !args.dry_run {
        scheduler.flush().await;
    }
    while let Ok(snapshot) = rx.try_recv() {
        editor.apply_autosave_snapshot(&snapshot);
    }
    scheduler.shutdown();

    info!(applied, edits, rejected = rejected.len(), "Replay finished");
    Ok(ReplayReport {
        applied,
        edits,
        rejected,
        blocks: editor.flattened_ids().len(),
        undo_depth: editor.undo_depth(),
        saves: scheduler.save_count(),
        status: editor.autosave_status(),
        dirty: editor.is_dirty(),
        error: editor.autosave_error().map(str::to_string),
    })
}

/// Hand the current forest to the save side, keeping its version bookkeeping
fn publish(shared: &Mutex<LayoutDocument>, editor: &Editor) {
    let mut doc = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    doc.state.blocks = editor.blocks().to_vec();
}

fn persist(shared: &Mutex<LayoutDocument>, out: &Path, check_fresh: bool) -> Result<(), SaveError> {
    let mut doc = shared
        .lock()
        .map_err(|_| SaveError::new("layout lock poisoned"))?;

    if check_fresh && out.exists() {
        LayoutDocument::load(out)?.ensure_fresh(doc.version)?;
    }

    let mut next = doc.clone();
    next.next_version();
    next.save(out)?;
    debug!(path = %out.display(), version = next.version, "Layout written");

    doc.version = next.version;
    doc.updated_at = next.updated_at;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_editor::{Block, BlockType};

    fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let layout = dir.join("home.json");
        let mut doc = LayoutDocument::new(vec![
            Block::new(BlockType::Hero, "split").with_id("hero"),
            Block::new(BlockType::Text, "default").with_id("intro"),
        ]);
        doc.version = 4;
        doc.save(&layout).unwrap();

        let script = dir.join("script.json");
        fs::write(
            &script,
            r#"[
                { "op": "moveBlock", "from": 0, "to": 1 },
                { "op": "toggleBlockVisibility", "id": "missing" },
                { "op": "addBlockByType", "type": "footer" },
                { "op": "selectAll" }
            ]"#,
        )
        .unwrap();
        (layout, script)
    }

    #[tokio::test]
    async fn test_replay_saves_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, script) = fixture(dir.path());
        let args = ReplayArgs {
            layout: layout.clone(),
            script,
            out: None,
            dry_run: false,
        };

        let report = run(&args, &Config::default()).await.unwrap();
        assert_eq!(report.applied, 3);
        assert_eq!(report.edits, 2);
        assert_eq!(report.rejected, vec![1]);
        assert_eq!(report.blocks, 3);
        assert_eq!(report.saves, 1);
        assert!(!report.dirty);
        assert_eq!(report.status, AutosaveStatus::Idle);

        let saved = LayoutDocument::load(&layout).unwrap();
        assert_eq!(saved.version, 5);
        assert_eq!(saved.blocks()[0].id.as_str(), "intro");
        assert_eq!(saved.blocks()[2].block_type, BlockType::Footer);
    }

    #[test]
    fn test_persist_detects_concurrent_writer() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, _) = fixture(dir.path());
        let shared = Mutex::new(LayoutDocument::load(&layout).unwrap());

        // Someone else saved version 5 in the meantime
        let mut other = LayoutDocument::load(&layout).unwrap();
        other.next_version();
        other.save(&layout).unwrap();

        assert!(persist(&shared, &layout, true).is_err());
        assert_eq!(LayoutDocument::load(&layout).unwrap().version, 5);

        // Writing elsewhere skips the check
        let out = dir.path().join("copy.json");
        persist(&shared, &out, false).unwrap();
        assert_eq!(LayoutDocument::load(&out).unwrap().version, 5);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (layout, script) = fixture(dir.path());
        let out = dir.path().join("out.json");
        let args = ReplayArgs {
            layout,
            script,
            out: Some(out.clone()),
            dry_run: true,
        };

        let report = run(&args, &Config::default()).await.unwrap();
        assert_eq!(report.saves, 0);
        assert!(report.dirty);
        assert!(!out.exists());
    }
}
