//! Hover previews backed by a local graph session.

use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use xiuxian_outline::{
    GraphSession, HoverAnchor, HoverConfig, HoverPhase, HoverPreview, LocalDirectory,
    OutlineConfig, PageContent,
};

fn session() -> Result<(TempDir, Arc<GraphSession<LocalDirectory>>), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    fs::create_dir_all(tmp.path().join("pages/journals"))?;
    fs::write(tmp.path().join("pages/alpha.md"), "- alpha body\n  - nested\n")?;
    fs::write(tmp.path().join("pages/journals/2025_03_04.md"), "- journal body\n")?;
    let session = GraphSession::local("g", tmp.path(), &OutlineConfig::default());
    Ok((tmp, Arc::new(session)))
}

async fn wait(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_preview_shows_resolved_content_after_delay() -> Result<(), Box<dyn std::error::Error>>
{
    let (_tmp, session) = session()?;
    let hover = HoverPreview::new(session, &HoverConfig::default());

    hover.request_preview("2025-03-04", HoverAnchor { x: 10.0, y: 20.0 });
    wait(1000).await;
    assert!(!hover.is_visible());
    wait(600).await;
    assert!(hover.is_visible());
    let PageContent::Blocks(blocks) = hover.content() else {
        return Err("preview content should be loaded".into());
    };
    assert_eq!(blocks[0].text, "journal body");

    hover.request_preview("missing page", HoverAnchor::default());
    wait(1600).await;
    assert_eq!(hover.target().as_deref(), Some("missing page"));
    assert_eq!(hover.content(), PageContent::NotFound);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_switching_targets_before_delay_shows_only_last() -> Result<(), Box<dyn std::error::Error>>
{
    let (_tmp, session) = session()?;
    let hover = HoverPreview::new(session, &HoverConfig::default());

    hover.request_preview("alpha", HoverAnchor::default());
    wait(1000).await;
    hover.request_preview("2025_03_04", HoverAnchor::default());
    wait(1000).await;
    assert_eq!(hover.shown_count(), 0);

    wait(600).await;
    assert_eq!(hover.shown_count(), 1);
    assert_eq!(hover.target().as_deref(), Some("2025_03_04"));

    hover.pointer_left();
    hover.popover_entered();
    hover.popover_activity();
    hover.popover_left();
    wait(2100).await;
    assert_eq!(hover.phase(), HoverPhase::Idle);
    assert_eq!(hover.cache().len(), 2);
    Ok(())
}
