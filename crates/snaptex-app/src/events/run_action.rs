use std::sync::Arc;

use anyhow::{Context, Result};

use crate::state::AppState;

/// One fired action: capture the configured region (or the primary screen),
/// send it to the model with the action's prompt, put the cleaned text on
/// the clipboard and record the entry.
pub async fn handle_action(state: Arc<AppState>, action: &str) -> Result<()> {
    let (prompt, region) = {
        let config = state.config.read().await;
        (
            config.prompt_for(action).map(str::to_string),
            config.capture,
        )
    };
    let Some(prompt) = prompt else {
        tracing::warn!("no prompt configured for action '{}'", action);
        return Ok(());
    };

    let png = tokio::task::spawn_blocking(move || match region {
        Some(region) => snaptex_capture::capture_screen_region(region),
        None => snaptex_capture::capture_primary_screen(),
    })
    .await
    .context("capture task failed")??;

    let raw = state
        .client
        .generate_from_image(&prompt, &png)
        .await
        .context("model request failed")?;
    let text = snaptex_api::clean_response(&raw);
    tracing::debug!("model response: {} chars", text.len());

    snaptex_io::clipboard::copy_text(&text).context("clipboard update failed")?;
    tracing::info!("response copied to clipboard");

    if let Err(e) = state.history.save_entry(&png, &prompt, &text, action).await {
        tracing::warn!("failed to record history entry: {:#}", e);
    }
    Ok(())
}
