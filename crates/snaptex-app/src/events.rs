use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::state::AppState;

pub mod run_action;

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A registered shortcut fired for this action name.
    ActionFired(String),
}

/// Pipeline event loop: actions arrive from the native event loop's dispatch
/// and are processed one at a time. Failures are logged, never fatal.
pub async fn event_loop(
    state: Arc<AppState>,
    events: kanal::Receiver<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("pipeline stopping");
                break;
            }
            event = events.as_async().recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(_) => break,
                };
                match event {
                    AppEvent::ActionFired(action) => {
                        tracing::debug!("action fired: {}", action);
                        if let Err(e) = run_action::handle_action(state.clone(), &action).await {
                            tracing::error!("pipeline for '{}' failed: {:#}", action, e);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
