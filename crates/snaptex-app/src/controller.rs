use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::{self, AppEvent};
use crate::state::AppState;

/// Centralized channel management.
pub struct ChannelSet {
    /// Fired shortcut actions, sync side written from the native event loop.
    pub actions: (kanal::Sender<AppEvent>, kanal::Receiver<AppEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            actions: kanal::bounded(64),
        }
    }
}

/// Task spawning and lifecycle for the background pipeline.
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            channels: ChannelSet::new(),
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn actions_sender(&self) -> kanal::Sender<AppEvent> {
        self.channels.actions.0.clone()
    }

    pub fn spawn_tasks(&self, runtime: &tokio::runtime::Runtime) -> JoinSet<anyhow::Result<()>> {
        let mut tasks = JoinSet::new();

        tasks.spawn_on(
            events::event_loop(
                self.state.clone(),
                self.channels.actions.1.clone(),
                self.cancel_token.child_token(),
            ),
            runtime.handle(),
        );

        tasks
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
