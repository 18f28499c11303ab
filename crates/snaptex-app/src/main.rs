use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use snaptex_config::{Config, DEFAULT_CONFIG_FILE};
use snaptex_history::HistoryStore;
use snaptex_hotkeys::{Dispatch, ShortcutManager};

mod controller;
mod events;
mod logging;
mod pump;
mod state;

use self::controller::AppController;
use self::events::AppEvent;
use self::pump::EventPump;
use self::state::AppState;

fn main() -> anyhow::Result<()> {
    logging::init();

    let config = match Config::load(Path::new(DEFAULT_CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            // Covers the regenerated-defaults case: the operator has to edit
            // the file before anything can work.
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let history = runtime.block_on(HistoryStore::open(
        &config.history.db_path,
        &config.history.screenshots_dir,
    ))?;
    let state = Arc::new(AppState::new(config, history));

    let controller = AppController::new(state.clone());
    let cancel = controller.cancel_token();

    {
        let cancel = cancel.clone();
        runtime.spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl+c: {e}");
                return;
            }
            tracing::info!("shutdown requested");
            cancel.cancel();
        });
    }

    let _tasks = controller.spawn_tasks(&runtime);

    // Dispatch runs on the native event loop thread; it must not block, so
    // fired actions go through a bounded non-blocking send.
    let actions = controller.actions_sender();
    let dispatch: Dispatch = Arc::new(move |action: &str| {
        match actions.try_send(AppEvent::ActionFired(action.to_string())) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("action queue full; dropping '{}'", action),
            Err(e) => tracing::warn!("action channel closed: {e}"),
        }
    });

    let table = runtime.block_on(async { state.config.read().await.shortcuts.clone() });
    let pump = Arc::new(EventPump::new());
    let mut shortcuts = match ShortcutManager::initialize(pump.clone(), &table, dispatch) {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!("global shortcuts unavailable: {e}");
            std::process::exit(1);
        }
    };

    // The main thread becomes the native event loop until shutdown.
    pump.run(&cancel);

    shortcuts.cleanup();
    controller.shutdown();
    runtime.shutdown_timeout(Duration::from_secs(2));
    Ok(())
}
