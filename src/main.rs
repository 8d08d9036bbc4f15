use std::sync::Arc;

use color_eyre::eyre::Result;
use dotenv::dotenv;
use planner_core::clock::SystemClock;
use planner_core::config::PlannerConfig;
use planner_core::notification::{LogNotifier, Notifier};
use planner_core::state::PlanningState;
use planner_store::JsonScheduleStore;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = PlannerConfig::from_env()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting planner with schedules in {}", config.data_dir.display());

    let store = JsonScheduleStore::open(&config.data_dir)?;
    let mut state = PlanningState::load(Box::new(store), Arc::new(SystemClock))?;

    info!(
        "Showing {} ({} to {})",
        state.selected_month_label(),
        state.visible_window_start(),
        state.visible_window_end()
    );
    for schedule in state.schedules() {
        info!(
            "Schedule '{}': {} timeslots{}",
            schedule.name(),
            schedule.timeslots().len(),
            if schedule.show() { "" } else { " (hidden)" }
        );
    }

    // Poll for newly active timeslots on this thread until interrupted
    let notifier = LogNotifier;
    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for notification in state.poll_notifications(config.timezone) {
                    if let Err(e) = notifier.notify(&notification) {
                        error!("Failed to deliver notification: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    state.save_all()?;
    info!("Saved all schedules");

    Ok(())
}
