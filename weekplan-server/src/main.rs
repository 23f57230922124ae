mod cli;
mod routes;

use std::{env, sync::Arc};

use anyhow::{anyhow, Result};
use chrono::{Datelike, Weekday};
use log::{error, info, warn};
use tokio::{net::TcpListener, signal};

use weekplan_core::store::ScheduleStore;

use crate::routes::AppState;

const LOG_ENV: &str = "WEEKPLAN_LOG";

fn setup_logging() {
    if env::var(LOG_ENV).is_err() {
        env::set_var(LOG_ENV, "weekplan=info,weekplan_core=info");
    }

    pretty_env_logger::init_custom_env(LOG_ENV);
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let args = cli::parse(env::args().skip(1).collect());

    let store = ScheduleStore::new(&args.file);
    let schedule = store.load_or_else(|| args.week_start).ok_or_else(|| {
        anyhow!(
            "No schedule found at {}, pass --week-start YYYY-MM-DD to start a new week",
            args.file.display()
        )
    })?;

    if schedule.week_start().weekday() != Weekday::Mon {
        warn!("Week start {} is not a Monday", schedule.week_start());
    }

    let state = Arc::new(AppState::new(schedule, store));
    let router = routes::router(Arc::clone(&state));

    let listener = TcpListener::bind(args.address).await?;
    info!("Listening at http://{}", args.address);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if args.save_on_exit {
        if let Err(err) = state.save().await {
            error!("Failed to save schedule on exit: {err}");
        }
    }

    Ok(())
}
