mod api_client;
mod app;
mod config;
mod error;
mod events;
mod help;
mod ledger;
mod models;
mod points;
mod questions;
mod reports;
mod session;
mod skills;
mod stats;
mod storage;
mod telemetry;
mod tui;
mod ui;

use crate::{
    api_client::ApiClient,
    app::{ASSESSMENT_STATUS, App, PendingWork, ViewMode},
    config::Config,
    error::AppError,
    events::AppAction,
    ledger::Ledger,
    points::PointsLog,
    session::AssessmentSession,
    skills::SkillCatalog,
    storage::{FileStore, KeyValueStore, MemoryStore},
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    let (config, config_source) = Config::load()?;

    let data_dir = config.data_dir();
    if let Some(dir) = &data_dir {
        match telemetry::init_tracing(dir) {
            Ok(path) => info!(log = %path.display(), "skillcheck starting"),
            Err(e) => eprintln!("Logging disabled: {}", e),
        }
    }
    config_source.log();

    let api_key = resolve_api_key(&config)?;
    let client = ApiClient::new(
        config.backend_url()?,
        config.function_name(),
        api_key,
        config.model().to_string(),
    );
    info!(endpoint = %client.endpoint(), model = config.model(), "Using assessment backend");

    let store: Arc<dyn KeyValueStore> = match &data_dir {
        Some(dir) => Arc::new(FileStore::new(dir.clone())),
        None => {
            warn!("No data directory available; progress will not be saved");
            Arc::new(MemoryStore::new())
        }
    };
    let points = Arc::new(PointsLog::new(store.clone()));
    let ledger = Ledger::new(store, points.clone());
    let session = AssessmentSession::new(Arc::new(client), Box::new(ledger));
    let catalog = SkillCatalog::from_skills(config.skills.clone());
    let mut app = App::new(session, catalog, points);

    let mut tui = tui::init()?;
    let result = run(&mut app, &mut tui).await;
    tui::restore()?;
    result
}

async fn run(app: &mut App, tui: &mut tui::Tui) -> Result<(), AppError> {
    while !app.should_quit {
        tui.draw(|frame| ui::render(app, frame))?;

        let Some(action) = events::handle_events(app).await? else {
            continue;
        };
        match action {
            AppAction::StartAssessment(skill_id) => {
                app.view_mode = ViewMode::Assessment;
                app.prepare_for_questions();
                app.begin_pending(PendingWork::Generating);
                tui.draw(|frame| ui::render(app, frame))?;

                let result = app.session.start(&app.catalog, &skill_id).await;
                app.finish_pending();
                match result {
                    Ok(()) => app.status_message = ASSESSMENT_STATUS.to_string(),
                    Err(_) => app.back_to_menu(),
                }
                app.absorb_notifications();
            }
            AppAction::Submit => {
                app.begin_pending(PendingWork::Scoring);
                tui.draw(|frame| ui::render(app, frame))?;

                let result = app.session.submit().await;
                app.finish_pending();
                match result {
                    Ok(outcome) => {
                        app.last_outcome = Some(outcome);
                        app.show_result_overlay = true;
                        app.result_overlay_scroll = 0;
                        app.status_message =
                            "Result ready. e: toggle, n: retake, m: menu".to_string();
                        app.absorb_notifications();
                    }
                    Err(e) => {
                        warn!(error = %e, "Submission rejected");
                        app.status_message = format!("Error: {}", e);
                    }
                }
            }
            AppAction::Retake => {
                app.prepare_for_questions();
                app.begin_pending(PendingWork::Generating);
                tui.draw(|frame| ui::render(app, frame))?;

                let result = app.session.reset().await;
                app.finish_pending();
                match result {
                    Ok(()) => app.status_message = ASSESSMENT_STATUS.to_string(),
                    Err(e) => app.status_message = format!("Error: {}", e),
                }
                app.absorb_notifications();
            }
        }
    }
    Ok(())
}

/// Uses the configured key, or asks for one and stores it for next time.
fn resolve_api_key(config: &Config) -> Result<String, AppError> {
    if let Some(key) = config.api_key.as_deref().map(str::trim)
        && !key.is_empty()
    {
        return Ok(key.to_string());
    }

    let key = rpassword::prompt_password("Backend API key: ")?;
    let key = key.trim().to_string();
    if key.is_empty() {
        return Err(AppError::InvalidApiKey);
    }
    if let Err(e) = config::save_api_key(&key) {
        warn!(error = %e, "Could not save API key");
    }
    Ok(key)
}
