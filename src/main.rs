use anyhow::Result;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use stopdle::{Datasets, Game};
use tracing::{info, warn};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use warp::Filter;
use warp::hyper::body::Bytes;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

mod config;
mod persistence;
mod processor;
mod rotation;
mod state;

use config::Config;
use persistence::resume;
use processor::{GuessOutcome, GuessRequest, TranslateRequest};
use state::AppState;

const HSTS: &str = "max-age=63072000";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    initialize_logging(config.log_level);

    // 1. Load datasets
    let Datasets { catalog, index } = Datasets::load(&config.dataset_dir)?;
    let game = match config.maximum_distance {
        Some(km) => Game::with_maximum_distance(catalog, index, km),
        None => Game::new(catalog, index),
    };

    // 2. Recover or start the round
    let mut rng = StdRng::from_entropy();
    resume(&game, &config.data_dir, &mut rng)?;

    let state = Arc::new(AppState::new(game, config));

    // 3. Rotation loop
    tokio::spawn(rotation::run(state.clone(), rng));

    // 4. HTTP Server
    let state_filter_base = state.clone();
    let state_filter = warp::any().map(move || state_filter_base.clone()).boxed();

    // POST /start
    let start_route = warp::path("start")
        .and(warp::path::end())
        .and(warp::post())
        .and(state_filter.clone())
        .and(warp::body::bytes())
        .map(|state: Arc<AppState>, body: Bytes| {
            let lang = String::from_utf8_lossy(&body);
            match processor::start_payload(&state, lang.trim()) {
                Ok(payload) => warp::reply::json(&payload).into_response(),
                Err(e) => {
                    warn!("Bad /start request: {}", e);
                    status(StatusCode::BAD_REQUEST)
                }
            }
        });

    // POST /guess
    let guess_route = warp::path("guess")
        .and(warp::path::end())
        .and(warp::post())
        .and(state_filter.clone())
        .and(warp::body::bytes())
        .map(|state: Arc<AppState>, body: Bytes| {
            let Ok(request) = serde_json::from_slice::<GuessRequest>(&body) else {
                return status(StatusCode::BAD_REQUEST);
            };
            match processor::process_guess(&state, &request) {
                GuessOutcome::Scored(result) => warp::reply::json(&result).into_response(),
                GuessOutcome::Rejected => status(StatusCode::BAD_REQUEST),
                GuessOutcome::Expired => status(StatusCode::RESET_CONTENT),
                GuessOutcome::Unprocessable(e) => {
                    warn!("Could not score guess: {}", e);
                    status(StatusCode::NOT_IMPLEMENTED)
                }
            }
        });

    // POST /tl
    let translate_route = warp::path("tl")
        .and(warp::path::end())
        .and(warp::post())
        .and(state_filter.clone())
        .and(warp::body::bytes())
        .map(|state: Arc<AppState>, body: Bytes| {
            let Ok(request) = serde_json::from_slice::<TranslateRequest>(&body) else {
                return status(StatusCode::BAD_REQUEST);
            };
            match processor::translate(&state, &request) {
                Ok(name) => warp::reply::with_header(name, "content-type", "text/plain; charset=utf-8")
                    .into_response(),
                Err(_) => status(StatusCode::BAD_REQUEST),
            }
        });

    let static_route = warp::get().and(warp::fs::dir(state.config.public_dir.clone()));

    let routes = start_route
        .or(guess_route)
        .or(translate_route)
        .or(static_route)
        .with(warp::reply::with::header("strict-transport-security", HSTS))
        .boxed();

    let server_port = state.config.port;
    info!("Server running at http://localhost:{}", server_port);
    warp::serve(routes).run(([0, 0, 0, 0], server_port)).await;
    Ok(())
}

fn status(code: StatusCode) -> Response {
    warp::reply::with_status(warp::reply(), code).into_response()
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
