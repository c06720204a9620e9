use crate::bridge::model::DisplayModel;
use crate::generator::scenario::{build_sheet, ScenarioConfig};
use crate::workflow::runner::Runner;
use crate::workflow::sheet::Sheet;
use lobcore::df::DfState;
use log::{error, info, warn};
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<DisplayModel>>;

/// Triangulates a sheet and swaps the result into the served model.
fn apply(
    state: &SharedModel,
    runner: &Runner,
    sheet: anyhow::Result<Sheet>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    match sheet.and_then(|sheet| runner.ingest(&sheet)) {
        Ok(result) => {
            let model = DisplayModel::from_run(runner, &result);
            let fixes = result
                .outcomes
                .iter()
                .filter(|outcome| outcome.state == Some(DfState::Fix))
                .count();
            let signals = model.signals.len();
            *state.write().unwrap_or_else(PoisonError::into_inner) = model;
            warp::reply::with_status(
                warp::reply::json(&json!({"status": "ok", "signals": signals, "fixes": fixes})),
                StatusCode::OK,
            )
        }
        Err(err) => {
            warn!("ingest error: {:#}", err);
            warp::reply::with_status(
                warp::reply::json(&json!({"status": "error", "message": format!("{:#}", err)})),
                StatusCode::BAD_REQUEST,
            )
        }
    }
}

/// Bridge that serves the current display model and accepts new sheets.
pub struct HttpBridge {
    state: SharedModel,
    runner: Arc<Runner>,
}

impl HttpBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self {
            state: Arc::new(RwLock::new(DisplayModel::default())),
            runner,
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());

        let get_route = warp::path("signals")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| {
                let model = state.read().unwrap_or_else(PoisonError::into_inner);
                warp::reply::json(&*model)
            });

        let ingest_route = warp::path("ingest")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter.clone())
            .and(runner_filter.clone())
            .map(|sheet: Sheet, state: SharedModel, runner: Arc<Runner>| {
                apply(&state, &runner, Ok(sheet))
            });

        let synthetic_route = warp::path("ingest-synthetic")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(runner_filter)
            .map(
                |config: ScenarioConfig, state: SharedModel, runner: Arc<Runner>| {
                    if let Some(name) = config.scenario.as_ref() {
                        info!("synthetic scenario {}", name);
                    }
                    apply(&state, &runner, build_sheet(&config, runner.model()))
                },
            );

        get_route.or(ingest_route).or(synthetic_route)
    }

    /// Serves the routes on a background thread with its own runtime.
    pub fn serve(&self, address: SocketAddr) -> thread::JoinHandle<()> {
        let routes = self.routes();
        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("building bridge runtime: {}", err);
                    return;
                }
            };
            info!("bridge listening on http://{}", address);
            runtime.block_on(warp::serve(routes).run(address));
        })
    }

    pub fn publish(&self, model: DisplayModel) {
        info!(
            "publishing {} signal(s), {} conversation(s)",
            model.signals.len(),
            model.conversations.len()
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = model;
    }

    pub fn snapshot(&self) -> DisplayModel {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
