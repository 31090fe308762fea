//! Practice target for timing side-channel labs.
//!
//! Serves `GET /?user=<id>&password=<guess>&difficulty=<n>` and answers `1`
//! when the guess is the user's secret, `0` otherwise. The check leaks on
//! purpose:
//!
//! - a length check walks `min(len(guess), len(secret))` characters, so the
//!   cost grows with the guess until it reaches the secret length;
//! - only a guess of the right length reaches the character comparison, which
//!   exits at the first mismatch.
//!
//! Every unit of work costs `difficulty × step` of wall time. Secrets are
//! either one fixed value for every user or generated per user on first
//! contact.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Work units charged once a guess has the right length.
const LENGTH_MATCH_UNITS: u64 = 4;

/// Work units charged per matching character.
const CHAR_MATCH_UNITS: u64 = 4;

/// Highest accepted difficulty.
pub const MAX_DIFFICULTY: u32 = 10;

/// How the target picks and checks secrets.
#[derive(Debug, Clone)]
pub struct TargetSettings {
    /// Same secret for every user. Generated per user when `None`.
    pub secret: Option<String>,
    /// Length of generated secrets.
    pub secret_length: usize,
    /// Symbols generated secrets are drawn from.
    pub alphabet: String,
    /// Wall time of one work unit at difficulty 1.
    pub step: Duration,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            secret: None,
            secret_length: 8,
            alphabet: "abcdefghijklmnopqrstuvwxyz".to_string(),
            step: Duration::from_millis(1),
        }
    }
}

/// Shared server state.
struct AppState {
    settings: TargetSettings,
    secrets: Mutex<HashMap<String, String>>,
}

impl AppState {
    async fn secret_for(&self, user: &str) -> String {
        if let Some(s) = &self.settings.secret {
            return s.clone();
        }
        let mut secrets = self.secrets.lock().await;
        secrets
            .entry(user.to_string())
            .or_insert_with(|| {
                let s = random_secret(&self.settings.alphabet, self.settings.secret_length);
                info!("generated secret for user {user:?} ({} chars)", s.chars().count());
                s
            })
            .clone()
    }
}

#[derive(Debug, Deserialize)]
struct GuessParams {
    user: Option<String>,
    password: Option<String>,
    difficulty: Option<u32>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    users: usize,
    fixed_secret: bool,
}

/// Result of one leaky comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub accepted: bool,
    /// Work units spent before rejecting (or accepting).
    pub units: u64,
}

/// Compare `guess` to `secret` the slow, leaky way.
pub fn leaky_compare(secret: &str, guess: &str) -> Comparison {
    let secret: Vec<char> = secret.chars().collect();
    let guess: Vec<char> = guess.chars().collect();

    let mut units = guess.len().min(secret.len()) as u64;
    if guess.len() != secret.len() {
        return Comparison {
            accepted: false,
            units,
        };
    }

    units += LENGTH_MATCH_UNITS;
    for (g, s) in guess.iter().zip(&secret) {
        if g != s {
            return Comparison {
                accepted: false,
                units,
            };
        }
        units += CHAR_MATCH_UNITS;
    }
    Comparison {
        accepted: true,
        units,
    }
}

fn random_secret(alphabet: &str, length: usize) -> String {
    let symbols: Vec<char> = alphabet.chars().collect();
    if symbols.is_empty() {
        return String::new();
    }
    let mut rng = rand::rng();
    (0..length)
        .map(|_| symbols[rng.random_range(0..symbols.len())])
        .collect()
}

async fn handle_guess(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GuessParams>,
) -> &'static str {
    let user = params.user.unwrap_or_default();
    let guess = params.password.unwrap_or_default();
    let difficulty = params.difficulty.unwrap_or(1).clamp(1, MAX_DIFFICULTY);

    let secret = state.secret_for(&user).await;
    let result = leaky_compare(&secret, &guess);

    let factor = u32::try_from(result.units * u64::from(difficulty)).unwrap_or(u32::MAX);
    let cost = state.settings.step.saturating_mul(factor);
    if !cost.is_zero() {
        tokio::time::sleep(cost).await;
    }
    debug!("user {user:?}: {} units, accepted={}", result.units, result.accepted);

    if result.accepted { "1" } else { "0" }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let users = state.secrets.lock().await.len();
    Json(HealthResponse {
        status: "ok".to_string(),
        users,
        fixed_secret: state.settings.secret.is_some(),
    })
}

/// Build the axum router.
fn build_router(settings: TargetSettings) -> Router {
    let state = Arc::new(AppState {
        settings,
        secrets: Mutex::new(HashMap::new()),
    });

    Router::new()
        .route("/", get(handle_guess))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Run the practice target until the process exits.
pub async fn run_server(settings: TargetSettings, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, settings).await
}

/// Serve the practice target on an already bound listener.
pub async fn serve(listener: tokio::net::TcpListener, settings: TargetSettings) -> std::io::Result<()> {
    info!("practice target listening on {}", listener.local_addr()?);
    axum::serve(listener, build_router(settings)).await
}
