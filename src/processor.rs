use crate::state::AppState;
use serde::{Deserialize, Serialize};
use stopdle::{GameError, GuessResult, Lang, Route};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    /// Localized stop name
    pub input: String,
    /// Guesses already made this round
    pub curr_nb: u32,
    pub lvl_number: u32,
    pub lang: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[serde(rename = "stop_name")]
    pub stop_name: String,
    pub old_lang: String,
    pub new_lang: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload<'a> {
    pub routes: Vec<&'a Route>,
    pub stops: Vec<&'a str>,
    pub max: u32,
    pub lvl_number: u32,
    #[serde(rename = "minute_mode")]
    pub minute_mode: bool,
}

#[derive(Debug, PartialEq)]
pub enum GuessOutcome {
    Scored(GuessResult),
    /// Bad language or a name that is not a stop
    Rejected,
    /// The guess was made against a previous round
    Expired,
    /// The core could not score a well-formed guess
    Unprocessable(GameError),
}

/// What a client needs to render a round in `lang`.
pub fn start_payload<'a>(state: &'a AppState, lang: &str) -> Result<StartPayload<'a>, GameError> {
    let lang: Lang = lang.parse()?;
    let game = &state.game;
    let (routes, lvl_number) = match game.current_round() {
        Some(round) => (
            round.routes(game.index()).into_iter().flatten().collect(),
            round.level_number(),
        ),
        None => (Vec::new(), 0),
    };
    Ok(StartPayload {
        routes,
        stops: game.catalog().all_translated_names(lang).into_iter().collect(),
        max: state.config.maximum_guesses,
        lvl_number,
        minute_mode: state.config.minute_mode,
    })
}

pub fn process_guess(state: &AppState, request: &GuessRequest) -> GuessOutcome {
    let game = &state.game;
    let Ok(lang) = request.lang.parse::<Lang>() else {
        return GuessOutcome::Rejected;
    };
    let Some(canonical) = game.catalog().canonical_from_translated(&request.input, lang) else {
        return GuessOutcome::Rejected;
    };
    // Score against one snapshot so a rotation in between cannot mix rounds.
    let Some(round) = game.current_round() else {
        return GuessOutcome::Unprocessable(GameError::RoundNotStarted);
    };
    if request.lvl_number != round.level_number() {
        debug!(
            requested = request.lvl_number,
            current = round.level_number(),
            "Guess for an expired round"
        );
        return GuessOutcome::Expired;
    }

    let mut result = match round.evaluate(game.catalog(), game.maximum_distance_km(), canonical) {
        Ok(result) => result,
        Err(err) => {
            warn!(input = %request.input, error = %err, "Translated name does not resolve");
            return GuessOutcome::Unprocessable(err);
        }
    };
    if result.is_found() || request.curr_nb.saturating_add(1) >= state.config.maximum_guesses {
        result.secret = Some(round.secret().clone());
    }
    if let Some(display) = game.catalog().display_name(&result.stop_name, lang) {
        result.stop_name = display.into();
    }
    GuessOutcome::Scored(result)
}

pub fn translate(state: &AppState, request: &TranslateRequest) -> Result<String, GameError> {
    let from: Lang = request.old_lang.parse()?;
    let to: Lang = request.new_lang.parse()?;
    Ok(state
        .game
        .catalog()
        .translate(&request.stop_name, from, to)
        .to_string())
}
