use crate::config::Config;
use stopdle::Game;

/// Shared by every request handler and the rotation task.
pub struct AppState {
    pub game: Game,
    pub config: Config,
}

impl AppState {
    pub fn new(game: Game, config: Config) -> Self {
        Self { game, config }
    }
}
