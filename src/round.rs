use crate::catalog::{Catalog, Stop};
use crate::error::GameError;
use crate::geo::{self, Heading};
use crate::lines::{Line, LineIndex, Route};
use compact_str::CompactString;
use rand::Rng;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// One day of play: the secret stop and what the players get to see of it.
///
/// A `Round` never changes once built. Rotation builds a new one and swaps
/// it in, so a reader holding an `Arc<Round>` always sees a consistent
/// secret, equivalence class, line set and level number.
#[derive(Debug)]
pub struct Round {
    level_number: u32,
    secret: Stop,
    equivalents: Vec<Stop>,
    lines: Vec<Line>,
}

/// Outcome of one guess, in the shape the client renders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuessResult {
    pub stop_name: CompactString,
    #[serde(rename = "distance")]
    pub distance_km: f64,
    #[serde(rename = "percentage")]
    pub proximity: f64,
    pub direction: Heading,
    /// Set by the caller once the player is done with the round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<Stop>,
}

impl GuessResult {
    pub fn is_found(&self) -> bool {
        self.direction == Heading::Found
    }
}

impl Round {
    fn build(level_number: u32, secret: &Stop, catalog: &Catalog, index: &LineIndex) -> Self {
        let equivalents: Vec<Stop> = catalog.equivalents_of(secret).into_iter().cloned().collect();
        let lines = index.lines_through(&equivalents).into_iter().cloned().collect();
        Self {
            level_number,
            secret: secret.clone(),
            equivalents,
            lines,
        }
    }

    pub fn level_number(&self) -> u32 {
        self.level_number
    }

    pub fn secret(&self) -> &Stop {
        &self.secret
    }

    pub fn equivalents(&self) -> &[Stop] {
        &self.equivalents
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn routes<'a>(&self, index: &'a LineIndex) -> Vec<Option<&'a Route>> {
        index.routes_for_lines(&self.lines)
    }

    /// Scores `guessed_name` (a canonical stop name) against this round's
    /// secret. Attempt limits are the caller's business.
    pub fn evaluate(
        &self,
        catalog: &Catalog,
        maximum_distance_km: f64,
        guessed_name: &str,
    ) -> Result<GuessResult, GameError> {
        let guess = catalog
            .resolve_by_name(guessed_name)
            .ok_or_else(|| GameError::UnknownStop {
                name: CompactString::from(guessed_name),
            })?;
        let score = geo::score(guess, &self.secret, maximum_distance_km);
        debug!(
            level_number = self.level_number,
            guess = %guess.stop_name,
            distance_km = score.distance_km,
            "Evaluated guess"
        );
        Ok(GuessResult {
            stop_name: guess.stop_name.clone(),
            distance_km: score.distance_km,
            proximity: score.proximity,
            direction: score.heading,
            secret: None,
        })
    }
}

/// The game core: reference data plus the current round.
///
/// Reference data is immutable. Readers clone the current `Arc<Round>` out
/// of the lock and score against it without holding the lock.
pub struct Game {
    catalog: Catalog,
    index: LineIndex,
    maximum_distance_km: f64,
    round: RwLock<Option<Arc<Round>>>,
}

impl Game {
    /// Computes the network's maximum distance from the catalog.
    pub fn new(catalog: Catalog, index: LineIndex) -> Self {
        let maximum_distance_km = geo::maximum_distance(catalog.stops());
        Self::with_maximum_distance(catalog, index, maximum_distance_km)
    }

    pub fn with_maximum_distance(
        catalog: Catalog,
        index: LineIndex,
        maximum_distance_km: f64,
    ) -> Self {
        info!(
            stops = catalog.len(),
            lines = index.lines().len(),
            routes = index.routes().len(),
            maximum_distance_km,
            "Game ready"
        );
        Self {
            catalog,
            index,
            maximum_distance_km,
            round: RwLock::new(None),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    pub fn maximum_distance_km(&self) -> f64 {
        self.maximum_distance_km
    }

    /// Picks a new secret and moves to the next level, which saturates at
    /// `u32::MAX`. Returns `None` only for an empty catalog.
    pub fn start<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<Round>> {
        let secret = self.catalog.random_stop(rng)?;
        // Hold the write lock from reading the level to the swap so two
        // rotations cannot hand out the same level number.
        let mut current = self.round.write().unwrap_or_else(PoisonError::into_inner);
        let level_number = current.as_ref().map_or(0, |r| r.level_number())
            .saturating_add(1);
        let round = Arc::new(Round::build(level_number, secret, &self.catalog, &self.index));
        *current = Some(round.clone());
        drop(current);
        info!(level_number, secret = %secret.stop_name, "Started round");
        Some(round)
    }

    pub fn rotate<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<Round>> {
        self.start(rng)
    }

    /// Reinstalls a round saved before a restart.
    pub fn restore(&self, level_number: u32, secret_stop_id: &str) -> Result<Arc<Round>, GameError> {
        let secret = self
            .catalog
            .stop_by_id(secret_stop_id)
            .ok_or_else(|| GameError::UnknownStop {
                name: CompactString::from(secret_stop_id),
            })?;
        let round = Arc::new(Round::build(level_number, secret, &self.catalog, &self.index));
        self.install(round.clone());
        info!(level_number, secret = %secret.stop_name, "Restored round");
        Ok(round)
    }

    pub fn current_round(&self) -> Option<Arc<Round>> {
        self.round
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `0` before the first round.
    pub fn level_number(&self) -> u32 {
        self.current_round().map_or(0, |r| r.level_number())
    }

    pub fn current_secret(&self) -> Option<Stop> {
        self.current_round().map(|r| r.secret().clone())
    }

    pub fn current_lines(&self) -> Vec<Line> {
        self.current_round()
            .map(|r| r.lines().to_vec())
            .unwrap_or_default()
    }

    pub fn evaluate_guess(&self, guessed_name: &str) -> Result<GuessResult, GameError> {
        let round = self.current_round().ok_or(GameError::RoundNotStarted)?;
        round.evaluate(&self.catalog, self.maximum_distance_km, guessed_name)
    }

    fn install(&self, round: Arc<Round>) {
        let mut current = self.round.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(round);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{sample_catalog, stop};
    use crate::geo::{CompassPoint, FOUND_GLYPH};
    use crate::lines::tests::sample_index;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn sample_game() -> Game {
        Game::new(sample_catalog(), sample_index())
    }

    fn three_stop_game() -> Game {
        let catalog = Catalog::new(
            vec![
                stop("a", "A", 4.35, 50.85),
                stop("b", "B", 4.35, 50.86),
                stop("c", "C", 4.36, 50.85),
            ],
            Vec::new(),
        );
        Game::new(catalog, LineIndex::new(Vec::new(), Vec::new()))
    }

    #[test]
    fn evaluate_before_start() {
        let game = sample_game();
        assert_eq!(game.level_number(), 0);
        assert!(game.current_secret().is_none());
        assert!(game.current_lines().is_empty());
        assert_eq!(
            game.evaluate_guess("ROGIER"),
            Err(GameError::RoundNotStarted)
        );
    }

    #[test]
    fn three_stop_scenario() {
        let game = three_stop_game();
        game.restore(1, "a").unwrap();

        let found = game.evaluate_guess("A").unwrap();
        assert_eq!(found.distance_km, 0.0);
        assert_eq!(found.proximity, 1.0);
        assert!(found.is_found());

        // The secret lies south of B.
        let north = game.evaluate_guess("B").unwrap();
        assert!(north.distance_km > 0.0);
        assert_eq!(north.direction, Heading::Toward(CompassPoint::South));
        assert!(north.proximity < 1.0);

        assert_eq!(
            game.evaluate_guess("Z"),
            Err(GameError::UnknownStop { name: "Z".into() })
        );
    }

    #[test]
    fn secret_north_of_guess() {
        let game = three_stop_game();
        game.restore(1, "b").unwrap();
        let result = game.evaluate_guess("A").unwrap();
        assert_eq!(result.direction, Heading::Toward(CompassPoint::North));
    }

    #[test]
    fn every_platform_of_the_secret_is_found() {
        let game = sample_game();
        for secret in game.catalog().stops() {
            let round = game.restore(1, &secret.stop_id).unwrap();
            for platform in round.equivalents() {
                let result = game.evaluate_guess(&platform.stop_name).unwrap();
                assert_eq!(result.distance_km, 0.0);
                assert_eq!(result.proximity, 1.0);
                assert_eq!(result.direction.glyph(), FOUND_GLYPH);
            }
        }
    }

    #[test]
    fn round_carries_lines_and_routes() {
        let game = sample_game();
        let round = game.restore(4, "8012").unwrap();
        assert_eq!(round.level_number(), 4);
        assert_eq!(round.equivalents().len(), 2);
        let ids: Vec<_> = round.lines().iter().map(|l| l.line_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
        let routes = round.routes(game.index());
        assert_eq!(routes.len(), 2);
        assert!(routes.iter().all(|r| r.is_some()));
    }

    #[test]
    fn restore_unknown_stop() {
        let game = sample_game();
        assert_eq!(
            game.restore(3, "nope").map(|r| r.level_number()),
            Err(GameError::UnknownStop { name: "nope".into() })
        );
        assert!(game.current_round().is_none());
    }

    #[test]
    fn rotation_increments_level() {
        let game = sample_game();
        let mut rng = StdRng::seed_from_u64(42);
        for expected in 1..=20 {
            let round = game.rotate(&mut rng).unwrap();
            assert_eq!(round.level_number(), expected);
            assert_eq!(game.level_number(), expected);
        }
    }

    #[test]
    fn level_number_stops_at_the_last_level() {
        let game = sample_game();
        let mut rng = StdRng::seed_from_u64(3);
        game.restore(u32::MAX, "2695").unwrap();
        let round = game.rotate(&mut rng).unwrap();
        assert_eq!(round.level_number(), u32::MAX);
    }

    #[test]
    fn rotation_changes_secret_most_of_the_time() {
        let game = sample_game();
        let mut rng = StdRng::seed_from_u64(3);
        let mut previous = game.start(&mut rng).unwrap().secret().stop_id.clone();
        let mut changes = 0;
        let mut seen = HashSet::new();
        for _ in 0..400 {
            let secret = game.rotate(&mut rng).unwrap().secret().stop_id.clone();
            if secret != previous {
                changes += 1;
            }
            seen.insert(secret.clone());
            previous = secret;
        }
        // Four platforms: a repeat is expected a quarter of the time.
        assert!(changes > 250, "changes {}", changes);
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn single_stop_catalog_rotates_onto_itself() {
        let catalog = Catalog::new(vec![stop("only", "ONLY", 4.0, 50.0)], Vec::new());
        let game = Game::new(catalog, LineIndex::new(Vec::new(), Vec::new()));
        let mut rng = StdRng::seed_from_u64(9);
        game.start(&mut rng).unwrap();
        let round = game.rotate(&mut rng).unwrap();
        assert_eq!(round.level_number(), 2);
        assert_eq!(round.secret().stop_id, "only");
    }

    #[test]
    fn empty_catalog_cannot_start() {
        let game = Game::new(
            Catalog::new(Vec::new(), Vec::new()),
            LineIndex::new(Vec::new(), Vec::new()),
        );
        let mut rng = StdRng::seed_from_u64(0);
        assert!(game.start(&mut rng).is_none());
        assert_eq!(game.level_number(), 0);
    }

    #[test]
    fn stale_snapshot_keeps_its_secret() {
        let game = sample_game();
        let old = game.restore(1, "5710").unwrap();
        game.restore(2, "2695").unwrap();
        let stale = old
            .evaluate(game.catalog(), game.maximum_distance_km(), "GARE DU MIDI")
            .unwrap();
        assert!(stale.is_found());
        assert!(!game.evaluate_guess("GARE DU MIDI").unwrap().is_found());
    }

    #[test]
    fn concurrent_readers_see_whole_rounds() {
        let game = Arc::new(sample_game());
        game.restore(1, "8011").unwrap();
        let writer = {
            let game = game.clone();
            std::thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(5);
                for _ in 0..200 {
                    game.rotate(&mut rng);
                }
            })
        };
        for _ in 0..200 {
            let round = game.current_round().unwrap();
            assert!(round.equivalents().iter().all(|s| s.stop_name == round.secret().stop_name));
            let expected = game.index().lines_through(round.equivalents()).len();
            assert_eq!(round.lines().len(), expected);
        }
        writer.join().unwrap();
    }

    #[test]
    fn result_payload_shape() {
        let game = sample_game();
        game.restore(1, "5710").unwrap();
        let mut result = game.evaluate_guess("ROGIER").unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["stop_name"], "ROGIER");
        assert!(json.get("secret").is_none());
        assert!(json["percentage"].as_f64().unwrap() < 1.0);

        result.secret = game.current_secret();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["secret"]["stop_id"], "5710");
    }
}
