use crate::persistence::save_round;
use crate::state::AppState;
use chrono::{DateTime, Duration, DurationRound, TimeZone, Utc};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{error, info};

/// When the round following `now` begins: the next midnight in `tz`, or
/// the next full minute in minute mode. Always strictly after `now`.
pub fn next_rotation(now: DateTime<Utc>, tz: Tz, minute_mode: bool) -> DateTime<Utc> {
    if minute_mode {
        let minute = Duration::minutes(1);
        return now
            .duration_trunc(minute)
            .map(|start| start + minute)
            .unwrap_or(now + minute);
    }

    let tomorrow = now.with_timezone(&tz).date_naive() + Duration::days(1);
    let midnight = tomorrow.and_hms_opt(0, 0, 0).unwrap_or_default();
    // Zones that jump the clock at midnight have no local 00:00 that day.
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or(now + Duration::days(1))
}

/// Rotates the round at every scheduled boundary, forever.
pub async fn run(state: Arc<AppState>, mut rng: StdRng) {
    let config = &state.config;
    loop {
        let now = Utc::now();
        let next = next_rotation(now, config.timezone, config.minute_mode);
        info!(next = %next.with_timezone(&config.timezone), "Next rotation scheduled");
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        match state.game.rotate(&mut rng) {
            Some(round) => {
                if let Err(e) = save_round(&round, &config.data_dir) {
                    error!("Error saving round: {:#}", e);
                }
            }
            None => error!("Rotation skipped: the catalog is empty"),
        }
    }
}
