use chrono_tz::Tz;
use clap::Parser;
use clap::builder::FalseyValueParser;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Settings of the game server. Every flag can also come from the
/// environment.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Daily transit stop guessing game")]
pub struct Config {
    /// HTTP port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Attempts a player gets before the secret is revealed
    #[arg(long, env = "MAXIMUM_GUESSES", default_value_t = 6)]
    pub maximum_guesses: u32,

    /// Rotate the secret every minute instead of every day
    #[arg(long, env = "MINUTE_MODE", value_parser = FalseyValueParser::new())]
    pub minute_mode: bool,

    /// Time zone whose midnight starts a new round
    #[arg(long, env = "TIMEZONE", default_value = "Europe/Brussels", value_parser = parse_timezone)]
    pub timezone: Tz,

    /// Directory holding stops.json, lines.json, routes.json and translations.json
    #[arg(long, env = "DATASET_DIR", default_value = "assets/datasets")]
    pub dataset_dir: PathBuf,

    /// Where the current round is saved across restarts
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Static client files
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// Largest stop-to-stop distance in km; computed from the stops when unset
    #[arg(long, env = "MAXIMUM_DISTANCE")]
    pub maximum_distance: Option<f64>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>()
        .map_err(|_| format!("unknown time zone {:?}", s))
}
