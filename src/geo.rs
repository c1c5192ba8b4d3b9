//! Flat-earth scoring of a guess against the secret stop.
//!
//! Offsets are converted to kilometres with an equirectangular
//! approximation, which is good enough at the scale of a city network.

use crate::catalog::Stop;
use serde::{Serialize, Serializer};
use std::f64::consts::FRAC_PI_4;

pub const KM_PER_DEGREE_LON: f64 = 111.320;
pub const KM_PER_DEGREE_LAT: f64 = 110.574;

/// Displacement between two stops, in kilometres (x east, y north).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Offset {
    pub x_km: f64,
    pub y_km: f64,
}

/// Offset from `from` to `to`.
///
/// The longitude scale is corrected with the cosine of the latitude
/// *delta* (in degrees, fed to `cos` as is), not of the absolute
/// latitude. Scores and the maximum distance are calibrated on this, so
/// it must not be "fixed" in isolation.
pub fn offset(from: &Stop, to: &Stop) -> Offset {
    let d_lon = to.stop_lon - from.stop_lon;
    let d_lat = to.stop_lat - from.stop_lat;
    Offset {
        x_km: d_lon * KM_PER_DEGREE_LON * d_lat.cos(),
        y_km: d_lat * KM_PER_DEGREE_LAT,
    }
}

impl Offset {
    pub fn distance_km(&self) -> f64 {
        (self.x_km * self.x_km + self.y_km * self.y_km).sqrt()
    }

    pub fn compass_point(&self) -> CompassPoint {
        CompassPoint::from_angle(self.y_km.atan2(self.x_km))
    }
}

/// The eight 45° sectors, counterclockwise from east.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompassPoint {
    East,
    NorthEast,
    North,
    NorthWest,
    West,
    SouthWest,
    South,
    SouthEast,
}

impl CompassPoint {
    pub const ALL: [CompassPoint; 8] = [
        CompassPoint::East,
        CompassPoint::NorthEast,
        CompassPoint::North,
        CompassPoint::NorthWest,
        CompassPoint::West,
        CompassPoint::SouthWest,
        CompassPoint::South,
        CompassPoint::SouthEast,
    ];

    /// `angle` in radians, 0 = east, counterclockwise positive.
    /// Ties round up, so +22.5° is north-east and -22.5° is east.
    pub fn from_angle(angle: f64) -> Self {
        let bucket = (angle / FRAC_PI_4 + 8.0 + 0.5).floor() as i64;
        Self::ALL[bucket.rem_euclid(8) as usize]
    }

    pub fn glyph(self) -> &'static str {
        match self {
            CompassPoint::East => "➡️",
            CompassPoint::NorthEast => "↗️",
            CompassPoint::North => "⬆️",
            CompassPoint::NorthWest => "↖️",
            CompassPoint::West => "⬅️",
            CompassPoint::SouthWest => "↙️",
            CompassPoint::South => "⬇️",
            CompassPoint::SouthEast => "↘️",
        }
    }

    pub fn opposite(self) -> Self {
        Self::ALL[(self as usize + 4) % 8]
    }
}

/// What the player sees in the direction column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    Found,
    Toward(CompassPoint),
}

pub const FOUND_GLYPH: &str = "✅";

impl Heading {
    pub fn glyph(self) -> &'static str {
        match self {
            Heading::Found => FOUND_GLYPH,
            Heading::Toward(point) => point.glyph(),
        }
    }
}

impl Serialize for Heading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.glyph())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Score {
    pub distance_km: f64,
    pub heading: Heading,
    pub proximity: f64,
}

impl Score {
    pub const FOUND: Score = Score {
        distance_km: 0.0,
        heading: Heading::Found,
        proximity: 1.0,
    };
}

/// Scores `guess` against `secret`. Two platforms of the same stop name
/// are the same answer, whatever their coordinates.
pub fn score(guess: &Stop, secret: &Stop, maximum_distance_km: f64) -> Score {
    if guess.stop_name == secret.stop_name {
        return Score::FOUND;
    }
    let offset = offset(guess, secret);
    let distance_km = offset.distance_km();
    Score {
        distance_km,
        heading: Heading::Toward(offset.compass_point()),
        proximity: proximity(distance_km, maximum_distance_km),
    }
}

/// `1` at distance 0, `0` at the largest distance of the network.
pub fn proximity(distance_km: f64, maximum_distance_km: f64) -> f64 {
    if maximum_distance_km.is_nan() || maximum_distance_km <= 0.0 {
        return if distance_km == 0.0 { 1.0 } else { 0.0 };
    }
    ((maximum_distance_km - distance_km) / maximum_distance_km).clamp(0.0, 1.0)
}

/// Largest distance between any two stops. Quadratic in the number of
/// stops, so callers compute it once at startup.
pub fn maximum_distance(stops: &[Stop]) -> f64 {
    let mut max = 0.0_f64;
    for (i, a) in stops.iter().enumerate() {
        for b in &stops[i + 1..] {
            max = max.max(offset(a, b).distance_km());
        }
    }
    max
}

/// The five-cell share grid for one guess: a green cell per full 20%,
/// then a yellow cell if 10% or more remains, black cells for the rest.
/// The server never renders it; it is here for clients sharing a result.
pub fn squares(proximity: f64) -> String {
    let percentage = proximity.clamp(0.0, 1.0) * 100.0;
    let green = (percentage / 20.0).floor() as usize;
    let yellow = ((percentage % 20.0) / 10.0).floor() as usize;
    let green = green.min(5);
    let yellow = yellow.min(5 - green);
    let mut grid = String::new();
    grid.push_str(&"🟩".repeat(green));
    grid.push_str(&"🟨".repeat(yellow));
    grid.push_str(&"⬛".repeat(5 - green - yellow));
    grid
}
