//! Static network datasets: raw JSON records, validation, and the indexes
//! built from them.

use crate::catalog::{Catalog, Stop, TranslationEntry};
use crate::lines::{Line, LineDirection, LineIndex, LinePoint, Route, RouteType};
use anyhow::{Context, Result, bail, ensure};
use compact_str::CompactString;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub const STOPS_FILE: &str = "stops.json";
pub const LINES_FILE: &str = "lines.json";
pub const ROUTES_FILE: &str = "routes.json";
pub const TRANSLATIONS_FILE: &str = "translations.json";

/// Identifiers and coordinates show up both quoted and unquoted in exports.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(CompactString),
}

impl Scalar {
    fn into_text(self) -> CompactString {
        match self {
            Scalar::Number(n) => CompactString::from(n.to_string()),
            Scalar::Text(s) => s,
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StopRecord {
    stop_id: Scalar,
    stop_name: CompactString,
    stop_lon: Scalar,
    stop_lat: Scalar,
}

#[derive(Debug, Deserialize)]
struct PointRecord {
    id: Scalar,
    order: u32,
}

#[derive(Debug, Deserialize)]
struct LineRecord {
    destination: Vec<CompactString>,
    direction: LineDirection,
    #[serde(rename = "lineId")]
    line_id: Scalar,
    points: Vec<PointRecord>,
}

#[derive(Debug, Deserialize)]
struct RouteRecord {
    route_short_name: Scalar,
    route_type: u8,
    route_color: CompactString,
    route_text_color: CompactString,
}

impl TryFrom<StopRecord> for Stop {
    type Error = anyhow::Error;

    fn try_from(record: StopRecord) -> Result<Self> {
        let stop_lon = record
            .stop_lon
            .to_f64()
            .context("stop_lon is not a number")?;
        let stop_lat = record
            .stop_lat
            .to_f64()
            .context("stop_lat is not a number")?;
        let stop_id = record.stop_id.into_text();
        ensure!(!stop_id.is_empty(), "empty stop_id");
        ensure!(
            !record.stop_name.trim().is_empty(),
            "stop {} has an empty name",
            stop_id
        );
        ensure!(
            stop_lon.is_finite() && (-180.0..=180.0).contains(&stop_lon),
            "stop {} has longitude {} out of range",
            stop_id,
            stop_lon
        );
        ensure!(
            stop_lat.is_finite() && (-90.0..=90.0).contains(&stop_lat),
            "stop {} has latitude {} out of range",
            stop_id,
            stop_lat
        );
        Ok(Stop {
            stop_id,
            stop_name: record.stop_name,
            stop_lon,
            stop_lat,
        })
    }
}

impl TryFrom<LineRecord> for Line {
    type Error = anyhow::Error;

    fn try_from(record: LineRecord) -> Result<Self> {
        let line_id = record.line_id.into_text();
        ensure!(!line_id.is_empty(), "empty lineId");
        ensure!(!record.points.is_empty(), "line {} has no points", line_id);
        let destination: [CompactString; 2] = match record.destination.try_into() {
            Ok(pair) => pair,
            Err(other) => bail!(
                "line {} has {} destination labels, expected 2",
                line_id,
                other.len()
            ),
        };
        let mut points: Vec<LinePoint> = record
            .points
            .into_iter()
            .map(|p| LinePoint {
                id: p.id.into_text(),
                order: p.order,
            })
            .collect();
        points.sort_by_key(|p| p.order);
        Ok(Line {
            destination,
            direction: record.direction,
            line_id,
            points,
        })
    }
}

impl TryFrom<RouteRecord> for Route {
    type Error = anyhow::Error;

    fn try_from(record: RouteRecord) -> Result<Self> {
        let route_short_name = record.route_short_name.into_text();
        let route_type = RouteType::try_from(record.route_type)
            .map_err(|e| anyhow::anyhow!("route {}: {}", route_short_name, e))?;
        Ok(Route {
            route_short_name,
            route_type,
            route_color: record.route_color,
            route_text_color: record.route_text_color,
        })
    }
}

fn validate_translation(entry: &TranslationEntry) -> Result<()> {
    ensure!(
        !entry.stop_name.is_empty() && !entry.fr.is_empty() && !entry.nl.is_empty(),
        "translation of {:?} has an empty field",
        entry.stop_name
    );
    Ok(())
}

/// Everything the game needs from disk, indexed.
pub struct Datasets {
    pub catalog: Catalog,
    pub index: LineIndex,
}

impl Datasets {
    pub fn load(dir: &Path) -> Result<Self> {
        info!(dir = %dir.display(), "Loading datasets");
        let stops = read_file(&dir.join(STOPS_FILE))?;
        let lines = read_file(&dir.join(LINES_FILE))?;
        let routes = read_file(&dir.join(ROUTES_FILE))?;
        let translations = read_file(&dir.join(TRANSLATIONS_FILE))?;
        Self::from_json(&stops, &lines, &routes, &translations)
    }

    pub fn from_json(stops: &str, lines: &str, routes: &str, translations: &str) -> Result<Self> {
        let stops: Vec<Stop> = parse_records::<StopRecord, Stop>(stops, STOPS_FILE)?;
        ensure!(!stops.is_empty(), "{} holds no stops", STOPS_FILE);
        let lines: Vec<Line> = parse_records::<LineRecord, Line>(lines, LINES_FILE)?;
        check_stop_ids(&stops, &lines)?;

        let routes: Vec<Route> = parse_records::<RouteRecord, Route>(routes, ROUTES_FILE)?;

        let translations: Vec<TranslationEntry> = serde_json::from_str(translations)
            .with_context(|| format!("Failed to parse {}", TRANSLATIONS_FILE))?;
        for (idx, entry) in translations.iter().enumerate() {
            validate_translation(entry)
                .with_context(|| format!("{} record {}", TRANSLATIONS_FILE, idx))?;
        }

        info!(
            stops = stops.len(),
            lines = lines.len(),
            routes = routes.len(),
            translations = translations.len(),
            "Datasets loaded"
        );

        Ok(Self {
            catalog: Catalog::new(stops, translations),
            index: LineIndex::new(lines, routes),
        })
    }
}

// Stop IDs must be unique. Line points may name stops missing from the
// catalog; those never match a stop and are only reported.
fn check_stop_ids(stops: &[Stop], lines: &[Line]) -> Result<()> {
    let mut ids = HashSet::new();
    for stop in stops {
        ensure!(ids.insert(stop.stop_id.as_str()), "duplicate stop_id {}", stop.stop_id);
    }
    let dangling = lines
        .iter()
        .flat_map(|l| &l.points)
        .filter(|p| !ids.contains(p.id.as_str()))
        .count();
    if dangling > 0 {
        warn!(dangling, "Line points reference unknown stops");
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse_records<R, T>(json: &str, file: &str) -> Result<Vec<T>>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = anyhow::Error>,
{
    let records: Vec<R> =
        serde_json::from_str(json).with_context(|| format!("Failed to parse {}", file))?;
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            T::try_from(record).with_context(|| format!("{} record {}", file, idx))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;

    const STOPS: &str = r#"[
        {"stop_id": 8011, "stop_name": "DE BROUCKERE", "stop_lon": 4.3522, "stop_lat": 50.8503},
        {"stop_id": "8012", "stop_name": "DE BROUCKERE", "stop_lon": "4.3524", "stop_lat": "50.8501"},
        {"stop_id": "5710", "stop_name": "GARE DU MIDI", "stop_lon": 4.3365, "stop_lat": 50.8357}
    ]"#;
    const LINES: &str = r#"[
        {"destination": ["STOCKEL", "STOKKEL"], "direction": "Suburb", "lineId": 1,
         "points": [{"id": "8012", "order": 2}, {"id": "5710", "order": 1}]},
        {"destination": ["GARE DU MIDI", "ZUIDSTATION"], "direction": "City", "lineId": "4",
         "points": [{"id": "8011", "order": 1}, {"id": "9999", "order": 2}]}
    ]"#;
    const ROUTES: &str = r#"[
        {"route_short_name": 1, "route_type": 1, "route_color": "C4008F", "route_text_color": "FFFFFF"},
        {"route_short_name": "4", "route_type": 0, "route_color": "E2001A", "route_text_color": "FFFFFF"}
    ]"#;
    const TRANSLATIONS: &str = r#"[
        {"stop_name": "GARE DU MIDI", "fr": "Gare du Midi", "nl": "Zuidstation"}
    ]"#;

    #[test]
    fn loads_mixed_scalars() {
        let data = Datasets::from_json(STOPS, LINES, ROUTES, TRANSLATIONS).unwrap();
        assert_eq!(data.catalog.len(), 3);
        let stop = data.catalog.stop_by_id("8011").unwrap();
        assert_eq!(stop.stop_lon, 4.3522);
        assert_eq!(data.catalog.stop_by_id("8012").unwrap().stop_lat, 50.8501);

        let line = &data.index.lines()[0];
        assert_eq!(line.line_id, "1");
        assert_eq!(line.destination_in(Lang::Nl), "STOKKEL");
        // Points come back in travel order
        assert_eq!(line.points[0].id, "5710");

        let routes = data.index.routes_for_lines(data.index.lines());
        assert!(routes.iter().all(|r| r.is_some()));
        assert_eq!(
            data.catalog.translate("Gare du Midi", Lang::Fr, Lang::Nl),
            "Zuidstation"
        );
    }

    #[test]
    fn loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STOPS_FILE), STOPS).unwrap();
        fs::write(dir.path().join(LINES_FILE), LINES).unwrap();
        fs::write(dir.path().join(ROUTES_FILE), ROUTES).unwrap();
        fs::write(dir.path().join(TRANSLATIONS_FILE), TRANSLATIONS).unwrap();
        let data = Datasets::load(dir.path()).unwrap();
        assert_eq!(data.index.lines().len(), 2);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Datasets::load(dir.path()).err().unwrap();
        assert!(format!("{:#}", err).contains(STOPS_FILE));
    }

    #[test]
    fn rejects_bad_coordinates() {
        let stops = r#"[{"stop_id": "1", "stop_name": "X", "stop_lon": 4.0, "stop_lat": 95.0}]"#;
        let err = Datasets::from_json(stops, "[]", "[]", "[]").err().unwrap();
        assert!(format!("{:#}", err).contains("latitude"));

        let stops = r#"[{"stop_id": "1", "stop_name": "X", "stop_lon": "east", "stop_lat": 50.0}]"#;
        assert!(Datasets::from_json(stops, "[]", "[]", "[]").is_err());
    }

    #[test]
    fn rejects_empty_names_and_duplicates() {
        let stops = r#"[{"stop_id": "1", "stop_name": " ", "stop_lon": 4.0, "stop_lat": 50.0}]"#;
        assert!(Datasets::from_json(stops, "[]", "[]", "[]").is_err());

        let stops = r#"[
            {"stop_id": "1", "stop_name": "X", "stop_lon": 4.0, "stop_lat": 50.0},
            {"stop_id": 1, "stop_name": "Y", "stop_lon": 4.1, "stop_lat": 50.1}
        ]"#;
        let err = Datasets::from_json(stops, "[]", "[]", "[]").err().unwrap();
        assert!(err.to_string().contains("duplicate"));

        assert!(Datasets::from_json("[]", "[]", "[]", "[]").is_err());
    }

    #[test]
    fn rejects_unknown_route_type() {
        let routes = r#"[{"route_short_name": "9", "route_type": 7, "route_color": "000000", "route_text_color": "FFFFFF"}]"#;
        let err = Datasets::from_json(STOPS, LINES, routes, "[]").err().unwrap();
        assert!(format!("{:#}", err).contains("route_type"));
    }

    #[test]
    fn rejects_malformed_lines() {
        let lines = r#"[{"destination": ["A"], "direction": "City", "lineId": "3", "points": [{"id": "1", "order": 1}]}]"#;
        assert!(Datasets::from_json(STOPS, lines, "[]", "[]").is_err());

        let lines = r#"[{"destination": ["A", "B"], "direction": "Nowhere", "lineId": "3", "points": []}]"#;
        assert!(Datasets::from_json(STOPS, lines, "[]", "[]").is_err());

        let lines = r#"[{"destination": ["A", "B"], "direction": "City", "lineId": "3", "points": []}]"#;
        assert!(Datasets::from_json(STOPS, lines, "[]", "[]").is_err());
    }

    #[test]
    fn rejects_incomplete_translation() {
        let translations = r#"[{"stop_name": "GARE DU MIDI", "fr": "Gare du Midi", "nl": ""}]"#;
        assert!(Datasets::from_json(STOPS, LINES, ROUTES, translations).is_err());
    }
}
