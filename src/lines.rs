use crate::catalog::Stop;
use crate::lang::Lang;
use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineDirection {
    City,
    Suburb,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePoint {
    pub id: CompactString,
    pub order: u32,
}

/// One direction of a transit line and the stops it serves, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// Destination label as `[fr, nl]`
    pub destination: [CompactString; 2],
    pub direction: LineDirection,
    #[serde(rename = "lineId")]
    pub line_id: CompactString,
    pub points: Vec<LinePoint>,
}

impl Line {
    pub fn destination_in(&self, lang: Lang) -> &str {
        match lang {
            Lang::Fr => &self.destination[0],
            Lang::Nl => &self.destination[1],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RouteType {
    Tram,
    Metro,
    Bus,
}

impl TryFrom<u8> for RouteType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RouteType::Tram),
            1 => Ok(RouteType::Metro),
            3 => Ok(RouteType::Bus),
            other => Err(format!("unknown route_type {}", other)),
        }
    }
}

impl From<RouteType> for u8 {
    fn from(value: RouteType) -> Self {
        match value {
            RouteType::Tram => 0,
            RouteType::Metro => 1,
            RouteType::Bus => 3,
        }
    }
}

/// The badge shown for a line number, both directions together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub route_short_name: CompactString,
    pub route_type: RouteType,
    pub route_color: CompactString,
    pub route_text_color: CompactString,
}

pub struct LineIndex {
    lines: Vec<Line>,
    routes: Vec<Route>,
    // Stop ID -> positions in `lines`, ascending
    lines_by_stop: HashMap<CompactString, Vec<usize>>,
    route_by_short_name: HashMap<CompactString, usize>,
}

impl LineIndex {
    pub fn new(lines: Vec<Line>, routes: Vec<Route>) -> Self {
        let mut lines_by_stop: HashMap<CompactString, Vec<usize>> = HashMap::new();
        for (idx, line) in lines.iter().enumerate() {
            for point in &line.points {
                let positions = lines_by_stop.entry(point.id.clone()).or_default();
                // A loop line lists the same stop twice
                if positions.last() != Some(&idx) {
                    positions.push(idx);
                }
            }
        }

        let mut route_by_short_name = HashMap::new();
        for (idx, route) in routes.iter().enumerate() {
            route_by_short_name
                .entry(route.route_short_name.clone())
                .or_insert(idx);
        }

        Self {
            lines,
            routes,
            lines_by_stop,
            route_by_short_name,
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Lines serving any of `stops`, one per `line_id`.
    ///
    /// Candidates are visited stop by stop, and for each stop in dataset
    /// order. The result is an insertion-ordered set keyed by `line_id`:
    /// the first line seen for a number is kept and later ones (usually
    /// the opposite direction) are dropped.
    pub fn lines_through<'a, I>(&self, stops: I) -> Vec<&Line>
    where
        I: IntoIterator<Item = &'a Stop>,
    {
        let mut seen: IndexMap<&str, &Line> = IndexMap::new();
        for stop in stops {
            let Some(positions) = self.lines_by_stop.get(&stop.stop_id) else {
                continue;
            };
            for &idx in positions {
                let line = &self.lines[idx];
                seen.entry(line.line_id.as_str()).or_insert(line);
            }
        }
        seen.into_values().collect()
    }

    /// One slot per input line, `None` where no route carries its number.
    pub fn routes_for_lines<'a, I>(&self, lines: I) -> Vec<Option<&Route>>
    where
        I: IntoIterator<Item = &'a Line>,
    {
        lines
            .into_iter()
            .map(|line| {
                self.route_by_short_name
                    .get(&line.line_id)
                    .map(|&idx| &self.routes[idx])
            })
            .collect()
    }
}
