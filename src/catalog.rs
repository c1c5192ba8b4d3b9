use crate::lang::Lang;
use compact_str::CompactString;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A physical platform. Several stops may share one `stop_name`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub stop_id: CompactString,
    pub stop_name: CompactString,
    pub stop_lon: f64,
    pub stop_lat: f64,
}

/// Localized display names of one canonical stop name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub stop_name: CompactString,
    pub fr: CompactString,
    pub nl: CompactString,
}

impl TranslationEntry {
    pub fn name_in(&self, lang: Lang) -> &str {
        match lang {
            Lang::Fr => &self.fr,
            Lang::Nl => &self.nl,
        }
    }
}

/// Immutable index over every stop and translation of the network.
///
/// Lookups that can match several records (a stop name shared by many
/// platforms, a display name listed twice) resolve to the first record in
/// load order.
pub struct Catalog {
    stops: Vec<Stop>,
    translations: Vec<TranslationEntry>,
    // Stop name -> positions in `stops`, in load order
    by_name: HashMap<CompactString, Vec<usize>>,
    by_id: HashMap<CompactString, usize>,
    // Per language: display name -> position in `translations`
    by_display: HashMap<(Lang, CompactString), usize>,
    by_canonical: HashMap<CompactString, usize>,
}

impl Catalog {
    pub fn new(stops: Vec<Stop>, translations: Vec<TranslationEntry>) -> Self {
        let mut by_name: HashMap<CompactString, Vec<usize>> = HashMap::new();
        let mut by_id = HashMap::new();
        for (idx, stop) in stops.iter().enumerate() {
            by_name.entry(stop.stop_name.clone()).or_default().push(idx);
            by_id.entry(stop.stop_id.clone()).or_insert(idx);
        }

        let mut by_display = HashMap::new();
        let mut by_canonical = HashMap::new();
        for (idx, entry) in translations.iter().enumerate() {
            for lang in Lang::ALL {
                by_display
                    .entry((lang, CompactString::from(entry.name_in(lang))))
                    .or_insert(idx);
            }
            by_canonical.entry(entry.stop_name.clone()).or_insert(idx);
        }

        Self {
            stops,
            translations,
            by_name,
            by_id,
            by_display,
            by_canonical,
        }
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn all_stop_names(&self) -> BTreeSet<&str> {
        self.by_name.keys().map(|name| name.as_str()).collect()
    }

    /// Distinct display names in `lang`. Unsupported codes are rejected
    /// when parsing the [`Lang`].
    pub fn all_translated_names(&self, lang: Lang) -> BTreeSet<&str> {
        self.translations.iter().map(|t| t.name_in(lang)).collect()
    }

    /// Every stop named like `stop`, `stop` included, in load order.
    pub fn equivalents_of(&self, stop: &Stop) -> Vec<&Stop> {
        self.by_name
            .get(&stop.stop_name)
            .map(|positions| positions.iter().map(|&idx| &self.stops[idx]).collect())
            .unwrap_or_default()
    }

    /// Uniform over platforms, not over names: a name served by four
    /// platforms comes up four times as often as a single-platform one.
    pub fn random_stop<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Stop> {
        self.stops.choose(rng)
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<&Stop> {
        self.by_name
            .get(name)
            .and_then(|positions| positions.first())
            .map(|&idx| &self.stops[idx])
    }

    pub fn stop_by_id(&self, stop_id: &str) -> Option<&Stop> {
        self.by_id.get(stop_id).map(|&idx| &self.stops[idx])
    }

    /// Returns `name` unchanged when no entry carries it in `from`.
    pub fn translate<'a>(&'a self, name: &'a str, from: Lang, to: Lang) -> &'a str {
        match self.entry_by_display(name, from) {
            Some(entry) => entry.name_in(to),
            None => name,
        }
    }

    pub fn canonical_from_translated(&self, name: &str, lang: Lang) -> Option<&str> {
        self.entry_by_display(name, lang)
            .map(|entry| entry.stop_name.as_str())
    }

    pub fn display_name(&self, canonical: &str, lang: Lang) -> Option<&str> {
        self.by_canonical
            .get(canonical)
            .map(|&idx| self.translations[idx].name_in(lang))
    }

    fn entry_by_display(&self, name: &str, lang: Lang) -> Option<&TranslationEntry> {
        self.by_display
            .get(&(lang, CompactString::from(name)))
            .map(|&idx| &self.translations[idx])
    }
}
