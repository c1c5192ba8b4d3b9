use crate::error::GameError;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Languages stop names are translated into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Fr,
    Nl,
}

impl Lang {
    pub const ALL: [Lang; 2] = [Lang::Fr, Lang::Nl];

    pub fn code(self) -> &'static str {
        match self {
            Lang::Fr => "fr",
            Lang::Nl => "nl",
        }
    }
}

impl FromStr for Lang {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fr" => Ok(Lang::Fr),
            "nl" => Ok(Lang::Nl),
            other => Err(GameError::UnsupportedLanguage {
                code: CompactString::from(other),
            }),
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
