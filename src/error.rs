use compact_str::CompactString;

/// The error type for catalog lookups and guess evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The guessed name does not match any stop of the catalog.
    UnknownStop { name: CompactString },
    /// A language code outside of [`Lang`](crate::lang::Lang).
    UnsupportedLanguage { code: CompactString },
    /// A guess was evaluated before the first round was started.
    RoundNotStarted,
}

impl std::error::Error for GameError {}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::UnknownStop { name } => write!(f, "No stop is named {:?}", name),
            GameError::UnsupportedLanguage { code } => {
                write!(f, "Language {:?} is not supported", code)
            }
            GameError::RoundNotStarted => write!(f, "No round has been started yet"),
        }
    }
}
