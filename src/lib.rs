//! Core of a daily stop-guessing game: players name a transit stop and are
//! told how far, and in which direction, the secret stop lies.

pub mod catalog;
pub mod dataset;
pub mod error;
pub mod geo;
pub mod lang;
pub mod lines;
pub mod round;

pub use catalog::{Catalog, Stop, TranslationEntry};
pub use dataset::Datasets;
pub use error::GameError;
pub use geo::{CompassPoint, Heading, Score};
pub use lang::Lang;
pub use lines::{Line, LineIndex, Route, RouteType};
pub use round::{Game, GuessResult, Round};
