//! Headless search core (session/results/services).

pub mod search;
pub mod services;
pub mod session;

pub use search::{DisplayMatch, FileResults, SearchResultsSnapshot, SearchState};
pub use session::SearchSession;
