pub mod flows;
pub mod state;

pub use flows::{Dashboard, Editor, EditorMode, MatchEntry};
pub use state::{App, AppState};
