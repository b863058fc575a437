//! Client-side state for the Vibe landing page: the simulated sign-in flows,
//! the profile editor and the shell that sequences their timers and events.

pub mod attempt;
pub mod avatar;
pub mod config;
pub mod error;
pub mod profile_editor;
pub mod session;
pub mod shell;

pub use attempt::{AttemptOutcome, AttemptSequence};
pub use config::{load_settings, Settings};
pub use error::ClientError;
pub use profile_editor::{ConnectionTestOutcome, EditorSnapshot, ProfileField};
pub use session::{LoginSnapshot, FALLBACK_IDENTIFIER};
pub use shell::AppShell;
