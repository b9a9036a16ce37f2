//! Surfaces - adapters for the editor and display collaborators.
//!
//! - `editor` - where edits come from ([`EditorSurface`], file-backed)
//! - `display` - where snapshots go ([`DisplaySurface`], terminal or file)

mod display;
mod editor;

pub use display::{DisplaySurface, FileDisplay, TerminalDisplay};
pub use editor::{EditorConfig, EditorSurface, FileEditor, initial_content};
