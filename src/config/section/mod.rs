//! Configuration section definitions.
//!
//! Each module corresponds to a section in `stylepad.toml`:
//!
//! | Module    | TOML Section  | Purpose                                  |
//! |-----------|---------------|------------------------------------------|
//! | `session` | `[session]`   | Seed document and seed output            |
//! | `compile` | `[compile]`   | Engine, debounce, timeout, workers       |
//! | `editor`  | `[editor]`    | Options handed to the editor surface     |
//! | `display` | `[display]`   | Where compiled output is shown           |

mod compile;
mod display;
mod editor;
mod session;

pub use compile::{CompileConfig, EngineKind};
pub use display::DisplayConfig;
pub use editor::EditorSectionConfig;
pub use session::SessionConfig;
