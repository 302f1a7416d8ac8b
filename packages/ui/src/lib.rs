//! Dioxus components for in-place editable content blocks.

mod browser_gate;
pub use browser_gate::{alert, BrowserGate};

mod dom_renderer;
pub use dom_renderer::{BlockFrame, DomRenderer};

mod editable_block;
pub use editable_block::EditablePage;

mod version_select;
pub use version_select::VersionSelect;
