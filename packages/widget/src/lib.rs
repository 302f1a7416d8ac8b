//! # Widget crate: editable content blocks
//!
//! Turns a block of server-rendered markup into something a user can edit in
//! place: fetch a form, preview the change, save it, or delete the block. The
//! crate holds the state machine and everything it needs to decide, and does no
//! I/O of its own: requests go out through [`api::RemoteApi`], dialogs through
//! [`ConfirmationGate`], drawing through [`Renderer`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`controller`] | [`WidgetController`], the per-block lifecycle |
//! | [`page`] | [`Page`], the widgets bound on one page and their handles |
//! | [`form`] | Form serialization and [`RenderedForm`] |
//! | [`history`] | The version menu |
//! | [`gate`] | Confirmation/prompt abstraction and the dialog texts |
//! | [`renderer`] | Presentation hooks |
//! | [`config`] | [`WidgetConfig`] and its JSON/TOML forms |
//!
//! ## Example
//!
//! ```ignore
//! let mut page = Page::new(RecordingRenderer::new());
//! let (handle, _) = page.bind(WidgetConfig::update("/api/posts", 42), markup);
//! let handle = page.run(&HttpClient::new(), &mut gate, handle, Action::Edit).await?;
//! ```

pub mod config;
pub mod controller;
mod error;
pub mod form;
pub mod gate;
pub mod history;
pub mod page;
pub mod renderer;

pub use config::{ConfigError, Permissions, WidgetConfig};
pub use controller::{Action, Resolution, Step, WidgetController, WidgetState, WidgetView};
pub use error::WidgetError;
pub use form::{FormData, RenderedForm};
pub use gate::{Asked, ConfirmationGate, ScriptedGate, TRANSPORT_ALERT};
pub use history::{MenuOption, VersionMenu};
pub use page::{Page, WidgetHandle};
pub use renderer::{RecordingRenderer, RenderEvent, Renderer};
