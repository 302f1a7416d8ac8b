//! Browser dialogs behind [`ConfirmationGate`].
//!
//! In the browser the questions are the window's blocking `confirm` and
//! `prompt`. Elsewhere (server-side rendering, native test builds) there is no
//! one to ask, so every question is declined.

use widget::ConfirmationGate;

#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserGate;

impl ConfirmationGate for BrowserGate {
    fn confirm_discard(&mut self, message: &str) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(window) = web_sys::window() {
                return window.confirm_with_message(message).unwrap_or(false);
            }
        }
        tracing::warn!(message, "no dialog available; declining");
        false
    }

    fn prompt_text(&mut self, message: &str) -> Option<String> {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(window) = web_sys::window() {
                return window.prompt_with_message(message).ok().flatten();
            }
        }
        tracing::warn!(message, "no prompt available; declining");
        None
    }
}

/// Page-level alert.
pub fn alert(message: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
            return;
        }
    }
    tracing::error!("{message}");
}
