//! [`Renderer`] for the Dioxus host.
//!
//! The page tells the renderer what changed and the renderer keeps one
//! [`BlockFrame`] per block: everything a component needs to draw it. The
//! renderer lives inside the page signal, so every change re-runs the
//! components that read it.

use std::collections::BTreeMap;

use widget::{Action, Renderer, VersionMenu, WidgetHandle, WidgetState, WidgetView};

use crate::browser_gate::alert;

/// What one block looks like right now.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockFrame {
    pub handle: WidgetHandle,
    pub state: WidgetState,
    /// Display block or preview. Unused while editing.
    pub content: String,
    /// Edit form, kept while previewing so the DOM form is never rebuilt.
    pub form: Option<String>,
    pub actions: Vec<Action>,
    pub versions: VersionMenu,
    pub commit_on_save: bool,
    pub busy: Option<String>,
    /// Number of the invalid-form pulse currently showing.
    pub flash: Option<u32>,
}

impl BlockFrame {
    pub fn is_editing(&self) -> bool {
        self.state == WidgetState::Edit
    }

    pub fn class(&self) -> String {
        match self.flash {
            Some(_) => format!("{} crud-invalid", self.state.css_class()),
            None => self.state.css_class().to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DomRenderer {
    frames: BTreeMap<usize, BlockFrame>,
    pulses: u32,
}

impl DomRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame of the block in `slot`, whatever its generation.
    pub fn frame(&self, slot: usize) -> Option<&BlockFrame> {
        self.frames.get(&slot)
    }

    /// End pulse `pulse` on `slot`. A newer pulse is left running.
    pub fn end_flash(&mut self, slot: usize, pulse: u32) {
        if let Some(frame) = self.frames.get_mut(&slot) {
            if frame.flash == Some(pulse) {
                frame.flash = None;
            }
        }
    }
}

impl Renderer for DomRenderer {
    fn render(&mut self, handle: WidgetHandle, view: &WidgetView<'_>) {
        let busy = self
            .frames
            .get(&handle.slot())
            .and_then(|frame| frame.busy.clone());
        self.frames.insert(
            handle.slot(),
            BlockFrame {
                handle,
                state: view.state,
                content: view.markup.to_string(),
                form: view.form.map(str::to_string),
                actions: view.actions.clone(),
                versions: view.versions.clone(),
                commit_on_save: view.commit_on_save,
                busy,
                flash: None,
            },
        );
    }

    fn block(&mut self, handle: WidgetHandle, notice: &str) {
        if let Some(frame) = self.frames.get_mut(&handle.slot()) {
            frame.busy = Some(notice.to_string());
        }
    }

    fn unblock(&mut self, handle: WidgetHandle) {
        if let Some(frame) = self.frames.get_mut(&handle.slot()) {
            frame.busy = None;
        }
    }

    fn flash_invalid(&mut self, handle: WidgetHandle) {
        self.pulses = self.pulses.wrapping_add(1);
        if let Some(frame) = self.frames.get_mut(&handle.slot()) {
            frame.flash = Some(self.pulses);
        }
    }

    fn alert(&mut self, message: &str) {
        alert(message);
    }

    fn remove(&mut self, handle: WidgetHandle) {
        self.frames.remove(&handle.slot());
    }
}
