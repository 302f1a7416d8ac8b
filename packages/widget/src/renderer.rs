//! Presentation hooks.
//!
//! A [`crate::Page`] tells its [`Renderer`] what to draw after every change
//! and leaves the drawing itself to the host: a DOM, a terminal, or the
//! [`RecordingRenderer`] the tests use.

use crate::controller::{WidgetState, WidgetView};
use crate::page::WidgetHandle;

pub trait Renderer {
    /// Redraw the widget from its current view.
    fn render(&mut self, handle: WidgetHandle, view: &WidgetView<'_>);

    /// Cover the widget with a blocking notice.
    fn block(&mut self, handle: WidgetHandle, notice: &str);

    fn unblock(&mut self, handle: WidgetHandle);

    /// Draw attention to a form the server rejected.
    fn flash_invalid(&mut self, handle: WidgetHandle);

    /// Page-level alert, used for transport failures.
    fn alert(&mut self, message: &str);

    /// Take the widget's markup off the page.
    fn remove(&mut self, handle: WidgetHandle);
}

/// Something a [`RecordingRenderer`] was told to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderEvent {
    Render {
        handle: WidgetHandle,
        state: WidgetState,
        markup: String,
    },
    Block {
        handle: WidgetHandle,
        notice: String,
    },
    Unblock(WidgetHandle),
    FlashInvalid(WidgetHandle),
    Alert(String),
    Remove(WidgetHandle),
}

/// Keeps every call in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    events: Vec<RenderEvent>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RenderEvent] {
        &self.events
    }

    pub fn alerts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Alert(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Markup of the most recent render of `handle`.
    pub fn last_markup(&self, handle: WidgetHandle) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            RenderEvent::Render {
                handle: h, markup, ..
            } if *h == handle => Some(markup.as_str()),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, handle: WidgetHandle, view: &WidgetView<'_>) {
        self.events.push(RenderEvent::Render {
            handle,
            state: view.state,
            markup: view.markup.to_string(),
        });
    }

    fn block(&mut self, handle: WidgetHandle, notice: &str) {
        self.events.push(RenderEvent::Block {
            handle,
            notice: notice.to_string(),
        });
    }

    fn unblock(&mut self, handle: WidgetHandle) {
        self.events.push(RenderEvent::Unblock(handle));
    }

    fn flash_invalid(&mut self, handle: WidgetHandle) {
        self.events.push(RenderEvent::FlashInvalid(handle));
    }

    fn alert(&mut self, message: &str) {
        self.events.push(RenderEvent::Alert(message.to_string()));
    }

    fn remove(&mut self, handle: WidgetHandle) {
        self.events.push(RenderEvent::Remove(handle));
    }
}
