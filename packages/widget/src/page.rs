//! # Page: the set of widgets bound on one page
//!
//! [`Page`] owns every [`WidgetController`] on the page and addresses them
//! through [`WidgetHandle`]s. It forwards actions, shows and clears the busy
//! notice, and swaps in the fresh controller a save produces. It also keeps
//! the on-page order that [`Page::order_request`] sends to the server.
//!
//! A handle names a slot plus the generation of the widget living there. A
//! save keeps the slot and bumps the generation, so handles taken before the
//! save go stale and stop working: any lingering event listener on the old
//! block fails with [`WidgetError::StaleHandle`] instead of acting on the new
//! one.

use api::{ApiRequest, Params, RemoteApi, ServerResponse, TransportError};

use crate::config::WidgetConfig;
use crate::controller::{Action, Resolution, Step, WidgetController};
use crate::error::WidgetError;
use crate::form::RenderedForm;
use crate::gate::{ConfirmationGate, TRANSPORT_ALERT};
use crate::renderer::Renderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetHandle {
    slot: usize,
    generation: u32,
}

impl WidgetHandle {
    /// Position on the page, stable across saves.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    widget: WidgetController,
}

pub struct Page<R: Renderer> {
    renderer: R,
    slots: Vec<Option<Slot>>,
    /// Slots in on-page order.
    order: Vec<usize>,
}

impl<R: Renderer> Page<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            slots: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Bind a block. Create-mode blocks start fetching their form at once;
    /// the returned step says what to send.
    pub fn bind(&mut self, config: WidgetConfig, markup: impl Into<String>) -> (WidgetHandle, Step) {
        let (widget, step) = WidgetController::open(config, markup);
        let handle = WidgetHandle {
            slot: self.slots.len(),
            generation: 0,
        };
        self.slots.push(Some(Slot {
            generation: 0,
            widget,
        }));
        self.order.push(handle.slot);
        self.render(handle);
        if let Step::Dispatch(_) = step {
            self.block(handle);
        }
        (handle, step)
    }

    pub fn widget(&self, handle: WidgetHandle) -> Result<&WidgetController, WidgetError> {
        match self.slots.get(handle.slot) {
            Some(Some(slot)) if slot.generation == handle.generation => Ok(&slot.widget),
            _ => Err(WidgetError::StaleHandle),
        }
    }

    fn widget_mut(&mut self, handle: WidgetHandle) -> Result<&mut WidgetController, WidgetError> {
        match self.slots.get_mut(handle.slot) {
            Some(Some(slot)) if slot.generation == handle.generation => Ok(&mut slot.widget),
            _ => Err(WidgetError::StaleHandle),
        }
    }

    /// Live widgets in page order.
    pub fn handles(&self) -> Vec<WidgetHandle> {
        self.order
            .iter()
            .filter_map(|&slot| {
                let entry = self.slots.get(slot)?.as_ref()?;
                Some(WidgetHandle {
                    slot,
                    generation: entry.generation,
                })
            })
            .collect()
    }

    /// Move a widget `offset` places up (negative) or down the page, stopping
    /// at either end. Returns whether it moved. Handles stay valid.
    pub fn shift(&mut self, handle: WidgetHandle, offset: isize) -> Result<bool, WidgetError> {
        self.widget(handle)?;
        let Some(from) = self.order.iter().position(|&slot| slot == handle.slot) else {
            return Err(WidgetError::StaleHandle);
        };
        let last = self.order.len() - 1;
        let to = from.saturating_add_signed(offset).min(last);
        if to == from {
            return Ok(false);
        }
        let slot = self.order.remove(from);
        self.order.insert(to, slot);
        tracing::debug!(slot, from, to, "widget moved");
        Ok(true)
    }

    /// The edit form of a widget that is editing and idle, for applying user
    /// input. Callers should [`refresh`](Self::refresh) afterwards.
    pub fn form_mut(&mut self, handle: WidgetHandle) -> Result<Option<&mut RenderedForm>, WidgetError> {
        Ok(self.widget_mut(handle)?.form_mut())
    }

    /// Redraw one widget.
    pub fn refresh(&mut self, handle: WidgetHandle) -> Result<(), WidgetError> {
        self.widget(handle)?;
        self.render(handle);
        Ok(())
    }

    /// Run an action. A dispatched request leaves the widget blocked until
    /// [`resolve`](Self::resolve) is called for it.
    pub fn act(
        &mut self,
        handle: WidgetHandle,
        action: Action,
        gate: &mut impl ConfirmationGate,
    ) -> Result<Step, WidgetError> {
        let step = self.widget_mut(handle)?.perform(action, gate)?;
        match &step {
            Step::Dispatch(_) => {
                self.render(handle);
                self.block(handle);
            }
            Step::Done => self.render(handle),
            Step::Removed => self.remove(handle),
            Step::Aborted => {}
        }
        Ok(step)
    }

    /// Deliver a request outcome. Returns the handle now addressing the
    /// widget (new after a save), or `None` if it left the page.
    pub fn resolve(
        &mut self,
        handle: WidgetHandle,
        result: Result<ServerResponse, TransportError>,
    ) -> Result<Option<WidgetHandle>, WidgetError> {
        let resolution = self.widget_mut(handle)?.resolve(result)?;
        self.renderer.unblock(handle);
        match resolution {
            Resolution::Updated => {
                self.render(handle);
                Ok(Some(handle))
            }
            Resolution::Invalid => {
                self.render(handle);
                self.renderer.flash_invalid(handle);
                Ok(Some(handle))
            }
            Resolution::Failed(error) => {
                tracing::debug!(slot = handle.slot, %error, "alerting transport failure");
                self.render(handle);
                self.renderer.alert(TRANSPORT_ALERT);
                Ok(Some(handle))
            }
            Resolution::Removed => {
                self.remove(handle);
                Ok(None)
            }
            Resolution::Replaced(widget) => {
                let next = WidgetHandle {
                    slot: handle.slot,
                    generation: handle.generation.wrapping_add(1),
                };
                self.slots[handle.slot] = Some(Slot {
                    generation: next.generation,
                    widget: *widget,
                });
                self.render(next);
                Ok(Some(next))
            }
        }
    }

    /// Perform an action and, if it needs the server, wait for the answer.
    pub async fn run(
        &mut self,
        api: &impl RemoteApi,
        gate: &mut impl ConfirmationGate,
        handle: WidgetHandle,
        action: Action,
    ) -> Result<Option<WidgetHandle>, WidgetError> {
        match self.act(handle, action, gate)? {
            Step::Dispatch(request) => {
                let result = api.send(&request).await;
                self.resolve(handle, result)
            }
            Step::Removed => Ok(None),
            Step::Done | Step::Aborted => Ok(Some(handle)),
        }
    }

    /// Bind a block and drive its initial form fetch, if any.
    pub async fn open(
        &mut self,
        api: &impl RemoteApi,
        config: WidgetConfig,
        markup: impl Into<String>,
    ) -> Result<WidgetHandle, WidgetError> {
        let (handle, step) = self.bind(config, markup);
        if let Step::Dispatch(request) = step {
            let result = api.send(&request).await;
            self.resolve(handle, result)?;
        }
        Ok(handle)
    }

    /// Request persisting the current on-page order of saved widgets.
    pub fn order_request(&self, endpoint: &str, extra: &Params) -> ApiRequest {
        let ids: Vec<_> = self
            .order
            .iter()
            .filter_map(|&slot| self.slots.get(slot)?.as_ref()?.widget.id())
            .collect();
        ApiRequest::order(endpoint, &ids, extra)
    }

    fn render(&mut self, handle: WidgetHandle) {
        if let Some(Some(slot)) = self.slots.get(handle.slot) {
            self.renderer.render(handle, &slot.widget.view());
        }
    }

    fn block(&mut self, handle: WidgetHandle) {
        if let Some(Some(slot)) = self.slots.get(handle.slot) {
            if let Some(notice) = slot.widget.busy_notice() {
                self.renderer.block(handle, notice);
            }
        }
    }

    fn remove(&mut self, handle: WidgetHandle) {
        if let Some(entry) = self.slots.get_mut(handle.slot) {
            *entry = None;
        }
        self.order.retain(|&slot| slot != handle.slot);
        self.renderer.remove(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::WidgetState;
    use crate::gate::ScriptedGate;
    use crate::renderer::{RecordingRenderer, RenderEvent};
    use api::{FieldSpec, MemoryBackend, Verb};

    fn backend() -> MemoryBackend {
        MemoryBackend::new(vec![
            FieldSpec::text("title", "Title").required(),
            FieldSpec::textarea("body", "Body"),
        ])
    }

    fn page_with(backend: &MemoryBackend, id: u64) -> (Page<RecordingRenderer>, WidgetHandle) {
        let mut page = Page::new(RecordingRenderer::new());
        let markup = backend.render(id).unwrap();
        let (handle, step) = page.bind(WidgetConfig::update("/api/posts", id), markup);
        assert_eq!(step, Step::Done);
        (page, handle)
    }

    #[tokio::test]
    async fn test_edit_and_save_replaces_widget() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello"), ("body", "First post")]);
        let (mut page, handle) = page_with(&backend, id);
        let mut gate = ScriptedGate::new();

        let same = page.run(&backend, &mut gate, handle, Action::Edit).await.unwrap();
        assert_eq!(same, Some(handle));
        assert_eq!(page.widget(handle).unwrap().state(), WidgetState::Edit);

        page.form_mut(handle).unwrap().unwrap().set_field("title", "World");
        let next = page
            .run(&backend, &mut gate, handle, Action::Save)
            .await
            .unwrap()
            .unwrap();

        assert_ne!(next, handle);
        assert_eq!(next.slot(), handle.slot());
        assert_eq!(backend.get(id).unwrap()["title"], "World");
        assert_eq!(backend.get(id).unwrap()["body"], "First post");
        assert_eq!(page.widget(handle).unwrap_err(), WidgetError::StaleHandle);

        let widget = page.widget(next).unwrap();
        assert_eq!(widget.state(), WidgetState::Idle);
        assert_eq!(widget.id(), Some(id));
        assert!(page.renderer().last_markup(next).unwrap().contains("World"));
        assert!(gate.asked().is_empty());
    }

    #[tokio::test]
    async fn test_busy_notice_wraps_request() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello")]);
        let (mut page, handle) = page_with(&backend, id);
        let mut gate = ScriptedGate::new();

        let Step::Dispatch(request) = page.act(handle, Action::Edit, &mut gate).unwrap() else {
            panic!("expected a dispatch");
        };
        assert_eq!(
            page.renderer().events().last(),
            Some(&RenderEvent::Block {
                handle,
                notice: "Retrieving form. Please wait...".to_string(),
            })
        );
        assert_eq!(
            page.act(handle, Action::Edit, &mut gate),
            Err(WidgetError::Busy {
                action: Action::Edit
            })
        );

        let result = backend.send(&request).await;
        page.resolve(handle, result).unwrap();
        assert!(page
            .renderer()
            .events()
            .contains(&RenderEvent::Unblock(handle)));
    }

    #[tokio::test]
    async fn test_transport_failure_alerts_and_rolls_back() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello")]);
        let (mut page, handle) = page_with(&backend, id);
        backend.set_offline(true);

        let kept = page
            .run(&backend, &mut ScriptedGate::new(), handle, Action::Edit)
            .await
            .unwrap();
        assert_eq!(kept, Some(handle));
        assert_eq!(page.renderer().alerts(), vec![TRANSPORT_ALERT]);

        let widget = page.widget(handle).unwrap();
        assert_eq!(widget.state(), WidgetState::Idle);
        assert!(!widget.is_busy());
    }

    #[tokio::test]
    async fn test_invalid_save_flashes_form() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello")]);
        let (mut page, handle) = page_with(&backend, id);
        let mut gate = ScriptedGate::new();

        page.run(&backend, &mut gate, handle, Action::Edit).await.unwrap();
        page.form_mut(handle).unwrap().unwrap().set_field("title", "");
        let kept = page.run(&backend, &mut gate, handle, Action::Save).await.unwrap();

        assert_eq!(kept, Some(handle));
        assert!(page
            .renderer()
            .events()
            .contains(&RenderEvent::FlashInvalid(handle)));
        let widget = page.widget(handle).unwrap();
        assert!(widget.is_invalid());
        assert!(widget.view().markup.contains("class=\"error\""));
        assert_eq!(backend.get(id).unwrap()["title"], "Hello");
    }

    #[tokio::test]
    async fn test_unsaved_block_cancels_off_the_page() {
        let backend = backend();
        let mut page = Page::new(RecordingRenderer::new());
        let handle = page
            .open(&backend, WidgetConfig::create("/api/posts"), "")
            .await
            .unwrap();
        assert_eq!(page.widget(handle).unwrap().state(), WidgetState::Edit);

        let gone = page
            .run(&backend, &mut ScriptedGate::new(), handle, Action::Cancel)
            .await
            .unwrap();
        assert_eq!(gone, None);
        assert!(page.handles().is_empty());
        assert_eq!(
            page.renderer().events().last(),
            Some(&RenderEvent::Remove(handle))
        );
        assert!(backend.ids().is_empty());
    }

    #[tokio::test]
    async fn test_create_mode_save_persists_record() {
        let backend = backend();
        let mut page = Page::new(RecordingRenderer::new());
        let handle = page
            .open(&backend, WidgetConfig::create("/api/posts"), "")
            .await
            .unwrap();

        page.form_mut(handle).unwrap().unwrap().set_field("title", "New");
        let next = page
            .run(&backend, &mut ScriptedGate::new(), handle, Action::Save)
            .await
            .unwrap()
            .unwrap();

        let id = page.widget(next).unwrap().id().unwrap();
        assert_eq!(backend.ids(), vec![id]);
        assert_eq!(backend.get(id).unwrap()["title"], "New");
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_widget() {
        let backend = backend();
        let id = backend.insert(&[("title", "Doomed")]);
        let (mut page, handle) = page_with(&backend, id);
        let mut gate = ScriptedGate::new().confirming(true);

        let gone = page.run(&backend, &mut gate, handle, Action::Delete).await.unwrap();
        assert_eq!(gone, None);
        assert!(backend.get(id).is_none());
        assert_eq!(page.widget(handle).unwrap_err(), WidgetError::StaleHandle);
        assert_eq!(backend.requests_for(Verb::Delete).len(), 1);
    }

    #[tokio::test]
    async fn test_committed_versions_can_be_loaded() {
        let backend = backend().with_history();
        let id = backend.insert(&[("title", "Hello")]);
        let (mut page, handle) = page_with(&backend, id);

        page.run(&backend, &mut ScriptedGate::new(), handle, Action::Edit)
            .await
            .unwrap();
        let form = page.form_mut(handle).unwrap().unwrap();
        form.set_field("title", "Draft one");
        form.set_commit(true);
        let mut gate = ScriptedGate::new().answering(Some("first draft"));
        let handle = page
            .run(&backend, &mut gate, handle, Action::Save)
            .await
            .unwrap()
            .unwrap();

        let mut gate = ScriptedGate::new();
        page.run(&backend, &mut gate, handle, Action::Edit).await.unwrap();
        page.form_mut(handle).unwrap().unwrap().set_field("title", "Second");
        let handle = page
            .run(&backend, &mut gate, handle, Action::Save)
            .await
            .unwrap()
            .unwrap();

        page.run(&backend, &mut gate, handle, Action::Edit).await.unwrap();
        let menu = page.widget(handle).unwrap().versions();
        assert!(menu.is_enabled());
        assert_eq!(menu.options()[1].label(), "first draft");
        let version = menu.select(1).unwrap();

        page.run(&backend, &mut gate, handle, Action::SwitchVersion(version))
            .await
            .unwrap();
        let widget = page.widget(handle).unwrap();
        assert_eq!(widget.fields().unwrap()["title"], "Draft one");
        assert_eq!(widget.baseline().unwrap()["title"], "Second");
        assert!(gate.asked().is_empty());
    }

    #[tokio::test]
    async fn test_order_request_skips_unsaved_blocks() {
        let backend = backend();
        let first = backend.insert(&[("title", "A")]);
        let second = backend.insert(&[("title", "B")]);

        let mut page = Page::new(RecordingRenderer::new());
        page.bind(WidgetConfig::update("/api/posts", second), "<div>B</div>");
        page.bind(WidgetConfig::create("/api/posts"), "");
        page.bind(WidgetConfig::update("/api/posts", first), "<div>A</div>");

        let request = page.order_request("/api/posts", &Params::new());
        assert_eq!(request.verb, Verb::Order);
        assert_eq!(request.param("order"), Some(format!("{second},{first}").as_str()));
        assert_eq!(request.resource_id(), None);

        backend.send(&request).await.unwrap();
        assert_eq!(backend.ids(), vec![second, first]);
    }

    #[tokio::test]
    async fn test_shifted_blocks_persist_new_order() {
        let backend = backend();
        let a = backend.insert(&[("title", "A")]);
        let b = backend.insert(&[("title", "B")]);
        let c = backend.insert(&[("title", "C")]);

        let mut page = Page::new(RecordingRenderer::new());
        let handles: Vec<_> = [a, b, c]
            .into_iter()
            .map(|id| page.bind(WidgetConfig::update("/api/posts", id), "<div/>").0)
            .collect();

        assert_eq!(page.shift(handles[2], -1), Ok(true));
        assert_eq!(page.shift(handles[0], -1), Ok(false));
        assert_eq!(page.shift(handles[0], 10), Ok(true));
        assert_eq!(page.handles(), vec![handles[1], handles[2], handles[0]]);

        // Moving a block does not disturb its handle or its widget.
        assert_eq!(page.widget(handles[0]).unwrap().id(), Some(a));

        let request = page.order_request("/api/posts", &Params::new());
        backend.send(&request).await.unwrap();
        assert_eq!(backend.ids(), vec![b, c, a]);

        let gone = page
            .run(
                &backend,
                &mut ScriptedGate::new().confirming(true),
                handles[2],
                Action::Delete,
            )
            .await
            .unwrap();
        assert_eq!(gone, None);
        assert_eq!(page.handles(), vec![handles[1], handles[0]]);
        assert_eq!(page.shift(handles[2], 1), Err(WidgetError::StaleHandle));
    }
}
