//! Editable blocks on a page.
//!
//! [`EditablePage`] binds every block to one [`Page`] held in a signal, with a
//! [`DomRenderer`] drawing into per-block frames. Each block component reads
//! its frame and sends user actions back through the page. Requests run on
//! the Dioxus task executor. Field values are read from the live form just
//! before an action runs, so typing never re-renders the form.

use api::{HttpClient, Params, RemoteApi, ServerResponse, TransportError};
use dioxus::prelude::*;
use widget::{Action, Page, Step, WidgetConfig, WidgetHandle, WidgetState, TRANSPORT_ALERT};

use crate::browser_gate::{alert, BrowserGate};
use crate::dom_renderer::DomRenderer;
use crate::version_select::VersionSelect;

const BLOCK_CSS: Asset = asset!("/assets/editable-block.css");

/// Two runs of the `crud-flash` animation.
#[cfg(target_arch = "wasm32")]
const FLASH_MS: u32 = 1200;

/// Every block of one endpoint, in page order, plus an "Add record" button.
#[component]
pub fn EditablePage(endpoint: String, blocks: Vec<(WidgetConfig, String)>) -> Element {
    let page = use_signal(|| Page::new(DomRenderer::new()));
    let client = use_signal(HttpClient::new);
    let order_endpoint = use_signal(|| endpoint.clone());
    let driver = PageDriver {
        page,
        client,
        endpoint: order_endpoint,
    };

    use_hook(move || {
        spawn(async move {
            for (config, markup) in blocks {
                driver.add(config, markup);
            }
        });
    });

    let handles = page.read().handles();

    rsx! {
        document::Link { rel: "stylesheet", href: BLOCK_CSS }
        for handle in handles {
            EditableBlock {
                key: "{handle.slot()}",
                driver,
                slot: handle.slot(),
            }
        }
        button {
            class: "crud-button",
            onclick: move |_| driver.add(WidgetConfig::create(endpoint.clone()), String::new()),
            "Add record"
        }
    }
}

#[component]
fn EditableBlock(driver: PageDriver, slot: usize) -> Element {
    let Some(frame) = driver.page.read().renderer().frame(slot).cloned() else {
        return rsx! {};
    };
    let handle = frame.handle;
    let editing = frame.is_editing();
    let movable = frame.state == WidgetState::Idle && frame.busy.is_none();
    let class = frame.class();
    let content = frame.content.clone();
    let form_id = form_id(slot);

    rsx! {
        div {
            class: "{class}",
            // Mounted for as long as the form exists, so a preview never
            // throws away what the user typed.
            if let Some(form_markup) = frame.form.clone() {
                form {
                    id: "{form_id}",
                    class: "crud-form",
                    hidden: !editing,
                    onsubmit: move |evt: FormEvent| evt.prevent_default(),
                    dangerous_inner_html: "{form_markup}",
                }
            }
            if editing {
                div {
                    class: "crud-history",
                    VersionSelect {
                        menu: frame.versions.clone(),
                        on_select: move |version| driver.perform(handle, Action::SwitchVersion(version)),
                    }
                    label {
                        input {
                            r#type: "checkbox",
                            checked: frame.commit_on_save,
                            onchange: move |evt: FormEvent| driver.set_commit(handle, evt.checked()),
                        }
                        "Save as a new version"
                    }
                }
            } else {
                div {
                    class: "crud-content",
                    dangerous_inner_html: "{content}",
                }
            }
            div {
                class: "crud-actions",
                for action in frame.actions.clone() {
                    button {
                        key: "{action}",
                        class: "crud-button",
                        onclick: move |_| driver.perform(handle, action),
                        {action.label()}
                    }
                }
                if movable {
                    button {
                        class: "crud-button crud-move",
                        onclick: move |_| driver.shift(handle, -1),
                        "Move up"
                    }
                    button {
                        class: "crud-button crud-move",
                        onclick: move |_| driver.shift(handle, 1),
                        "Move down"
                    }
                }
            }
            if let Some(notice) = frame.busy.clone() {
                div { class: "crud-busy", "{notice}" }
            }
        }
    }
}

fn form_id(slot: usize) -> String {
    format!("crud-form-{slot}")
}

/// Copyable access to the page signals, shared by every event handler.
#[derive(Clone, Copy, PartialEq)]
struct PageDriver {
    page: Signal<Page<DomRenderer>>,
    client: Signal<HttpClient>,
    endpoint: Signal<String>,
}

impl PageDriver {
    fn add(mut self, config: WidgetConfig, markup: String) {
        let (handle, step) = self.page.write().bind(config, markup);
        self.follow(handle, step);
    }

    fn perform(mut self, handle: WidgetHandle, action: Action) {
        self.collect_form(handle);
        let result = self.page.write().act(handle, action, &mut BrowserGate);
        match result {
            Ok(step) => self.follow(handle, step),
            Err(error) => tracing::warn!(%action, %error, "widget action rejected"),
        }
    }

    fn set_commit(mut self, handle: WidgetHandle, commit: bool) {
        self.collect_form(handle);
        let mut page = self.page.write();
        if let Ok(Some(form)) = page.form_mut(handle) {
            form.set_commit(commit);
        }
        if let Err(error) = page.refresh(handle) {
            tracing::warn!(%error, "commit toggled on a stale block");
        }
    }

    /// Copy what the user typed into the controller's form.
    fn collect_form(mut self, handle: WidgetHandle) {
        let Some(values) = read_form(&form_id(handle.slot())) else {
            return;
        };
        if let Ok(Some(form)) = self.page.write().form_mut(handle) {
            form.sync(&values);
        }
    }

    /// Move a block and save the new order.
    fn shift(mut self, handle: WidgetHandle, offset: isize) {
        let request = {
            let mut page = self.page.write();
            match page.shift(handle, offset) {
                Ok(true) => page.order_request(&self.endpoint.peek(), &Params::new()),
                Ok(false) => return,
                Err(error) => {
                    tracing::warn!(%error, "move requested for a stale block");
                    return;
                }
            }
        };
        let client = self.client.peek().clone();
        spawn(async move {
            if let Err(error) = client.send(&request).await {
                tracing::warn!(%error, "saving block order failed");
                alert(TRANSPORT_ALERT);
            }
        });
    }

    fn follow(self, handle: WidgetHandle, step: Step) {
        if let Step::Dispatch(request) = step {
            let client = self.client.peek().clone();
            spawn(async move {
                let result = client.send(&request).await;
                self.settle(handle, result);
            });
        }
    }

    fn settle(mut self, handle: WidgetHandle, result: Result<ServerResponse, TransportError>) {
        let outcome = self.page.write().resolve(handle, result);
        match outcome {
            Ok(Some(current)) => {
                let slot = current.slot();
                let pulse = self
                    .page
                    .peek()
                    .renderer()
                    .frame(slot)
                    .and_then(|frame| frame.flash);
                if let Some(pulse) = pulse {
                    self.fade_flash(slot, pulse);
                }
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, "response arrived for a retired widget"),
        }
    }

    /// Drop the invalid highlight once its animation has played.
    fn fade_flash(mut self, slot: usize, pulse: u32) {
        spawn(async move {
            #[cfg(target_arch = "wasm32")]
            gloo_timers::future::TimeoutFuture::new(FLASH_MS).await;
            self.page.write().renderer_mut().end_flash(slot, pulse);
        });
    }
}

/// Current values of the form with DOM id `form_id`, as the browser would
/// submit them.
#[cfg(target_arch = "wasm32")]
fn read_form(form_id: &str) -> Option<widget::FormData> {
    use wasm_bindgen::JsCast;

    let document = web_sys::window()?.document()?;
    let form = document
        .get_element_by_id(form_id)?
        .dyn_into::<web_sys::HtmlFormElement>()
        .ok()?;
    let data = web_sys::FormData::new_with_form(&form).ok()?;

    let mut values = widget::FormData::new();
    for entry in js_sys::try_iter(&data).ok()?? {
        let Ok(pair) = entry.and_then(|e| e.dyn_into::<js_sys::Array>()) else {
            continue;
        };
        // File inputs yield blobs, which are not submitted.
        if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
            values.insert(name, value);
        }
    }
    Some(values)
}

#[cfg(not(target_arch = "wasm32"))]
fn read_form(_form_id: &str) -> Option<widget::FormData> {
    None
}
