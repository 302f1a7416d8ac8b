//! # Widget controller: the editing lifecycle of one content block
//!
//! A [`WidgetController`] owns one block: its display markup, the edit form while
//! editing, the preview while previewing, and the baseline field values used to
//! decide whether leaving the form throws work away.
//!
//! ## States
//!
//! | State | Offers | Entered by |
//! |-------|--------|-----------|
//! | [`Idle`](WidgetState::Idle) | Edit, Delete | construction (update mode), cancel, revert, delete failure |
//! | [`Edit`](WidgetState::Edit) | Preview, Save, Cancel | form fetched, preview left, validation failure |
//! | [`Preview`](WidgetState::Preview) | Apply, Edit, Revert | valid preview |
//! | [`Deleting`](WidgetState::Deleting) | nothing | confirmed delete |
//!
//! ## Driving it
//!
//! The controller does no I/O. An action either completes synchronously
//! ([`Step::Done`], [`Step::Aborted`], [`Step::Removed`]) or hands back the
//! request to send ([`Step::Dispatch`]). From then on the controller is *busy*
//! and rejects every action with [`WidgetError::Busy`] until the caller delivers
//! the outcome to [`resolve`](WidgetController::resolve). Nothing is queued and a
//! sent request cannot be withdrawn. The state field keeps the phase that will
//! be resumed (or rolled back to) when the answer arrives.
//!
//! ## Outcomes
//!
//! - Transport failure: the state rolls back, busy clears, and the caller gets
//!   [`Resolution::Failed`] to alert the user with.
//! - `valid: false`: the returned form replaces the current one, the widget
//!   stays in `Edit` and is flagged invalid ([`Resolution::Invalid`]).
//! - A successful save retires this controller and returns a freshly built
//!   one bound to the saved id ([`Resolution::Replaced`]).
//! - A successful delete retires it for good ([`Resolution::Removed`]).

use std::fmt;

use api::{
    ApiRequest, ResourceId, ServerResponse, TransportError, Verb, VersionEntry, VersionId,
    COMMENT_FIELD, COMMIT_FIELD,
};

use crate::config::WidgetConfig;
use crate::error::WidgetError;
use crate::form::{has_changes, FormData, RenderedForm};
use crate::gate::{
    ConfirmationGate, CANCEL_MESSAGE, COMMIT_PROMPT, DELETE_MESSAGE, REVERT_MESSAGE,
    SWITCH_VERSION_MESSAGE,
};
use crate::history::VersionMenu;

/// Logical phase of a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetState {
    Idle,
    Edit,
    Preview,
    Deleting,
}

impl WidgetState {
    /// State marker class for the block's container.
    pub fn css_class(&self) -> &'static str {
        match self {
            WidgetState::Idle => "crud",
            WidgetState::Edit => "crud crud-active",
            WidgetState::Preview => "crud crud-preview",
            WidgetState::Deleting => "crud crud-deleting",
        }
    }
}

impl fmt::Display for WidgetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WidgetState::Idle => "idle",
            WidgetState::Edit => "editing",
            WidgetState::Preview => "previewing",
            WidgetState::Deleting => "deleting",
        })
    }
}

/// Something the user can ask a widget to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Fetch the form (from idle) or go back to it (from preview).
    Edit,
    Delete,
    Preview,
    Save,
    Cancel,
    /// Save what the preview shows.
    Apply,
    /// Throw the preview and the edit session away.
    Revert,
    /// Load a prior version into the edit form.
    SwitchVersion(VersionId),
}

impl Action {
    /// Button caption.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Edit => "Edit",
            Action::Delete => "Delete",
            Action::Preview => "Preview",
            Action::Save => "Save",
            Action::Cancel => "Cancel",
            Action::Apply => "Apply",
            Action::Revert => "Revert",
            Action::SwitchVersion(_) => "Load version",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SwitchVersion(version) => write!(f, "switch_version({version})"),
            other => f.write_str(&other.label().to_ascii_lowercase()),
        }
    }
}

/// Immediate result of an action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Send this request and pass its outcome to `resolve`. The widget is busy.
    Dispatch(ApiRequest),
    /// A local transition completed.
    Done,
    /// The user declined; nothing changed.
    Aborted,
    /// The widget removed itself (create-mode cancel or revert).
    Removed,
}

/// What a resolved request did to the widget.
#[derive(Debug)]
pub enum Resolution {
    /// The widget moved on in place (form shown, preview shown).
    Updated,
    /// The server rejected the input; the annotated form is showing.
    Invalid,
    /// Saved. This controller is retired; the caller must swap in the new one.
    Replaced(Box<WidgetController>),
    /// Deleted. This controller is retired.
    Removed,
    /// The request failed in transit; the widget rolled back.
    Failed(TransportError),
}

#[derive(Clone, Debug)]
enum Pending {
    FetchForm { version: VersionId },
    Save { fields: FormData },
    Preview { fields: FormData },
    Delete,
}

impl Pending {
    fn notice(&self) -> &'static str {
        match self {
            Pending::FetchForm { .. } => "Retrieving form. Please wait...",
            Pending::Save { .. } => "Saving. Please wait...",
            Pending::Preview { .. } => "Rendering preview. Please wait...",
            Pending::Delete => "Deleting. Please wait...",
        }
    }
}

#[derive(Clone, Debug)]
struct PreviewSnapshot {
    markup: String,
    fields: FormData,
}

/// Everything a renderer needs to draw a widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetView<'a> {
    pub state: WidgetState,
    /// Blocking notice while a request is outstanding.
    pub busy: Option<&'static str>,
    /// Markup to show: the display block, the edit form or the preview.
    pub markup: &'a str,
    /// The edit form while one is open, in `Preview` too. Hosts keep it
    /// mounted under the preview so what the user typed survives going back.
    pub form: Option<&'a str>,
    pub invalid: bool,
    pub actions: Vec<Action>,
    pub versions: VersionMenu,
    pub commit_on_save: bool,
}

/// State machine for one editable block.
#[derive(Debug)]
pub struct WidgetController {
    config: WidgetConfig,
    state: WidgetState,
    pending: Option<Pending>,
    original_markup: String,
    baseline: Option<FormData>,
    form: Option<RenderedForm>,
    preview: Option<PreviewSnapshot>,
    versions: Option<Vec<VersionEntry>>,
    invalid: bool,
    retired: bool,
}

impl WidgetController {
    /// Bind a block showing `markup`. Starts idle.
    pub fn new(config: WidgetConfig, markup: impl Into<String>) -> Self {
        Self {
            config,
            state: WidgetState::Idle,
            pending: None,
            original_markup: markup.into(),
            baseline: None,
            form: None,
            preview: None,
            versions: None,
            invalid: false,
            retired: false,
        }
    }

    /// Bind a block and, in create mode, immediately start editing.
    pub fn open(config: WidgetConfig, markup: impl Into<String>) -> (Self, Step) {
        let mut widget = Self::new(config, markup);
        let step = if widget.config.is_create_mode() && widget.can_edit() {
            widget.edit().unwrap_or(Step::Done)
        } else {
            Step::Done
        };
        (widget, step)
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn id(&self) -> Option<ResourceId> {
        self.config.id
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Replaced or removed; every action now fails.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn original_markup(&self) -> &str {
        &self.original_markup
    }

    /// Field values captured from the first form of the current edit session.
    pub fn baseline(&self) -> Option<&FormData> {
        self.baseline.as_ref()
    }

    pub fn form(&self) -> Option<&RenderedForm> {
        self.form.as_ref()
    }

    /// The edit form, writable only while editing and not busy.
    pub fn form_mut(&mut self) -> Option<&mut RenderedForm> {
        if self.state != WidgetState::Edit || self.is_busy() || self.retired {
            return None;
        }
        self.form.as_mut()
    }

    /// Current field values of the edit form.
    pub fn fields(&self) -> Option<FormData> {
        self.form.as_ref().map(RenderedForm::serialize)
    }

    pub fn preview_markup(&self) -> Option<&str> {
        self.preview.as_ref().map(|p| p.markup.as_str())
    }

    pub fn versions(&self) -> VersionMenu {
        VersionMenu::new(self.versions.as_deref())
    }

    /// Blocking notice for the outstanding request, if any.
    pub fn busy_notice(&self) -> Option<&'static str> {
        self.pending.as_ref().map(Pending::notice)
    }

    /// Actions to offer right now.
    pub fn available_actions(&self) -> Vec<Action> {
        if self.retired || self.is_busy() {
            return Vec::new();
        }
        match self.state {
            WidgetState::Idle => {
                let mut actions = Vec::new();
                if self.can_edit() {
                    actions.push(Action::Edit);
                }
                if self.can_delete() {
                    actions.push(Action::Delete);
                }
                actions
            }
            WidgetState::Edit => vec![Action::Preview, Action::Save, Action::Cancel],
            WidgetState::Preview => vec![Action::Apply, Action::Edit, Action::Revert],
            WidgetState::Deleting => Vec::new(),
        }
    }

    pub fn view(&self) -> WidgetView<'_> {
        let markup = match self.state {
            WidgetState::Edit => self.form.as_ref().map_or("", RenderedForm::markup),
            WidgetState::Preview => self.preview_markup().unwrap_or(""),
            WidgetState::Idle | WidgetState::Deleting => &self.original_markup,
        };
        let form = match self.state {
            WidgetState::Edit | WidgetState::Preview => self.form.as_ref().map(RenderedForm::markup),
            WidgetState::Idle | WidgetState::Deleting => None,
        };
        WidgetView {
            state: self.state,
            busy: self.busy_notice(),
            markup,
            form,
            invalid: self.invalid,
            actions: self.available_actions(),
            versions: self.versions(),
            commit_on_save: self.form.as_ref().is_some_and(RenderedForm::commit),
        }
    }

    /// Run any action by value.
    pub fn perform(
        &mut self,
        action: Action,
        gate: &mut impl ConfirmationGate,
    ) -> Result<Step, WidgetError> {
        match action {
            Action::Edit => self.edit(),
            Action::Delete => self.delete(gate),
            Action::Preview => self.preview(),
            Action::Save => self.save(gate),
            Action::Cancel => self.cancel(gate),
            Action::Apply => self.apply(gate),
            Action::Revert => self.revert(gate),
            Action::SwitchVersion(version) => self.switch_version(version, gate),
        }
    }

    /// Idle: fetch the form. Preview: return to the edit form.
    pub fn edit(&mut self) -> Result<Step, WidgetError> {
        self.guard(Action::Edit, &[WidgetState::Idle, WidgetState::Preview])?;
        if self.state == WidgetState::Preview {
            self.preview = None;
            self.invalid = false;
            self.transition(WidgetState::Edit);
            return Ok(Step::Done);
        }
        if !self.can_edit() {
            return Err(WidgetError::Forbidden {
                action: Action::Edit,
            });
        }
        Ok(self.dispatch(Pending::FetchForm { version: 0 }))
    }

    /// Edit: load `version` into the form. Asks first when there are unsaved
    /// changes. The baseline is kept.
    pub fn switch_version(
        &mut self,
        version: VersionId,
        gate: &mut impl ConfirmationGate,
    ) -> Result<Step, WidgetError> {
        let action = Action::SwitchVersion(version);
        self.guard(action, &[WidgetState::Edit])?;
        if self.config.id.is_none() {
            return Err(WidgetError::Forbidden { action });
        }
        if self.has_unsaved_changes() && !gate.confirm_discard(SWITCH_VERSION_MESSAGE) {
            tracing::debug!(resource_id = ?self.config.id, version, "version switch declined");
            return Ok(Step::Aborted);
        }
        Ok(self.dispatch(Pending::FetchForm { version }))
    }

    /// Edit: send the form. Prompts for a history message when commit-on-save
    /// is ticked.
    pub fn save(&mut self, gate: &mut impl ConfirmationGate) -> Result<Step, WidgetError> {
        self.guard(Action::Save, &[WidgetState::Edit])?;
        let fields = self.fields().unwrap_or_default();
        self.send_save(fields, gate)
    }

    /// Preview: send the fields the preview was rendered from.
    pub fn apply(&mut self, gate: &mut impl ConfirmationGate) -> Result<Step, WidgetError> {
        self.guard(Action::Apply, &[WidgetState::Preview])?;
        let fields = self
            .preview
            .as_ref()
            .map(|p| p.fields.clone())
            .unwrap_or_default();
        self.send_save(fields, gate)
    }

    /// Edit: render the form's current values without persisting them.
    pub fn preview(&mut self) -> Result<Step, WidgetError> {
        self.guard(Action::Preview, &[WidgetState::Edit])?;
        let fields = self.fields().unwrap_or_default();
        Ok(self.dispatch(Pending::Preview { fields }))
    }

    /// Edit: leave the form, asking first if anything changed.
    pub fn cancel(&mut self, gate: &mut impl ConfirmationGate) -> Result<Step, WidgetError> {
        self.guard(Action::Cancel, &[WidgetState::Edit])?;
        if self.has_unsaved_changes() && !gate.confirm_discard(CANCEL_MESSAGE) {
            tracing::debug!(resource_id = ?self.config.id, "cancel declined");
            return Ok(Step::Aborted);
        }
        Ok(self.discard_session())
    }

    /// Preview: drop the preview and the edit session, asking first if the
    /// previewed values differ from the baseline.
    pub fn revert(&mut self, gate: &mut impl ConfirmationGate) -> Result<Step, WidgetError> {
        self.guard(Action::Revert, &[WidgetState::Preview])?;
        let changed = match &self.preview {
            Some(preview) => self.differs_from_baseline(&preview.fields),
            None => false,
        };
        if changed && !gate.confirm_discard(REVERT_MESSAGE) {
            tracing::debug!(resource_id = ?self.config.id, "revert declined");
            return Ok(Step::Aborted);
        }
        Ok(self.discard_session())
    }

    /// Idle: delete the resource after an unconditional confirmation.
    pub fn delete(&mut self, gate: &mut impl ConfirmationGate) -> Result<Step, WidgetError> {
        self.guard(Action::Delete, &[WidgetState::Idle])?;
        if !self.can_delete() {
            return Err(WidgetError::Forbidden {
                action: Action::Delete,
            });
        }
        if !gate.confirm_discard(DELETE_MESSAGE) {
            tracing::debug!(resource_id = ?self.config.id, "delete declined");
            return Ok(Step::Aborted);
        }
        let step = self.dispatch(Pending::Delete);
        self.transition(WidgetState::Deleting);
        Ok(step)
    }

    /// Deliver the outcome of the outstanding request.
    pub fn resolve(
        &mut self,
        result: Result<ServerResponse, TransportError>,
    ) -> Result<Resolution, WidgetError> {
        if self.retired {
            return Err(WidgetError::Retired);
        }
        let pending = self.pending.take().ok_or(WidgetError::NothingPending)?;

        let response = match result {
            Ok(response) => response,
            Err(error) => return Ok(self.fail(pending, error)),
        };

        let resolution = match pending {
            Pending::FetchForm { version } => self.on_form(version, response),
            Pending::Save { fields } => self.on_save(fields, response),
            Pending::Preview { fields } => self.on_preview(fields, response),
            Pending::Delete => {
                self.retired = true;
                tracing::info!(resource_id = ?self.config.id, "widget deleted");
                Resolution::Removed
            }
        };
        Ok(resolution)
    }

    fn on_form(&mut self, version: VersionId, response: ServerResponse) -> Resolution {
        let Some(markup) = response.form else {
            let pending = Pending::FetchForm { version };
            return self.fail(pending, TransportError::missing(Verb::GetForm, "form"));
        };
        let form = RenderedForm::new(markup);
        if self.baseline.is_none() {
            self.baseline = Some(form.serialize());
        }
        if response.versions.is_some() {
            self.versions = response.versions;
        }
        self.form = Some(form);
        self.invalid = false;
        self.transition(WidgetState::Edit);
        Resolution::Updated
    }

    fn on_save(&mut self, fields: FormData, response: ServerResponse) -> Resolution {
        if !response.is_valid() {
            return self.on_invalid(Pending::Save { fields }, Verb::Save, response);
        }
        let Some(html) = response.html else {
            let pending = Pending::Save { fields };
            return self.fail(pending, TransportError::missing(Verb::Save, "html"));
        };
        if response.id.is_none() && self.config.id.is_none() {
            tracing::warn!("save accepted without an id; replacement stays in create mode");
        }

        let config = self.config.rebound(response.id);
        self.retired = true;
        self.preview = None;
        self.form = None;
        tracing::info!(
            old_id = ?self.config.id,
            new_id = ?config.id,
            "widget saved; replacing instance"
        );
        Resolution::Replaced(Box::new(WidgetController::new(config, html)))
    }

    fn on_preview(&mut self, fields: FormData, response: ServerResponse) -> Resolution {
        if !response.is_valid() {
            return self.on_invalid(Pending::Preview { fields }, Verb::Preview, response);
        }
        let Some(markup) = response.html else {
            let pending = Pending::Preview { fields };
            return self.fail(pending, TransportError::missing(Verb::Preview, "html"));
        };
        self.preview = Some(PreviewSnapshot { markup, fields });
        self.transition(WidgetState::Preview);
        Resolution::Updated
    }

    fn on_invalid(&mut self, pending: Pending, verb: Verb, response: ServerResponse) -> Resolution {
        let Some(markup) = response.form else {
            return self.fail(pending, TransportError::missing(verb, "form"));
        };
        self.form = Some(RenderedForm::new(markup));
        self.preview = None;
        self.invalid = true;
        self.transition(WidgetState::Edit);
        tracing::debug!(resource_id = ?self.config.id, %verb, "server rejected input");
        Resolution::Invalid
    }

    fn fail(&mut self, pending: Pending, error: TransportError) -> Resolution {
        tracing::warn!(resource_id = ?self.config.id, error = %error, "widget request failed");
        if let Pending::Delete = pending {
            self.transition(WidgetState::Idle);
        }
        Resolution::Failed(error)
    }

    fn send_save(
        &mut self,
        mut fields: FormData,
        gate: &mut impl ConfirmationGate,
    ) -> Result<Step, WidgetError> {
        if fields.contains_key(COMMIT_FIELD) {
            match gate.prompt_text(COMMIT_PROMPT) {
                Some(message) if !message.trim().is_empty() => {
                    fields.insert(COMMENT_FIELD.to_string(), message);
                }
                _ => {
                    tracing::debug!(resource_id = ?self.config.id, "commit message declined");
                    return Ok(Step::Aborted);
                }
            }
        }
        Ok(self.dispatch(Pending::Save { fields }))
    }

    fn dispatch(&mut self, pending: Pending) -> Step {
        let endpoint = &self.config.endpoint;
        let extra = &self.config.extra_context;
        let id = self.config.id;
        let request = match &pending {
            Pending::FetchForm { version } => ApiRequest::get_form(endpoint, id, *version, extra),
            Pending::Save { fields } => ApiRequest::save(endpoint, id, fields.clone(), extra),
            Pending::Preview { fields } => {
                ApiRequest::preview(endpoint, id, fields.clone(), extra)
            }
            Pending::Delete => ApiRequest::delete(endpoint, id.unwrap_or(0), extra),
        };
        tracing::debug!(resource_id = ?id, verb = %request.verb, "widget request dispatched");
        self.invalid = false;
        self.pending = Some(pending);
        Step::Dispatch(request)
    }

    fn discard_session(&mut self) -> Step {
        self.form = None;
        self.preview = None;
        self.baseline = None;
        self.invalid = false;
        if self.config.is_create_mode() {
            self.retired = true;
            tracing::info!("unsaved widget discarded");
            return Step::Removed;
        }
        self.transition(WidgetState::Idle);
        Step::Done
    }

    fn guard(&self, action: Action, allowed: &[WidgetState]) -> Result<(), WidgetError> {
        if self.retired {
            return Err(WidgetError::Retired);
        }
        if self.is_busy() {
            return Err(WidgetError::Busy { action });
        }
        if !allowed.contains(&self.state) {
            return Err(WidgetError::IllegalTransition {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    fn transition(&mut self, to: WidgetState) {
        if self.state != to {
            tracing::debug!(resource_id = ?self.config.id, from = %self.state, to = %to, "widget transition");
        }
        self.state = to;
    }

    fn can_edit(&self) -> bool {
        let permissions = &self.config.permissions;
        if self.config.is_create_mode() {
            permissions.allow_create
        } else {
            permissions.allow_update
        }
    }

    fn can_delete(&self) -> bool {
        self.config.id.is_some() && self.config.permissions.allow_delete
    }

    fn has_unsaved_changes(&self) -> bool {
        match self.fields() {
            Some(fields) => self.differs_from_baseline(&fields),
            None => false,
        }
    }

    fn differs_from_baseline(&self, fields: &FormData) -> bool {
        match &self.baseline {
            Some(baseline) => has_changes(fields, baseline),
            None => !fields.is_empty(),
        }
    }
}
