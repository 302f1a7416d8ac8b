//! # Form serialization
//!
//! The edit form is server-supplied markup that the widget treats as opaque,
//! except for one question: which named controls does it contain and what are
//! their values right now? [`controls`] answers the first half by scanning the
//! markup; [`RenderedForm`] layers the user's edits on top and produces a fresh
//! [`FormData`] snapshot every time [`RenderedForm::serialize`] is called.
//!
//! Serialization follows what a browser submits:
//!
//! - `input`, `textarea` and `select` elements with a `name` are controls;
//! - disabled controls and `submit`/`button`/`reset`/`image`/`file` inputs are skipped;
//! - checkboxes and radios contribute only when checked (value defaults to `on`);
//! - a `select` yields its selected option, or its first option when none is
//!   selected; an option without a `value` contributes its text;
//! - values are taken verbatim after entity decoding, with no type coercion;
//! - when a name repeats, the last control wins.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use api::COMMIT_FIELD;
use regex::Regex;

/// Field name → current value, as sent to the server.
pub type FormData = api::Params;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(/?)(input|textarea|select)\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap()
});

static OPTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<option\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap()
});

static ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([^\s=/"'>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).unwrap()
});

static TEXTAREA_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</textarea\s*>").unwrap());

static SELECT_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</select\s*>").unwrap());

/// What sort of control a name belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    TextArea,
    Select,
    /// Checkbox or radio; submits its value only when checked.
    Toggle,
}

/// A named control found in form markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Control {
    pub name: String,
    pub kind: ControlKind,
    /// Initial value; `None` when the control submits nothing (unchecked toggle).
    pub value: Option<String>,
}

/// Scan markup for the named, enabled controls it contains, in document order.
pub fn controls(markup: &str) -> Vec<Control> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(caps) = TAG_REGEX.captures_at(markup, pos) {
        let Some(whole) = caps.get(0) else { break };
        pos = whole.end();
        if !caps[1].is_empty() {
            continue;
        }

        let tag = caps[2].to_ascii_lowercase();
        let attrs = Attrs::parse(&caps[3]);

        let body = match tag.as_str() {
            "textarea" => {
                let (inner, next) = inner_until(markup, pos, &TEXTAREA_END);
                pos = next;
                Some(inner)
            }
            "select" => {
                let (inner, next) = inner_until(markup, pos, &SELECT_END);
                pos = next;
                Some(inner)
            }
            _ => None,
        };

        let Some(name) = attrs.get("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if attrs.has("disabled") {
            continue;
        }

        let control = match tag.as_str() {
            "input" => input_control(name, &attrs),
            "textarea" => {
                let text = body.unwrap_or_default();
                // Browsers drop a single leading newline right after <textarea>.
                let text = text.strip_prefix('\n').unwrap_or(text);
                Some(Control {
                    name: name.to_string(),
                    kind: ControlKind::TextArea,
                    value: Some(decode_entities(text)),
                })
            }
            _ => Some(Control {
                name: name.to_string(),
                kind: ControlKind::Select,
                value: selected_option(body.unwrap_or_default(), attrs.has("multiple")),
            }),
        };
        found.extend(control);
    }

    found
}

/// Serialize markup as-is, with nothing edited.
pub fn serialize_markup(markup: &str) -> FormData {
    let mut data = FormData::new();
    for control in controls(markup) {
        if let Some(value) = control.value {
            data.insert(control.name, value);
        }
    }
    data
}

/// True when any key of `current` differs from `baseline`. Keys the baseline
/// never saw count as changes.
pub fn has_changes(current: &FormData, baseline: &FormData) -> bool {
    current
        .iter()
        .any(|(key, value)| baseline.get(key) != Some(value))
}

/// The edit form as currently rendered: server markup plus the user's edits
/// and the widget's own commit-on-save checkbox.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedForm {
    markup: String,
    /// Per-name edits; `None` means "submits nothing" (an unchecked toggle).
    overrides: BTreeMap<String, Option<String>>,
    commit: bool,
}

impl RenderedForm {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            ..Self::default()
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Record a user edit. Returns false when the form has no such control.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        if !self.has_control(name) {
            return false;
        }
        self.overrides.insert(name.to_string(), Some(value.into()));
        true
    }

    /// Make a control submit nothing, as unchecking a checkbox does.
    pub fn unset_field(&mut self, name: &str) -> bool {
        if !self.has_control(name) {
            return false;
        }
        self.overrides.insert(name.to_string(), None);
        true
    }

    /// Adopt a complete value snapshot taken from a live form. Controls missing
    /// from `values` are treated as submitting nothing.
    pub fn sync(&mut self, values: &FormData) {
        for control in controls(&self.markup) {
            let value = values.get(&control.name).cloned();
            self.overrides.insert(control.name, value);
        }
    }

    pub fn commit(&self) -> bool {
        self.commit
    }

    pub fn set_commit(&mut self, commit: bool) {
        self.commit = commit;
    }

    /// Current field values. Recomputed from the markup on every call.
    pub fn serialize(&self) -> FormData {
        let mut data = FormData::new();
        for control in controls(&self.markup) {
            match self.overrides.get(&control.name) {
                Some(Some(edited)) => {
                    data.insert(control.name, edited.clone());
                }
                Some(None) => {
                    data.remove(&control.name);
                }
                None => {
                    if let Some(value) = control.value {
                        data.insert(control.name, value);
                    }
                }
            }
        }
        if self.commit {
            data.insert(COMMIT_FIELD.to_string(), "on".to_string());
        }
        data
    }

    fn has_control(&self, name: &str) -> bool {
        controls(&self.markup).iter().any(|c| c.name == name)
    }
}

fn input_control(name: &str, attrs: &Attrs) -> Option<Control> {
    let kind = attrs
        .get("type")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string());
    match kind.as_str() {
        "submit" | "button" | "reset" | "image" | "file" => None,
        "checkbox" | "radio" => {
            let value = attrs
                .has("checked")
                .then(|| attrs.get("value").unwrap_or("on").to_string());
            Some(Control {
                name: name.to_string(),
                kind: ControlKind::Toggle,
                value,
            })
        }
        _ => Some(Control {
            name: name.to_string(),
            kind: ControlKind::Text,
            value: Some(attrs.get("value").unwrap_or("").to_string()),
        }),
    }
}

fn selected_option(inner: &str, multiple: bool) -> Option<String> {
    let mut first = None;
    let mut selected = None;
    for caps in OPTION_REGEX.captures_iter(inner) {
        let Some(whole) = caps.get(0) else { continue };
        let attrs = Attrs::parse(&caps[1]);
        if attrs.has("disabled") {
            continue;
        }
        let value = match attrs.get("value") {
            Some(value) => value.to_string(),
            None => {
                let rest = &inner[whole.end()..];
                let text = rest.find('<').map_or(rest, |end| &rest[..end]);
                decode_entities(text.trim())
            }
        };
        if first.is_none() {
            first = Some(value.clone());
        }
        if attrs.has("selected") {
            selected = Some(value);
        }
    }
    if multiple {
        selected
    } else {
        selected.or(first)
    }
}

/// Text between `start` and the closing tag matched by `end`, plus the offset
/// just past that closing tag. An unclosed element runs to the end.
fn inner_until<'a>(markup: &'a str, start: usize, end: &Regex) -> (&'a str, usize) {
    match end.find_at(markup, start) {
        Some(close) => (&markup[start..close.start()], close.end()),
        None => (&markup[start..], markup.len()),
    }
}

/// Attributes of one start tag. Names are lowercased; values are decoded.
struct Attrs(Vec<(String, String)>);

impl Attrs {
    fn parse(raw: &str) -> Self {
        let attrs = ATTR_REGEX
            .captures_iter(raw)
            .map(|caps| {
                let name = caps[1].to_ascii_lowercase();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| decode_entities(m.as_str()))
                    .unwrap_or_default();
                (name, value)
            })
            .collect();
        Attrs(attrs)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }
}

/// Decode the character references form markup commonly carries.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
