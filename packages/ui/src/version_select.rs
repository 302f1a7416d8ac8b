use dioxus::prelude::*;
use api::VersionId;
use widget::VersionMenu;

/// Drop-down of prior versions. Picking one reports its version id; the
/// placeholder and the "Revert to…" entry report nothing.
#[component]
pub fn VersionSelect(menu: VersionMenu, on_select: EventHandler<VersionId>) -> Element {
    let enabled = menu.is_enabled();
    let labels: Vec<String> = menu
        .options()
        .iter()
        .map(|entry| entry.label().to_string())
        .collect();

    rsx! {
        select {
            class: "crud-versions",
            disabled: !enabled,
            onchange: move |evt: FormEvent| {
                let picked = evt
                    .value()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| menu.select(index));
                if let Some(version) = picked {
                    on_select.call(version);
                }
            },
            for (index, label) in labels.into_iter().enumerate() {
                option {
                    key: "{index}",
                    value: "{index}",
                    selected: index == 0,
                    "{label}"
                }
            }
        }
    }
}
