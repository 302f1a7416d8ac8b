use dioxus::prelude::*;

use records::RECORDS_PATH;
use ui::EditablePage;
use widget::WidgetConfig;

mod records;

fn main() {
    #[cfg(feature = "server")]
    {
        tokio::runtime::Runtime::new()
            .expect("failed to start tokio runtime")
            .block_on(launch_server());
    }

    #[cfg(not(feature = "server"))]
    {
        dioxus::launch(App);
    }
}

#[cfg(feature = "server")]
async fn launch_server() {
    use axum::routing::{get, post};
    use dioxus::server::{DioxusRouterExt, ServeConfig};

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let router = axum::Router::new()
        .route(RECORDS_PATH, get(records::list))
        .route("/api/records/{verb}", post(records::dispatch))
        .with_state(records::seeded_backend())
        .serve_dioxus_application(ServeConfig::new(), App);

    // CRUD_LISTEN_ADDR wins over the address `dx serve` hands us.
    let addr = std::env::var("CRUD_LISTEN_ADDR")
        .ok()
        .and_then(|addr| addr.parse().ok())
        .unwrap_or_else(dioxus::cli_config::fullstack_address_or_localhost);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listen address");
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .await
        .expect("server error");
}

/// Absolute URL of the records API, as seen from wherever the app runs.
fn records_endpoint() -> String {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(origin) = web_sys::window().and_then(|w| w.location().origin().ok()) {
            return format!("{origin}{RECORDS_PATH}");
        }
    }
    let addr = std::env::var("CRUD_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    format!("http://{addr}{RECORDS_PATH}")
}

#[component]
fn App() -> Element {
    let endpoint = use_hook(records_endpoint);
    let blocks = use_resource({
        let endpoint = endpoint.clone();
        move || {
            let endpoint = endpoint.clone();
            async move { records::fetch_blocks(&endpoint).await }
        }
    });

    rsx! {
        main {
            class: "records",
            h1 { "Records" }
            match &*blocks.read() {
                Some(Ok(list)) => rsx! {
                    EditablePage {
                        endpoint: endpoint.clone(),
                        blocks: list
                            .iter()
                            .map(|block| (WidgetConfig::update(endpoint.clone(), block.id), block.html.clone()))
                            .collect::<Vec<_>>(),
                    }
                },
                Some(Err(e)) => rsx! {
                    p { class: "error", "Could not load records: {e}" }
                },
                None => rsx! {
                    p { "Loading..." }
                },
            }
        }
    }
}
