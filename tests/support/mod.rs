// One shared server per test binary, booted on an ephemeral port.
#![allow(dead_code)]

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

// Base URL (http://host:port) once the server has bound.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// Guards the bootstrap so it runs once per binary.
static SERVER_READY: OnceLock<()> = OnceLock::new();

/// Boots the server if needed and returns its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published = Arc::new(OnceLock::<String>::new());
        let published_by_server = Arc::clone(&published);

        // A dedicated OS thread with its own runtime outlives each `#[tokio::test]` runtime.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("local addr");
                let _ = published_by_server.set(format!("http://{addr}"));
                survival_server::run(listener).await.expect("server failed");
            });
        });

        wait_until_accepting(published);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

/// WebSocket URL for a session on the shared server.
pub fn ws_url(session_id: &str) -> String {
    let base = ensure_server();
    format!(
        "ws://{}/ws?session_id={session_id}",
        base.trim_start_matches("http://")
    )
}

fn wait_until_accepting(published: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}
