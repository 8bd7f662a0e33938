//! Local HTTP server standing in for the Crater storage API

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub authorization: Option<String>,
}

/// Serves canned responses keyed by request URL (path plus query)
///
/// Unknown URLs get a 404 with an error envelope. The server stops when the
/// value is dropped.
pub struct MockApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    stop: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockApi {
    pub fn start(routes: &[(&str, u16, &str)]) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("Failed to start test server");
        let port = server.server_addr().to_ip().unwrap().port();
        let base_url = format!("http://127.0.0.1:{}/api/v1", port);

        let routes: HashMap<String, (u16, String)> = routes
            .iter()
            .map(|(url, status, body)| (url.to_string(), (*status, body.to_string())))
            .collect();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let (stop, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || loop {
            if stop_rx.try_recv().is_ok() {
                break;
            }

            match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(request)) => {
                    let authorization = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string());
                    let url = request.url().to_string();
                    recorded.lock().unwrap().push(RecordedRequest {
                        url: url.clone(),
                        authorization,
                    });

                    let (status, body) = routes.get(&url).cloned().unwrap_or_else(|| {
                        (
                            404,
                            r#"{"code": 404, "data": null, "msg": "no such directory"}"#
                                .to_string(),
                        )
                    });
                    let response = tiny_http::Response::from_string(body)
                        .with_status_code(status)
                        .with_header(
                            tiny_http::Header::from_bytes(
                                &b"Content-Type"[..],
                                &b"application/json"[..],
                            )
                            .unwrap(),
                        );
                    let _ = request.respond(response);
                }
                Ok(None) => {}
                Err(_) => break,
            }
        });

        Self {
            base_url,
            requests,
            stop,
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Success envelope around a JSON array of entries
pub fn listing_body(entries: &str) -> String {
    format!(r#"{{"code": 0, "data": {}, "msg": "success"}}"#, entries)
}
