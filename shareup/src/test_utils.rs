//! Test helpers shared by the in-crate test modules.

use std::io::Write;
use std::sync::{Arc, Mutex};

use axum_test::TestServer;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::Config;
use crate::storage::in_memory::InMemoryFileShare;

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.storage.connection_string = None;
    config
}

pub fn create_test_app(share: InMemoryFileShare) -> TestServer {
    create_test_app_with_config(create_test_config(), share)
}

pub fn create_test_app_with_config(config: Config, share: InMemoryFileShare) -> TestServer {
    crate::Application::with_share(config, Arc::new(share)).into_test_server()
}

/// HTTP client for talking to mock servers. Installs the rustls provider if nothing else has.
pub fn http_client() -> reqwest::Client {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    reqwest::Client::builder().build().expect("Failed to build test HTTP client")
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a subscriber that records every event, returning its result and the log text.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&logs.0.lock().unwrap()).into_owned();
    (result, text)
}
