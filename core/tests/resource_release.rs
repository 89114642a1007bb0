//! Failing invocations must not leak the upload file handle.
//!
//! Counts entries in `/proc/self/fd`, so Linux only. Kept as the single
//! test in this binary: other tests running in parallel would open and
//! close descriptors under our feet.
#![cfg(target_os = "linux")]

use std::fs;

use http_request_core::{HttpRequestClient, ParameterRecord, RequestError};

fn open_fds() -> usize {
    fs::read_dir("/proc/self/fd").unwrap().count()
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn failed_runs_release_the_upload_file() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("payload.bin");
    fs::write(&upload, vec![7u8; 64 * 1024]).unwrap();
    let port = closed_port();

    let base = ParameterRecord {
        http_method: "PUT".to_string(),
        upload_file: upload.to_string_lossy().into_owned(),
        timeout: 5,
        quiet: true,
        ..Default::default()
    };
    let bad_proxy = ParameterRecord {
        url: "http://127.0.0.1:9/upload".to_string(),
        proxy: "ftp://proxy.local".to_string(),
        ..base.clone()
    };
    let refused = ParameterRecord {
        url: format!("http://127.0.0.1:{port}/upload"),
        wrap_as_multipart: true,
        ..base
    };

    // Warm up once so lazily created descriptors are already in place.
    let _ = HttpRequestClient::new(refused.clone()).execute();
    let before = open_fds();

    for _ in 0..5 {
        let err = HttpRequestClient::new(bad_proxy.clone()).execute().unwrap_err();
        assert!(matches!(err, RequestError::ConfigurationError(_)), "{err}");

        let err = HttpRequestClient::new(refused.clone()).execute().unwrap_err();
        assert!(matches!(err, RequestError::NetworkError(_)), "{err}");
    }

    assert_eq!(open_fds(), before);
}
