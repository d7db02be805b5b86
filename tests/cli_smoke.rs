//! S8 — CLI smoke: the `politecrawl` binary, pointed at one seed via
//! `--seeds-file`, prints exactly one `URL -> Title` line and exits 0.

use std::io::Write;
use std::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn binary_prints_one_line_per_seed_and_exits_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Smoke</title>"))
        .mount(&server)
        .await;

    let mut seeds_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(seeds_file, "{}", server.uri()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_politecrawl"))
        .arg("--seeds-file")
        .arg(seeds_file.path())
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to run the politecrawl binary");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "expected exactly one output line, got: {stdout:?}");
    assert!(lines[0].starts_with(&server.uri()));
    assert!(lines[0].ends_with("-> Smoke"));
}

#[test]
fn binary_exits_nonzero_with_no_seeds() {
    let output = Command::new(env!("CARGO_BIN_EXE_politecrawl"))
        .output()
        .expect("failed to run the politecrawl binary");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no seed URLs"));
}
