//! CLI integration tests for the `gauge` binary.
//!
//! Uses `assert_cmd` to spawn the binary and verify exit codes, stdout
//! content and the files each subcommand writes. `run` is exercised against
//! a tiny HTTP stub bound to a local port.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use tempfile::TempDir;

fn gauge() -> Command {
    let mut cmd = cargo_bin_cmd!("gauge");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_corpus(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("tickets.json");
    let tickets = serde_json::json!([
        {"id": 1, "description": "Comment ajouter un produit avec plusieurs variantes ?", "title": "Produits", "subject": "Produits", "ticket_type": "Question", "company_name": "alpha"},
        {"id": 2, "description": "Je veux modifier le prix de mes produits en promotion", "title": "Prix", "subject": "Produits", "ticket_type": "Question", "company_name": "beta"},
        {"id": 3, "description": "Erreur 500 quand je valide une commande client", "title": "Commande", "subject": "Commande", "ticket_type": "Critical", "company_name": "gamma"},
        {"id": 4, "description": "Ma commande reste en attente depuis deux jours", "title": "Commande", "subject": "Commande", "ticket_type": "Problem", "company_name": "delta"},
        {"id": 5, "description": "court", "title": "?", "subject": "Autre", "ticket_type": "Autre", "company_name": "epsilon"}
    ]);
    fs::write(&path, serde_json::to_string_pretty(&tickets).unwrap()).unwrap();
    path
}

/// Answer every POST with the same well-formed classifier reply.
fn spawn_stub_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut content_length = 0usize;
            let mut chunked = false;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap_or(0);
                }
                if lower.starts_with("transfer-encoding:") && lower.contains("chunked") {
                    chunked = true;
                }
                if line == "\r\n" {
                    break;
                }
            }
            if chunked {
                drain_chunks(&mut reader);
            } else {
                let mut body = vec![0u8; content_length];
                let _ = reader.read_exact(&mut body);
            }

            let reply = serde_json::json!({
                "answer": "Voici la marche à suivre :\n1. Ouvrez le tableau de bord\n2. Cliquez sur Produits\n3. Ajoutez le produit puis sauvegardez.",
                "verdict": "user_side",
                "mode": "solve",
                "category": "products",
                "ticket_type": "question",
                "severity": "low",
                "escalate": false,
                "detected_language": "fr",
                "signals": {"confidence": 0.8},
                "processing_time_ms": 640
            })
            .to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.len(),
                reply
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });
    format!("http://{}/chat", addr)
}

fn drain_chunks(reader: &mut impl BufRead) {
    loop {
        let mut size_line = String::new();
        if reader.read_line(&mut size_line).unwrap_or(0) == 0 {
            return;
        }
        let size = usize::from_str_radix(size_line.trim(), 16).unwrap_or(0);
        let mut chunk = vec![0u8; size + 2];
        if reader.read_exact(&mut chunk).is_err() || size == 0 {
            return;
        }
    }
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    gauge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate-labeler"))
        .stdout(predicate::str::contains("sample"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn version_exits_0() {
    gauge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gauge"));
}

// ──────────────────────────────────────────────
// 2. validate-labeler
// ──────────────────────────────────────────────

#[test]
fn validate_labeler_writes_json() {
    let dir = TempDir::new().unwrap();
    gauge()
        .args(["validate-labeler", "--out"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Labeler self-validation"))
        .stdout(predicate::str::contains("Module:"));

    let written = fs::read_to_string(dir.path().join("labeler_validation.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert!(value["n"].as_u64().unwrap() > 0);
    assert!(value["module_accuracy"].as_f64().is_some());
    assert!(value["details"].is_array());
}

// ──────────────────────────────────────────────
// 3. sample
// ──────────────────────────────────────────────

#[test]
fn sample_prints_the_plan() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(dir.path());
    gauge()
        .args(["sample", "--count", "10", "--corpus"])
        .arg(&corpus)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 5 tickets"))
        // the one-word ticket is unusable
        .stdout(predicate::str::contains("Selected 4 tickets across 2 subjects"))
        .stdout(predicate::str::contains("Governance-triggered:     1"))
        .stdout(predicate::str::contains("Live greeting tests:      1"))
        .stdout(predicate::str::contains("Estimated API calls:"));
}

#[test]
fn sample_missing_corpus_exits_1() {
    gauge()
        .args(["sample", "--corpus", "/definitely/not/here.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: failed to read corpus"));
}

#[test]
fn sample_empty_corpus_exits_1() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("empty.json");
    fs::write(&corpus, "[]").unwrap();
    gauge()
        .args(["sample", "--corpus"])
        .arg(&corpus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("contains no records"));
}

// ──────────────────────────────────────────────
// 4. run
// ──────────────────────────────────────────────

#[test]
fn run_rejects_a_bad_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("gauge.toml");
    fs::write(&config, "count = \"many\"\n").unwrap();
    gauge()
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not parse"));
}

#[test]
fn run_validates_the_labeler_before_loading_the_corpus() {
    let dir = TempDir::new().unwrap();
    gauge()
        .args(["run", "--corpus", "/definitely/not/here.json", "--out"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to read corpus"));

    assert!(dir.path().join("labeler_validation.json").exists());
    assert!(!dir.path().join("conversation_report.txt").exists());
}

#[test]
fn run_against_a_stub_service_writes_every_output() {
    let dir = TempDir::new().unwrap();
    let corpus = write_corpus(dir.path());
    let out = dir.path().join("reports");
    let config = dir.path().join("gauge.toml");
    fs::write(
        &config,
        format!(
            "endpoint = {:?}\ncorpus = {:?}\ndebug = false\ncount = 4\nthink_time_ms = 0\nmax_retries = 1\ngreeting_live_rate = 0.0\nfollowup_rate = 0.0\nregression_size = 2\n",
            spawn_stub_service(),
            corpus.display().to_string()
        ),
    )
    .unwrap();

    gauge()
        .args(["run", "--config"])
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed 4 of 4 conversations"))
        .stdout(predicate::str::contains("Regression suite:"));

    let report = fs::read_to_string(out.join("conversation_report.txt")).unwrap();
    assert!(report.contains("PRIMARY KPI"));
    assert!(report.contains("FINAL GRADE"));

    let results: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("conversation_results.json")).unwrap())
            .unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r["errored"] == false));

    // The 500 ticket must escalate, and the stub never does.
    let governed = results
        .iter()
        .find(|r| r["ticket_id"] == "3")
        .unwrap();
    assert_eq!(governed["resolved"], false);

    let suite: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("regression_suite.json")).unwrap())
            .unwrap();
    let suite = suite.as_array().unwrap();
    assert_eq!(suite.len(), 2);
    assert_eq!(suite[0]["ticket_id"], "3");
}
