#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Catalog with an operating-system section holding a nested RHEL group
pub const CATALOG_YAML: &str = r#"
- title: Operating system
  value: os
  items:
    - title: RHEL
      value: rhel
      items:
        - title: RHEL 8
          value: rhel8
        - title: RHEL 9
          value: rhel9
    - title: Fedora
      value: fedora
- title: Severity
  value: severity
  items:
    - title: Critical
      value: critical
    - title: Low
      value: low
"#;

pub const DATASET_JSON: &str = r#"[
  {"name": "web-01", "os": "rhel8", "severity": "critical", "cvss": 9.8, "affected": true, "public_date": "2024-01-05"},
  {"name": "web-02", "os": "rhel9", "severity": "low", "cvss": 3.1, "affected": true, "public_date": "2024-02-11"},
  {"name": "db-01", "os": "rhel9", "severity": "critical", "cvss": 7.5, "affected": true, "public_date": "2023-11-30"},
  {"name": "cache-01", "os": "fedora", "severity": "low", "cvss": 5.0, "affected": false, "public_date": "2024-03-01"}
]"#;

/// Helper struct to run sift commands in an isolated temp directory
pub struct SiftTest {
    pub temp_dir: TempDir,
}

impl SiftTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        SiftTest { temp_dir }
    }

    /// A test directory with `catalog.yaml` and `dataset.json` written.
    pub fn with_fixtures() -> Self {
        let test = Self::new();
        test.write("catalog.yaml", CATALOG_YAML);
        test.write("dataset.json", DATASET_JSON);
        test
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_sift"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to execute sift command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Command {:?} should have failed\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }
}
