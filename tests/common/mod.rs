#![allow(dead_code)]

use assert_cmd::Command;
use issue_threads::config::ConfigPaths;
use issue_threads::model::{Comment, Issue, IssueState, Label, User};
use issue_threads::util::parse_wire;
use serde_json::Map;
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        issue_threads::logging::init_test_logging();
    });
}

/// A scratch data root.
pub struct ThreadsWorkspace {
    pub temp: TempDir,
}

impl ThreadsWorkspace {
    pub fn new() -> Self {
        init_test_logging();
        Self {
            temp: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> ConfigPaths {
        ConfigPaths::new(self.root())
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel))
            .unwrap_or_else(|err| panic!("failed to read {rel}: {err}"))
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// `ithreads` with tracker/config variables cleared so the host
    /// environment cannot leak in.
    pub fn ithreads(&self) -> Command {
        let mut cmd = Command::cargo_bin("ithreads").expect("binary builds");
        for var in [
            "GITHUB_TOKEN",
            "GITHUB_REPO",
            "VALID_LABELS",
            "ITHREADS_DIR",
            "GITHUB_API_URL",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.root());
        cmd
    }
}

pub fn issue(number: u64, title: &str, updated_at: &str, comments: u64) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        user: User::new("alice"),
        created_at: parse_wire("2024-01-01T00:00:00Z").unwrap(),
        updated_at: parse_wire(updated_at).unwrap(),
        state: IssueState::Open,
        labels: vec![Label::new("faro")],
        body: Some(format!("Body of issue {number}")),
        comments,
        comments_url: comments_url(number),
        extra: Map::new(),
    }
}

pub fn comments_url(number: u64) -> String {
    format!("https://api.example.test/repos/grafana/faro/issues/{number}/comments")
}

pub fn comment(login: &str, created_at: &str, body: &str) -> Comment {
    Comment {
        user: User::new(login),
        created_at: parse_wire(created_at).unwrap(),
        body: Some(body.to_string()),
        extra: Map::new(),
    }
}

pub const ISSUE_JSON: &str = r#"{
  "number": 1,
  "title": "Bug",
  "user": {"login": "alice"},
  "created_at": "2024-01-01T00:00:00Z",
  "updated_at": "2024-01-01T00:00:00Z",
  "state": "open",
  "labels": [{"name": "faro"}],
  "body": "Steps to reproduce"
}"#;
