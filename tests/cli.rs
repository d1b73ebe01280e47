//! CLI integration tests for dispensary admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use dispensary::auth::CredentialHasher;
use dispensary::store::{SqliteStore, Store};
use dispensary::types::Role;
use predicates::prelude::*;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("dispensary").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn seed(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "seed", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("dispensary.db")).expect("failed to open store")
    }

    fn admin_password(&self) -> String {
        std::fs::read_to_string(self.data_dir().join(".admin_password"))
            .expect("failed to read password file")
            .trim()
            .to_string()
    }
}

#[test]
fn test_init_creates_database_and_manager() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Created manager account 'admin'"));

    assert!(ctx.data_dir().join("dispensary.db").exists());

    let password = ctx.admin_password();
    assert_eq!(password.len(), 20);

    let store = ctx.store();
    let manager = store
        .get_user_by_username("admin")
        .unwrap()
        .expect("manager exists");
    assert_eq!(manager.role, Role::Manager);
    assert!(
        CredentialHasher::new()
            .verify(&password, &manager.password_hash)
            .unwrap()
    );
}

#[cfg(unix)]
#[test]
fn test_init_password_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    ctx.init().success();

    let mode = std::fs::metadata(ctx.data_dir().join(".admin_password"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_init_refuses_to_run_twice() {
    let ctx = TestContext::new();
    ctx.init().success();
    let first = ctx.admin_password();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));

    assert_eq!(ctx.admin_password(), first);
}

#[test]
fn test_seed_requires_init() {
    let ctx = TestContext::new();

    ctx.seed()
        .failure()
        .stderr(predicate::str::contains("admin init"));
}

#[test]
fn test_seed_is_idempotent() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.seed()
        .success()
        .stdout(predicate::str::contains("Seeded 4 categories, 5 medicines"));
    ctx.seed()
        .success()
        .stdout(predicate::str::contains("already seeded"));

    let store = ctx.store();
    assert_eq!(store.list_medicines(false).unwrap().len(), 5);
    assert_eq!(store.list_users_by_role(Role::Pharmacist).unwrap().len(), 1);
    assert_eq!(store.list_users_by_role(Role::Customer).unwrap().len(), 1);
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_serve_rejects_invalid_config_file() {
    let ctx = TestContext::new();
    ctx.init().success();
    std::fs::write(
        ctx.data_dir().join("dispensary.toml"),
        "tax_rate_bps = 20000\n",
    )
    .unwrap();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tax_rate_bps"));
}
