//! Integration tests for Strata

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn strata() -> Command {
        let mut cmd = cargo_bin_cmd!("strata");
        cmd.arg("--no-local");
        cmd
    }

    #[test]
    fn help_displays() {
        strata()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("layer-cache orchestration"));
    }

    #[test]
    fn version_displays() {
        strata()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("strata"));
    }

    #[test]
    fn platforms_lists_discovered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Dockerfile.build.armv7"), "FROM busybox\n").unwrap();
        fs::write(dir.path().join("Dockerfile.build.centos7"), "FROM centos:7\n").unwrap();
        fs::write(dir.path().join("README.md"), "docs").unwrap();

        strata()
            .args(["platforms", "--docker-dir"])
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("armv7").and(predicate::str::contains("centos7")));
    }

    #[test]
    fn platforms_missing_dir_fails() {
        strata()
            .args(["platforms", "--docker-dir", "/nonexistent/docker"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Docker directory not found"));
    }

    #[test]
    fn build_missing_docker_dir_fails() {
        strata()
            .args(["build", "armv7", "--docker-dir", "/nonexistent/docker"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Docker directory not found"));
    }

    #[test]
    fn build_invalid_platform_name_fails() {
        let dir = TempDir::new().unwrap();
        strata()
            .args(["build", "NOT_VALID", "--docker-dir"])
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid platform name"));
    }

    #[test]
    fn load_without_bucket_is_noop() {
        let config = TempDir::new().unwrap();
        strata()
            .arg("--config")
            .arg(config.path().join("config.toml"))
            .args(["load", "armv7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no cache bucket configured"));
    }

    #[test]
    fn save_without_bucket_is_noop() {
        let config = TempDir::new().unwrap();
        strata()
            .arg("--config")
            .arg(config.path().join("config.toml"))
            .args(["save", "armv7"])
            .assert()
            .success();
    }

    #[test]
    fn clean_requires_platforms_or_all() {
        strata().arg("clean").assert().failure();
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        strata()
            .arg("--config")
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let dir = TempDir::new().unwrap();
        strata()
            .arg("--config")
            .arg(dir.path().join("config.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]").and(predicate::str::contains("[cache]")));
    }

    #[test]
    fn config_set_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        strata()
            .arg("--config")
            .arg(&path)
            .args(["config", "set", "cache.bucket", "ci-layer-cache"])
            .assert()
            .success();

        strata()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ci-layer-cache"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let dir = TempDir::new().unwrap();
        strata()
            .arg("--config")
            .arg(dir.path().join("config.toml"))
            .args(["config", "set", "cache.nope", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown configuration key"));
    }
}
