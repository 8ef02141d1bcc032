//! Integration tests for jdkup

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use predicates::prelude::*;
    use sha2::{Digest, Sha256};
    use std::fs::{self, File};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Isolated home: config, state and install root all live in a temp dir
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn config_path(&self) -> PathBuf {
            self.path().join("config").join("config.toml")
        }

        fn jdks(&self) -> PathBuf {
            self.path().join("jdks")
        }

        fn history_path(&self) -> PathBuf {
            self.path().join("state").join("history.json")
        }

        /// Write a config pointing every path into the sandbox
        fn write_config(&self, feed: Option<&str>) {
            let feed_line = feed
                .map(|f| format!("feed_url = {:?}\n", f))
                .unwrap_or_default();
            let content = format!(
                "[general]\naudit_log = false\n\n[install]\nroot = {:?}\n\n[download]\n{}\n[history]\npath = {:?}\n",
                self.jdks().display().to_string(),
                feed_line,
                self.history_path().display().to_string(),
            );
            fs::create_dir_all(self.config_path().parent().unwrap()).unwrap();
            fs::write(self.config_path(), content).unwrap();
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("jdkup");
            cmd.env("JDKUP_CONFIG", self.config_path())
                .env("XDG_STATE_HOME", self.path().join("xdg-state"))
                .env("CI", "1");
            cmd
        }

        /// Build a tar.gz JDK and a feed listing it for this platform
        fn write_feed(&self) -> String {
            let archive = self.path().join("jdk-17.0.2.tar.gz");
            let mut builder =
                tar::Builder::new(GzEncoder::new(File::create(&archive).unwrap(), Compression::default()));
            for (name, data) in [
                ("jdk-17.0.2/bin/java", &b"#!/bin/sh\n"[..]),
                ("jdk-17.0.2/release", &b"JAVA_VERSION=\"17.0.2\"\n"[..]),
            ] {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o755);
                header.set_cksum();
                builder.append_data(&mut header, name, data).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();

            let bytes = fs::read(&archive).unwrap();
            let feed = serde_json::json!({
                "jdks": [{
                    "vendor": "temurin",
                    "jdk_version": "17.0.2",
                    "jdk_version_major": 17,
                    "url": format!("file://{}", archive.display()),
                    "sha256": hex::encode(Sha256::digest(&bytes)),
                    "archive_size": bytes.len(),
                    "archive_file_name": "jdk-17.0.2.tar.gz",
                    "package_type": "targz",
                    "package_root_prefix": "jdk-17.0.2",
                    "install_folder_name": "temurin-17.0.2",
                    "os": std::env::consts::OS,
                    "arch": std::env::consts::ARCH,
                }]
            });
            let feed_path = self.path().join("feed.json");
            fs::write(&feed_path, serde_json::to_string_pretty(&feed).unwrap()).unwrap();
            format!("file://{}", feed_path.display())
        }
    }

    #[test]
    fn help_displays() {
        Sandbox::new()
            .cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("JDK installer"));
    }

    #[test]
    fn version_displays() {
        Sandbox::new()
            .cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("jdkup"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        Sandbox::new()
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("[download]"));
    }

    #[test]
    fn config_set_persists() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "download.feed_url", "https://example.com/jdks.json"])
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://example.com/jdks.json"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        Sandbox::new()
            .cmd()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn list_without_feed_fails() {
        let sandbox = Sandbox::new();
        sandbox.write_config(None);
        sandbox
            .cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No JDK feed"));
    }

    #[test]
    fn list_shows_platform_builds() {
        let sandbox = Sandbox::new();
        let feed = sandbox.write_feed();
        sandbox.write_config(Some(&feed));

        sandbox
            .cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("temurin-17.0.2"));
    }

    #[test]
    fn install_unknown_jdk_fails() {
        let sandbox = Sandbox::new();
        let feed = sandbox.write_feed();
        sandbox.write_config(Some(&feed));

        sandbox
            .cmd()
            .args(["install", "8"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No JDK matching '8'"));
    }

    #[test]
    fn install_then_reinstall_uses_history() {
        let sandbox = Sandbox::new();
        let feed = sandbox.write_feed();
        sandbox.write_config(None);
        let install_dir = sandbox.jdks().join("temurin-17.0.2");

        sandbox
            .cmd()
            .args(["install", "17", "temurin-17.0.2", "--feed", &feed])
            .assert()
            .success()
            .stdout(predicate::str::contains(install_dir.display().to_string()));

        assert!(install_dir.join("bin/java").is_file());
        assert!(install_dir.join(".jdkup.json").is_file());
        let history = fs::read_to_string(sandbox.history_path()).unwrap();
        assert!(history.contains("temurin-17.0.2"));

        // Remove the archive: a second install must not need it
        fs::remove_file(sandbox.path().join("jdk-17.0.2.tar.gz")).unwrap();
        sandbox
            .cmd()
            .args(["install", "17", "--feed", &feed])
            .assert()
            .success()
            .stdout(predicate::str::contains(install_dir.display().to_string()));

        sandbox
            .cmd()
            .args(["history", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(install_dir.display().to_string()));
    }

    #[test]
    fn install_into_foreign_directory_fails() {
        let sandbox = Sandbox::new();
        let feed = sandbox.write_feed();
        sandbox.write_config(Some(&feed));
        let dir = sandbox.path().join("occupied");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("notes.txt"), "mine").unwrap();

        sandbox
            .cmd()
            .args(["install", "17", "--dir"])
            .arg(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("different artifact"));
    }

    #[test]
    fn history_prune_removes_missing_installs() {
        let sandbox = Sandbox::new();
        let feed = sandbox.write_feed();
        sandbox.write_config(Some(&feed));
        let install_dir = sandbox.jdks().join("temurin-17.0.2");

        sandbox.cmd().args(["install", "17"]).assert().success();
        fs::remove_dir_all(&install_dir).unwrap();

        sandbox
            .cmd()
            .args(["history", "prune", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Pruned 1"));

        sandbox
            .cmd()
            .args(["history", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }
}
