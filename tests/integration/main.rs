//! Integration tests for buildctl

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// A buildctl command isolated from the user's config and environment
    fn buildctl(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("buildctl");
        cmd.arg("--config")
            .arg(config)
            .env_remove("BUILDKIT_HOST")
            .env_remove("BUILDCTL_CONFIG");
        cmd
    }

    fn config_path(dir: &TempDir) -> std::path::PathBuf {
        dir.path().join("config.toml")
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        buildctl(&config_path(&dir))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build client"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        buildctl(&config_path(&dir))
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("buildctl"));
    }

    #[test]
    fn build_help_lists_flags() {
        let dir = TempDir::new().unwrap();
        buildctl(&config_path(&dir))
            .args(["build", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--exporter-opt"))
            .stdout(predicate::str::contains("--import-cache"))
            .stdout(predicate::str::contains("--export-cache-opt").not());
    }

    #[test]
    fn config_path_uses_override() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);
        buildctl(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(path.display().to_string()));
    }

    #[test]
    fn config_init_then_show() {
        let dir = TempDir::new().unwrap();
        let path = config_path(&dir);
        buildctl(&path).args(["config", "init"]).assert().success();
        assert!(path.exists());

        buildctl(&path)
            .args(["config", "set", "progress.mode", "plain"])
            .assert()
            .success();

        buildctl(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[engine]"))
            .stdout(predicate::str::contains("mode = \"plain\""));
    }

    #[test]
    fn empty_stdin_is_rejected() {
        let dir = TempDir::new().unwrap();
        buildctl(&config_path(&dir))
            .args(["build", "--progress", "plain"])
            .write_stdin("")
            .assert()
            .failure()
            .stderr(predicate::str::contains("empty definition sent to build"));
    }

    #[test]
    fn unsupported_secret_type_is_rejected() {
        let dir = TempDir::new().unwrap();
        buildctl(&config_path(&dir))
            .args([
                "build",
                "--frontend",
                "dockerfile.v0",
                "--progress",
                "plain",
                "--secret",
                "type=env,id=x",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported secret type \"env\""));
    }

    #[test]
    fn unknown_entitlement_is_rejected() {
        let dir = TempDir::new().unwrap();
        buildctl(&config_path(&dir))
            .args([
                "build",
                "--frontend",
                "dockerfile.v0",
                "--progress",
                "plain",
                "--allow",
                "kernel.modules",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown entitlement kernel.modules"));
    }

    #[test]
    fn local_exporter_requires_output() {
        let dir = TempDir::new().unwrap();
        buildctl(&config_path(&dir))
            .args([
                "build",
                "--frontend",
                "dockerfile.v0",
                "--progress",
                "plain",
                "--exporter",
                "local",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "invalid exporter-opt: output: output directory is required",
            ));
    }

    #[cfg(unix)]
    fn scripted_engine_config(dir: &TempDir, script: &str) -> std::path::PathBuf {
        let path = config_path(dir);
        let content = format!(
            "[engine]\ncommand = \"sh\"\nargs = [\"-c\", '''{}''']\n",
            script
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn build_against_scripted_engine() {
        let dir = TempDir::new().unwrap();
        let trace = dir.path().join("trace.log");
        let config = scripted_engine_config(
            &dir,
            r#"cat > /dev/null
echo '{"status":{"vertexes":[{"digest":"sha256:a","name":"[1/2] FROM alpine"}]}}' >&2
echo '{"status":{"vertexes":[{"digest":"sha256:b","name":"[2/2] RUN make","cached":true}]}}' >&2
echo '{"response":{"exporter_response":{"containerimage.digest":"sha256:f00"}}}' >&2"#,
        );

        buildctl(&config)
            .args(["build", "--frontend", "dockerfile.v0", "--progress", "plain"])
            .arg("--trace")
            .arg(&trace)
            .assert()
            .success()
            .stdout(predicate::str::contains("FROM alpine"))
            .stdout(predicate::str::contains("CACHED"));

        let recorded = std::fs::read_to_string(&trace).unwrap();
        let lines: Vec<&str> = recorded.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("sha256:a"));
        assert!(lines[1].contains("sha256:b"));
    }

    #[cfg(unix)]
    #[test]
    fn build_writes_archive_to_output_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("image.tar");
        let config = scripted_engine_config(&dir, "cat > /dev/null; printf 'tar-bytes'");

        buildctl(&config)
            .args([
                "build",
                "--frontend",
                "dockerfile.v0",
                "--progress",
                "plain",
                "--exporter",
                "oci",
            ])
            .arg("--exporter-opt")
            .arg(format!("output={}", output.display()))
            .assert()
            .success();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "tar-bytes");
    }

    #[cfg(unix)]
    #[test]
    fn engine_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = scripted_engine_config(
            &dir,
            "cat > /dev/null; echo 'frontend dockerfile.v9 not found' >&2; exit 1",
        );

        buildctl(&config)
            .args(["build", "--frontend", "dockerfile.v9", "--progress", "plain"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("build engine failed"))
            .stderr(predicate::str::contains("frontend dockerfile.v9 not found"));
    }

    #[cfg(unix)]
    const QUIET_ENGINE: &str =
        "cat > /dev/null; echo '{\"response\":{\"exporter_response\":{}}}' >&2";

    #[cfg(unix)]
    #[test]
    fn legacy_import_cache_warns_deprecation() {
        let dir = TempDir::new().unwrap();
        let config = scripted_engine_config(&dir, QUIET_ENGINE);

        buildctl(&config)
            .args([
                "build",
                "--frontend",
                "dockerfile.v0",
                "--progress",
                "plain",
                "--import-cache",
                "example.com/cache",
            ])
            .assert()
            .success()
            .stderr(predicate::str::contains("is deprecated"));
    }

    #[cfg(unix)]
    #[test]
    fn legacy_export_cache_warns_deprecation() {
        let dir = TempDir::new().unwrap();
        let config = scripted_engine_config(&dir, QUIET_ENGINE);

        buildctl(&config)
            .args([
                "build",
                "--frontend",
                "dockerfile.v0",
                "--progress",
                "plain",
                "--export-cache",
                "example.com/cache",
                "--export-cache-opt",
                "mode=max",
            ])
            .assert()
            .success()
            .stderr(predicate::str::contains("is deprecated"));
    }

    #[cfg(unix)]
    #[test]
    fn structured_cache_spec_does_not_warn() {
        let dir = TempDir::new().unwrap();
        let config = scripted_engine_config(&dir, QUIET_ENGINE);

        buildctl(&config)
            .args([
                "build",
                "--frontend",
                "dockerfile.v0",
                "--progress",
                "plain",
                "--import-cache",
                "type=registry,ref=example.com/cache",
            ])
            .assert()
            .success()
            .stderr(predicate::str::contains("is deprecated").not());
    }
}
