//! Integration tests for wad

mod support {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::thread;

    const WAD_VARS: &[&str] = &[
        "WAD_CONFIG",
        "WAD_S3_BUCKET_NAME",
        "WAD_S3_CREDENTIALS",
        "WAD_AWS_REGION",
        "WAD_BUCKET_IN_HOSTNAME",
        "WAD_S3_ENDPOINT",
        "WAD_ENVIRONMENT_VARIABLES",
        "WAD_FILES",
        "WAD_CACHE_PATH",
        "WAD_INSTALL_COMMAND",
        "WAD_BUNDLE_WITHOUT",
        "WAD_VERBOSE",
        "S3_BUCKET_NAME",
        "S3_CREDENTIALS",
        "BUNDLE_GEMFILE",
    ];

    /// `wad` running in `dir` with no cache settings inherited
    pub fn wad_in(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("wad");
        for var in WAD_VARS {
            cmd.env_remove(var);
        }
        cmd.current_dir(dir);
        cmd
    }

    /// One request seen by the stub store
    #[derive(Debug, Clone)]
    pub struct Seen {
        pub method: String,
        pub path: String,
        pub authorization: Option<String>,
    }

    /// Minimal in-memory S3 stand-in: PUT stores, GET serves or 404s
    pub struct StubStore {
        pub endpoint: String,
        pub seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl StubStore {
        pub fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let endpoint = format!("http://{}", listener.local_addr().unwrap());
            let seen = Arc::new(Mutex::new(Vec::new()));
            let objects: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::default();

            let log = Arc::clone(&seen);
            thread::spawn(move || {
                for stream in listener.incoming().flatten() {
                    handle(stream, &objects, &log);
                }
            });

            Self { endpoint, seen }
        }

        pub fn requests(&self) -> Vec<(String, String)> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|s| (s.method.clone(), s.path.clone()))
                .collect()
        }
    }

    fn handle(
        stream: TcpStream,
        objects: &Mutex<HashMap<String, Vec<u8>>>,
        log: &Mutex<Vec<Seen>>,
    ) {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
            return;
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut content_length = 0usize;
        let mut authorization = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let value = value.trim().to_string();
                match name.to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.parse().unwrap_or(0),
                    "authorization" => authorization = Some(value),
                    _ => {}
                }
            }
        }

        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            return;
        }

        log.lock().unwrap().push(Seen {
            method: method.clone(),
            path: path.clone(),
            authorization,
        });

        let (status, payload) = match method.as_str() {
            "PUT" => {
                objects.lock().unwrap().insert(path, body);
                ("200 OK", Vec::new())
            }
            "GET" => match objects.lock().unwrap().get(&path) {
                Some(stored) => ("200 OK", stored.clone()),
                None => ("404 Not Found", b"<Error>NoSuchKey</Error>".to_vec()),
            },
            _ => ("405 Method Not Allowed", Vec::new()),
        };

        let mut stream = reader.into_inner();
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            payload.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&payload);
        let _ = stream.flush();
    }
}

mod cli_tests {
    use super::support::wad_in;
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        wad_in(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency artifact cache"))
            .stdout(predicate::str::contains("upload"))
            .stdout(predicate::str::contains("download"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        wad_in(dir.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("wad"));
    }

    #[test]
    fn upload_requires_store() {
        let dir = TempDir::new().unwrap();
        wad_in(dir.path())
            .args(["--no-local", "upload"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Caching is disabled"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn download_requires_store() {
        let dir = TempDir::new().unwrap();
        wad_in(dir.path())
            .args(["--no-local", "download"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Caching is disabled"));
    }

    #[test]
    fn setup_without_store_installs() {
        let dir = TempDir::new().unwrap();
        wad_in(dir.path())
            .args(["--no-local", "--install-command", "touch installed"])
            .assert()
            .success()
            .stdout(predicate::str::contains("caching disabled"))
            .stderr(predicate::str::contains("INFO"))
            .stderr(predicate::str::contains("No S3 credentials defined"))
            .stderr(predicate::str::contains("[wad]").not());

        assert!(dir.path().join("installed").exists());
    }

    #[test]
    fn failed_install_exits_non_zero() {
        let dir = TempDir::new().unwrap();
        wad_in(dir.path())
            .arg("--no-local")
            .env("WAD_INSTALL_COMMAND", "exit 7")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Installing dependencies failed"));
    }

    #[test]
    fn malformed_credentials_rejected() {
        let dir = TempDir::new().unwrap();
        wad_in(dir.path())
            .args(["--no-local", "download"])
            .env("WAD_S3_BUCKET_NAME", "ci")
            .env("WAD_S3_CREDENTIALS", "missing-separator")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid S3 credentials"));
    }

    #[test]
    fn local_config_supplies_install_command() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".wad.toml"),
            "[cache]\ninstall_command = \"touch from-file\"\n",
        )
        .unwrap();
        let nested = dir.path().join("sub");
        fs::create_dir(&nested).unwrap();

        wad_in(&nested).assert().success();
        assert!(nested.join("from-file").exists());
    }

    #[test]
    fn no_local_ignores_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(".wad.toml"),
            "[cache]\ninstall_command = \"touch from-file\"\n",
        )
        .unwrap();

        wad_in(dir.path())
            .args(["--no-local", "--install-command", "true"])
            .assert()
            .success();
        assert!(!dir.path().join("from-file").exists());
    }

    #[test]
    fn invalid_config_reported() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.toml");
        fs::write(&config, "[s3\n").unwrap();

        wad_in(dir.path())
            .arg("--config")
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}

mod store_tests {
    use super::support::{wad_in, StubStore};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Gemfile.lock"), "GEM\n  specs:\n    rake (13.0.6)\n").unwrap();
        dir
    }

    fn with_store(cmd: &mut assert_cmd::Command, store: &StubStore) {
        cmd.arg("--no-local")
            .env("WAD_S3_BUCKET_NAME", "ci-cache")
            .env("WAD_S3_CREDENTIALS", "AKIDEXAMPLE:secret")
            .env("WAD_S3_ENDPOINT", &store.endpoint);
    }

    #[test]
    fn miss_then_hit() {
        let store = StubStore::start();
        let install = "mkdir -p .bundle && echo 'rake' > .bundle/installed";

        // First build: miss, install, upload
        let first = project();
        let mut cmd = wad_in(first.path());
        with_store(&mut cmd, &store);
        cmd.env("WAD_INSTALL_COMMAND", install)
            .assert()
            .success()
            .stdout(predicate::str::contains("stored as"));

        let requests = store.requests();
        assert_eq!(requests.len(), 2, "{:?}", requests);
        assert_eq!(requests[0].0, "GET");
        assert_eq!(requests[1].0, "PUT");
        assert_eq!(requests[0].1, requests[1].1);
        assert!(requests[1].1.starts_with("/ci-cache/"));
        assert!(requests[1].1.ends_with(".tar.bz2"));

        let signed = store.seen.lock().unwrap()[1].authorization.clone().unwrap();
        assert!(signed.starts_with("AWS AKIDEXAMPLE:"));

        // Second build with the same lockfile: restore, never install
        let second = project();
        let mut cmd = wad_in(second.path());
        with_store(&mut cmd, &store);
        cmd.env("WAD_INSTALL_COMMAND", "exit 1")
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored dependencies"));

        assert_eq!(
            fs::read_to_string(second.path().join(".bundle/installed")).unwrap(),
            "rake\n"
        );
        assert_eq!(store.requests().len(), 3);
    }

    #[test]
    fn download_miss_fails() {
        let store = StubStore::start();
        let dir = project();

        let mut cmd = wad_in(dir.path());
        with_store(&mut cmd, &store);
        cmd.arg("download")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cached artifact available"));

        assert!(!dir.path().join(".bundle").exists());
    }

    #[test]
    fn upload_then_download() {
        let store = StubStore::start();

        let source = project();
        fs::create_dir_all(source.path().join("vendor/cache")).unwrap();
        fs::write(source.path().join("vendor/cache/rake.gem"), "gem").unwrap();

        let mut cmd = wad_in(source.path());
        with_store(&mut cmd, &store);
        cmd.args(["upload", "vendor/cache"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Uploaded"));

        let target = project();
        let mut cmd = wad_in(target.path());
        with_store(&mut cmd, &store);
        cmd.arg("download").assert().success();

        assert_eq!(
            fs::read_to_string(target.path().join("vendor/cache/rake.gem")).unwrap(),
            "gem"
        );
    }

    #[test]
    fn unreachable_store_still_builds() {
        // Bind then drop to get a port nothing listens on
        let endpoint = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };
        let dir = project();

        wad_in(dir.path())
            .arg("--no-local")
            .env("WAD_S3_BUCKET_NAME", "ci-cache")
            .env("WAD_S3_CREDENTIALS", "AKIDEXAMPLE:secret")
            .env("WAD_S3_ENDPOINT", endpoint)
            .env("WAD_INSTALL_COMMAND", "mkdir -p .bundle")
            .assert()
            .success()
            .stdout(predicate::str::contains("upload failed"));
    }
}
