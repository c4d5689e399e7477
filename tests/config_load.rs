// tests/config_load.rs
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;

use price_scout::config::mail::{ENV_REPORT_RECIPIENT, ENV_SMTP_PASSWORD, ENV_SMTP_USERNAME};
use price_scout::config::{ENV_CONFIG_PATH, DEFAULT_CONFIG_PATH};
use price_scout::PipelineConfig;

const MINIMAL: &str = r#"
[mail]
transport = "LOG"
from = "reports@example.test"
to = "ENV"

[[sources]]
name = "a"
url = "https://a.test/"
[sources.selectors]
item = ".p"
name = ".n"
price = ".v"
"#;

/// Restores an env var on drop.
struct EnvGuard(&'static str, Option<String>);

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let prev = env::var(key).ok();
        env::set_var(key, val);
        Self(key, prev)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.1 {
            Some(v) => env::set_var(self.0, v),
            None => env::remove_var(self.0),
        }
    }
}

#[test]
fn shipped_sample_config_parses() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
    let cfg = PipelineConfig::read_from(&path).expect("sample config valid");
    assert_eq!(cfg.sources.len(), 2);
    assert_eq!(cfg.mail.to, "ENV");
    assert!(!cfg.mail.is_dry_run());
    assert_eq!(cfg.mail.effective_port(), 587);
}

#[test]
#[serial]
fn env_path_and_secrets_are_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scout.toml");
    fs::write(&path, MINIMAL).unwrap();

    let _p = EnvGuard::set(ENV_CONFIG_PATH, &path.display().to_string());
    let _r = EnvGuard::set(ENV_REPORT_RECIPIENT, " team@example.test ");

    let cfg = PipelineConfig::load_default().expect("loads");
    assert_eq!(cfg.mail.transport, "log");
    assert!(cfg.mail.is_dry_run());
    assert_eq!(cfg.mail.to, "team@example.test");
    assert_eq!(cfg.sources[0].currency, "USD");
}

#[test]
#[serial]
fn missing_recipient_env_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scout.toml");
    fs::write(&path, MINIMAL).unwrap();
    env::remove_var(ENV_REPORT_RECIPIENT);

    let err = PipelineConfig::load_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains(ENV_REPORT_RECIPIENT), "{err:#}");
}

#[test]
#[serial]
fn smtp_credentials_come_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scout.toml");
    let toml = MINIMAL
        .replace("transport = \"LOG\"", "transport = \"smtp\"\nhost = \"localhost\"\nusername = \"ENV\"\npassword = \"ENV\"");
    fs::write(&path, toml).unwrap();

    let _r = EnvGuard::set(ENV_REPORT_RECIPIENT, "team@example.test");
    let _u = EnvGuard::set(ENV_SMTP_USERNAME, "scout");
    let _s = EnvGuard::set(ENV_SMTP_PASSWORD, "s3cret");

    let cfg = PipelineConfig::load_from(&path).unwrap();
    assert_eq!(cfg.mail.username.as_deref(), Some("scout"));
    assert_eq!(cfg.mail.password.as_deref(), Some("s3cret"));
}

#[test]
#[serial]
fn smtp_recipient_must_be_an_address() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scout.toml");
    let toml = MINIMAL.replace("transport = \"LOG\"", "transport = \"smtp\"\nhost = \"localhost\"");
    fs::write(&path, toml).unwrap();

    let _r = EnvGuard::set(ENV_REPORT_RECIPIENT, "not an address");
    let err = PipelineConfig::load_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains("invalid mail address `not an address`"), "{err:#}");
}

#[test]
#[serial]
fn env_path_must_exist() {
    let _p = EnvGuard::set(ENV_CONFIG_PATH, "/definitely/not/here/scout.toml");
    let err = PipelineConfig::default_path().unwrap_err();
    assert!(err.to_string().contains(ENV_CONFIG_PATH));
}

#[test]
fn empty_source_list_is_rejected() {
    let only_mail = MINIMAL.split("[[sources]]").next().unwrap();
    let err = PipelineConfig::from_toml_str(only_mail).unwrap_err();
    assert!(err.to_string().contains("no sources configured"), "{err:#}");
}
