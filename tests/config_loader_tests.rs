use devfolio::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

// 32 bytes of 'a'
const SESSION_KEY_B64: &str = "YWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWE=";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    let keys: Vec<String> = env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("DEVFOLIO_"))
        .collect();
    for key in keys {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(dir.path().to_path_buf())
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", &format!("DEVFOLIO_SESSION_KEY={SESSION_KEY_B64}\n"));

    let cfg = loader(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.vouch.daily_limit, 10);
    assert_eq!(cfg.upload_max_bytes, 5 * 1024 * 1024);
    assert_eq!(cfg.session.key.as_deref(), Some(&[b'a'; 32][..]));
    assert!(cfg.google.client_id.is_none());
    assert!(cfg.admin_emails.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!(
            "DEVFOLIO_API_BIND_ADDR=127.0.0.1:3000\nDEVFOLIO_VOUCH_DAILY_LIMIT=5\nDEVFOLIO_SESSION_KEY={SESSION_KEY_B64}\n"
        ),
    );
    // Selects the profile before the profile-specific files load
    write_env_file(
        &temp_dir,
        ".env.local",
        "DEVFOLIO_PROFILE=test\nDEVFOLIO_API_BIND_ADDR=127.0.0.1:4000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test",
        "DEVFOLIO_API_BIND_ADDR=192.168.0.10:5000\nDEVFOLIO_ADMIN_EMAILS=\"admin@example.com, ops@example.com\"\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "DEVFOLIO_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    let cfg = loader(&temp_dir).load().expect("layered config loads");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.vouch.daily_limit, 5);
    assert_eq!(cfg.admin_emails, vec!["admin@example.com", "ops@example.com"]);
    assert!(cfg.is_admin_email("ADMIN@example.com"));
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!("DEVFOLIO_LOG_LEVEL=warn\nDEVFOLIO_SESSION_KEY={SESSION_KEY_B64}\n"),
    );

    unsafe {
        env::set_var("DEVFOLIO_LOG_LEVEL", "trace");
    }
    let cfg = loader(&temp_dir).load().expect("config loads");
    assert_eq!(cfg.log_level, "trace");
    clear_env();
}

#[test]
fn missing_session_key_is_rejected() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let err = loader(&temp_dir).load().expect_err("session key is required");
    assert!(matches!(err, ConfigError::MissingSessionKey));

    write_env_file(&temp_dir, ".env", "DEVFOLIO_SESSION_KEY=c2hvcnQ=\n");
    let err = loader(&temp_dir).load().expect_err("short key fails");
    assert!(matches!(
        err,
        ConfigError::InvalidSessionKeyLength { length: 5 }
    ));

    write_env_file(&temp_dir, ".env", "DEVFOLIO_SESSION_KEY=***\n");
    let err = loader(&temp_dir).load().expect_err("bad base64 fails");
    assert!(matches!(err, ConfigError::InvalidSessionKeyBase64 { .. }));
}

#[test]
fn production_profile_requires_credentials() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        &format!("DEVFOLIO_PROFILE=prod\nDEVFOLIO_SESSION_KEY={SESSION_KEY_B64}\n"),
    );

    let err = loader(&temp_dir).load().expect_err("google is required");
    assert!(matches!(err, ConfigError::MissingGoogleClientId));

    write_env_file(
        &temp_dir,
        ".env.prod",
        "DEVFOLIO_GOOGLE_CLIENT_ID=id\nDEVFOLIO_GOOGLE_CLIENT_SECRET=secret\nDEVFOLIO_GOOGLE_REDIRECT_URL=https://devfolio.example/api/auth/google/callback\n",
    );
    let err = loader(&temp_dir).load().expect_err("star salt is required");
    assert!(matches!(err, ConfigError::MissingStarSalt));

    write_env_file(
        &temp_dir,
        ".env.prod.local",
        "DEVFOLIO_STAR_SALT=pepper\n",
    );
    let cfg = loader(&temp_dir).load().expect("complete prod config loads");
    assert_eq!(cfg.profile, "prod");
    assert!(!cfg.is_dev_profile());
}

#[test]
fn invalid_values_return_errors() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let cases = [
        ("DEVFOLIO_API_BIND_ADDR=not-an-addr", "bind"),
        ("DEVFOLIO_VOUCH_DAILY_LIMIT=0", "vouch"),
        ("DEVFOLIO_ADMIN_EMAILS=not-an-email", "admin"),
        ("DEVFOLIO_APP_URL=localhost", "app_url"),
    ];

    for (line, label) in cases {
        write_env_file(
            &temp_dir,
            ".env",
            &format!("DEVFOLIO_SESSION_KEY={SESSION_KEY_B64}\n{line}\n"),
        );
        let err = loader(&temp_dir).load().expect_err(label);
        let matched = match label {
            "bind" => matches!(err, ConfigError::InvalidBindAddr { .. }),
            "vouch" => matches!(err, ConfigError::InvalidVouchDailyLimit { value: 0 }),
            "admin" => matches!(err, ConfigError::InvalidAdminEmail { .. }),
            _ => matches!(err, ConfigError::InvalidAppUrl { .. }),
        };
        assert!(matched, "{label}: unexpected error {err:?}");
    }
}
