use super::*;

use std::{collections::HashMap, fs};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

fn no_file() -> Option<&'static Path> {
    None
}

#[test]
fn defaults_match_documented_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.toml");
    // An explicit path must exist; the implicit default may not.
    assert!(load_settings_with(Some(missing.as_path()), env(&[])).is_err());

    let settings = Settings::default();
    assert_eq!(settings.admin_chat_id, 0);
    assert_eq!(settings.poll_timeout_seconds, 30);
    assert_eq!(settings.command_timeout(), Duration::from_secs(600));
    assert_eq!(settings.menu_style, MenuStyle::Inline);
    assert_eq!(settings.base_tools, vec!["vim", "curl", "htop"]);
    assert_eq!(settings.package_manager, "apt-get");
    assert_eq!(settings.api_url, "https://api.telegram.org");
}

#[test]
fn env_overrides_defaults() {
    let mut settings = Settings::default();
    settings
        .apply_env(env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("ADMIN_CHAT_ID", "4242"),
            ("POLL_TIMEOUT_SECONDS", "45"),
            ("COMMAND_TIMEOUT_SECONDS", "90"),
            ("MENU_STYLE", "Reply"),
            ("BASE_TOOLS", " git, jq ,,tmux "),
            ("TELEGRAM_API_URL", "http://127.0.0.1:8081"),
        ]))
        .expect("apply env");

    assert_eq!(settings.bot_token, "123:abc");
    assert_eq!(settings.admin_chat_id, 4242);
    assert_eq!(settings.poll_timeout_seconds, 45);
    assert_eq!(settings.command_timeout_seconds, 90);
    assert_eq!(settings.menu_style, MenuStyle::Reply);
    assert_eq!(settings.base_tools, vec!["git", "jq", "tmux"]);
    assert_eq!(settings.api_url, "http://127.0.0.1:8081");
}

#[test]
fn app_prefixed_aliases_win() {
    let mut settings = Settings::default();
    settings
        .apply_env(env(&[
            ("TELEGRAM_BOT_TOKEN", "plain"),
            ("APP__BOT_TOKEN", "aliased"),
            ("ADMIN_CHAT_ID", "1"),
            ("APP__ADMIN_CHAT_ID", "2"),
        ]))
        .expect("apply env");
    assert_eq!(settings.bot_token, "aliased");
    assert_eq!(settings.admin_chat_id, 2);
}

#[test]
fn bad_timeouts_keep_defaults() {
    for raw in ["0", "-5", "soon", ""] {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("POLL_TIMEOUT_SECONDS", raw),
                ("COMMAND_TIMEOUT_SECONDS", raw),
            ]))
            .expect("apply env");
        assert_eq!(settings.poll_timeout_seconds, 30, "{raw:?}");
        assert_eq!(settings.command_timeout_seconds, 600, "{raw:?}");
    }
}

#[test]
fn admin_id_must_be_numeric() {
    let mut settings = Settings::default();
    let err = settings
        .apply_env(env(&[("ADMIN_CHAT_ID", "admin")]))
        .expect_err("non-numeric id");
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    settings
        .apply_env(env(&[("ADMIN_CHAT_ID", "  ")]))
        .expect("blank id");
    assert_eq!(settings.admin_chat_id, 0);
}

#[test]
fn unknown_menu_style_is_rejected() {
    let mut settings = Settings::default();
    let err = settings
        .apply_env(env(&[("MENU_STYLE", "carousel")]))
        .expect_err("bad style");
    assert!(matches!(err, ConfigError::InvalidMenuStyle(style) if style == "carousel"));
}

#[test]
fn file_values_apply_before_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bot.toml");
    fs::write(
        &path,
        r#"
bot_token = "from-file"
admin_chat_id = 7
poll_timeout_seconds = 10
menu_style = "reply"
base_tools = ["git", " "]
package_manager = "dnf"
"#,
    )
    .expect("write config");

    let settings = load_settings_with(Some(path.as_path()), env(&[("ADMIN_CHAT_ID", "8")]))
        .expect("load settings");
    assert_eq!(settings.bot_token, "from-file");
    assert_eq!(settings.admin_chat_id, 8);
    assert_eq!(settings.poll_timeout_seconds, 10);
    assert_eq!(settings.menu_style, MenuStyle::Reply);
    assert_eq!(settings.base_tools, vec!["git"]);
    assert_eq!(settings.package_manager, "dnf");
}

#[test]
fn malformed_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bot.toml");
    fs::write(&path, "bot_tokn = \"typo\"\n").expect("write config");

    let err = load_settings_with(Some(path.as_path()), env(&[])).expect_err("unknown key");
    assert!(matches!(err, ConfigError::File { .. }));
}

#[test]
fn validate_requires_token_and_http_url() {
    let mut settings = load_settings_with(no_file(), env(&[])).expect("defaults");
    settings.bot_token.clear();
    assert!(matches!(settings.validate(), Err(ConfigError::MissingToken)));

    settings.bot_token = "123:abc".into();
    settings.validate().expect("valid");

    settings.api_url = "not a url".into();
    assert!(matches!(
        settings.validate(),
        Err(ConfigError::InvalidApiUrl { .. })
    ));

    settings.api_url = "ftp://api.telegram.org".into();
    assert!(matches!(
        settings.validate(),
        Err(ConfigError::InvalidApiUrl { .. })
    ));
}
