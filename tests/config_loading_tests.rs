//! Exercises `config::load()`'s environment-variable precedence end to end. Mutates
//! process-global env vars, so every test here is `#[serial]` (spec §4.8/ambient config
//! loading has no file-system fixture of its own — these env vars are the only knobs).

use dicee_server::config;
use serial_test::serial;

fn clear_dicee_env() {
    let keys: Vec<String> = std::env::vars()
        .map(|(k, _)| k)
        .filter(|k| k.starts_with("DICEE_"))
        .collect();
    for key in keys {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn dicee_config_json_overrides_defaults() {
    clear_dicee_env();
    std::env::set_var("DICEE_CONFIG_JSON", r#"{"port": 9321}"#);

    let cfg = config::load();
    assert_eq!(cfg.port, 9321);

    clear_dicee_env();
}

#[test]
#[serial]
fn dicee_double_underscore_env_override_takes_precedence_over_json() {
    clear_dicee_env();
    std::env::set_var("DICEE_CONFIG_JSON", r#"{"port": 9321}"#);
    std::env::set_var("DICEE__PORT", "9999");

    let cfg = config::load();
    assert_eq!(cfg.port, 9999, "DICEE__ env override should win over DICEE_CONFIG_JSON");

    clear_dicee_env();
}

#[test]
#[serial]
fn dicee_nested_env_override_reaches_room_config() {
    clear_dicee_env();
    std::env::set_var("DICEE__ROOM__MAX_PLAYERS_CEILING", "12");

    let cfg = config::load();
    assert_eq!(cfg.room.max_players_ceiling, 12);

    clear_dicee_env();
}

#[test]
#[serial]
fn malformed_config_json_falls_back_to_defaults_rather_than_panicking() {
    clear_dicee_env();
    std::env::set_var("DICEE_CONFIG_JSON", "{ this is not valid json");

    let defaults = config::Config::default();
    let cfg = config::load();
    assert_eq!(cfg.port, defaults.port);

    clear_dicee_env();
}

#[test]
#[serial]
fn no_env_vars_set_yields_compiled_in_defaults() {
    clear_dicee_env();

    let cfg = config::load();
    let defaults = config::Config::default();
    assert_eq!(cfg.port, defaults.port);
    assert_eq!(cfg.room.max_players_ceiling, defaults.room.max_players_ceiling);
}
