//! Configuration resolution tests
//!
//! Note: serial_test prevents ENV variable race conditions between tests
//! that manipulate SHADOWPLAY_ROOT_FOLDER / SHADOWPLAY_RELAY.

use serial_test::serial;
use shadowplay_common::config::{resolve_relay_url, resolve_root_folder, DEFAULT_RELAY_URL};
use std::env;
use std::path::PathBuf;

#[test]
#[serial]
fn cli_argument_wins_over_everything() {
    env::set_var("SHADOWPLAY_ROOT_FOLDER", "/tmp/shadowplay-env");
    let resolved = resolve_root_folder(Some("/tmp/shadowplay-cli"), "SHADOWPLAY_ROOT_FOLDER").unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/shadowplay-cli"));
    env::remove_var("SHADOWPLAY_ROOT_FOLDER");
}

#[test]
#[serial]
fn environment_variable_wins_over_default() {
    env::set_var("SHADOWPLAY_ROOT_FOLDER", "/tmp/shadowplay-env");
    let resolved = resolve_root_folder(None, "SHADOWPLAY_ROOT_FOLDER").unwrap();
    assert_eq!(resolved, PathBuf::from("/tmp/shadowplay-env"));
    env::remove_var("SHADOWPLAY_ROOT_FOLDER");
}

#[test]
#[serial]
fn missing_overrides_fall_back_to_a_nonempty_default() {
    env::remove_var("SHADOWPLAY_ROOT_FOLDER");
    let resolved = resolve_root_folder(None, "SHADOWPLAY_ROOT_FOLDER").unwrap();
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
#[serial]
fn relay_url_resolution_order() {
    env::remove_var("SHADOWPLAY_RELAY");
    assert_eq!(resolve_relay_url(None), DEFAULT_RELAY_URL);

    env::set_var("SHADOWPLAY_RELAY", "ws://10.0.0.2:5830/ws");
    assert_eq!(resolve_relay_url(None), "ws://10.0.0.2:5830/ws");
    assert_eq!(resolve_relay_url(Some("ws://cli:1/ws")), "ws://cli:1/ws");
    env::remove_var("SHADOWPLAY_RELAY");
}
