use clap::Parser;
use hnefatafl::cli::{Cli, Commands, Config};
use hnefatafl::game::Side;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_play_command_parses() {
    let cli = Cli::try_parse_from([
        "hnefatafl", "play", "--room", "1234", "--name", "Astrid", "--port", "9000",
    ])
    .unwrap();

    match cli.command {
        Commands::Play {
            room,
            name,
            host,
            port,
        } => {
            assert_eq!(room, "1234");
            assert_eq!(name, "Astrid");
            assert_eq!(host, None);
            assert_eq!(port, Some(9000));
        }
        _ => panic!("expected play"),
    }
}

#[test]
fn test_play_requires_room_and_name() {
    assert!(Cli::try_parse_from(["hnefatafl", "play", "--room", "1"]).is_err());
    assert!(Cli::try_parse_from(["hnefatafl", "play", "--name", "A"]).is_err());
}

#[test]
fn test_global_config_flag() {
    let cli =
        Cli::try_parse_from(["hnefatafl", "relay", "--config", "/tmp/relay.toml"]).unwrap();
    assert_eq!(
        cli.config.as_deref(),
        Some(std::path::Path::new("/tmp/relay.toml"))
    );
    assert!(matches!(cli.command, Commands::Relay { bind: None }));

    let cli = Cli::try_parse_from(["hnefatafl", "local"]).unwrap();
    assert!(cli.config.is_none());
    assert!(matches!(cli.command, Commands::Local));
}

#[test]
fn test_config_file_feeds_relay_and_client_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        "join_timeout_secs = 5\nopening_side = \"ATTACKER\"\nconnect_timeout_ms = 750\n",
    )
    .unwrap();

    let config = Config::load_or_default(Some(&path)).unwrap();
    let relay = config.relay_config();
    assert_eq!(relay.join_timeout, Duration::from_secs(5));
    assert_eq!(relay.opening_side, Side::Attacker);
    assert_eq!(
        config.client_config().connect_timeout,
        Duration::from_millis(750)
    );

    let request = config.join_request("7".into(), "Bjorn".into(), Some("relay.local".into()), None);
    assert_eq!(request.addr(), "relay.local:8765");
}
