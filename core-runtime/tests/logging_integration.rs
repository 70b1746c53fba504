//! Integration tests for logging system

use core_runtime::logging::{init_logging, strip_path, LogFormat, LogLevel, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_logging_initializes_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_spans(false);

    // First initialization in this test binary succeeds, the second is rejected
    init_logging(config.clone()).unwrap();
    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Config(_))));

    tracing::info!(key = "bgm.theme", "logging initialized");
}

#[test]
fn test_path_stripping() {
    // Unix paths
    assert_eq!(strip_path("/home/user/assets/bgm.title.ogg"), "bgm.title.ogg");
    assert_eq!(strip_path("/var/log/app.log"), "app.log");

    // Windows paths
    assert_eq!(strip_path("C:\\Games\\Audio\\sfx.jump.wav"), "sfx.jump.wav");

    // Already basename
    assert_eq!(strip_path("sfx.coin.wav"), "sfx.coin.wav");

    // Edge cases
    assert_eq!(strip_path("/var/log/"), "");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[cfg(not(debug_assertions))]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_catalog=debug,core_playback=trace")
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(
        config.filter,
        Some("core_catalog=debug,core_playback=trace".to_string())
    );
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
