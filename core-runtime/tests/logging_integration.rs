//! Integration tests for logging system

use core_runtime::logging::{
    init_logging, strip_path, LogEntry, LogFormat, LogLevel, LoggerSink, LoggingConfig,
};
use core_runtime::{Error, Result};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl LoggerSink for CollectingSink {
    fn log(&self, entry: LogEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|e| Error::Sink(e.to_string()))?
            .push(entry);
        Ok(())
    }
}

#[test]
fn test_global_init_forwards_and_rejects_second_init() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::info!(target: "core_decode::controller", path = "/srv/audio/take1.wav", "decode finished");
    tracing::info!(target: "unrelated_crate", "filtered out");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "decode finished");
        assert_eq!(entries[0].fields.get("path"), Some(&"take1.wav".to_string()));
    }

    let again = init_logging(LoggingConfig::default());
    assert!(matches!(again, Err(Error::Config(_))));
}

#[test]
fn test_log_entry_serializes() {
    let entry = LogEntry::new(LogLevel::Warn, "core_decode::opener", "no audio stream")
        .with_field("codec", "h264")
        .with_span("get_properties");

    let json = serde_json::to_value(&entry).unwrap();

    assert_eq!(json["level"], "Warn");
    assert_eq!(json["target"], "core_decode::opener");
    assert_eq!(json["fields"]["codec"], "h264");
    assert_eq!(json["span"], "get_properties");
}

#[test]
fn test_path_stripping() {
    // Unix paths
    assert_eq!(strip_path("/home/user/music/song.mp3"), "song.mp3");
    assert_eq!(strip_path("/var/log/app.log"), "app.log");

    // Windows paths
    assert_eq!(strip_path("C:\\Users\\John\\Music\\song.mp3"), "song.mp3");
    assert_eq!(strip_path("D:\\data\\file.txt"), "file.txt");

    // Already basename
    assert_eq!(strip_path("filename.txt"), "filename.txt");

    // Edge cases
    assert_eq!(strip_path("/var/log/"), "");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_path_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_paths);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
