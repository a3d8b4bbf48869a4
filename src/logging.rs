// Logger setup for the binaries. The library only emits through `log`.

use log::LevelFilter;

/// Parse a config level name, defaulting to Info
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialise env_logger: RUST_LOG when set, otherwise `level`.
/// Calling it twice is harmless.
pub fn init(level: &str) {
    let default = parse_level(level).to_string().to_lowercase();

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .try_init();
}
