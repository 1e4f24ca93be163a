use craftquote_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => format!(
            "effective config (source precedence: env > file > default):\n{}",
            config.redacted_summary()
        ),
        Err(error) => format!("config validation failed: {error}"),
    }
}
