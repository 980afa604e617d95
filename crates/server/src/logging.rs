use crate::config::Config;

pub fn setup_logging(config: &Config) -> anyhow::Result<()> {
    common::setup_logging(
        &config.log_level,
        &config.environment,
        Some(&config.log_dir),
    )
}
