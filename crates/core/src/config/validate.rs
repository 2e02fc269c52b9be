use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Scheduler tick interval is positive
/// - Default speed estimate is a positive finite number
/// - Mover buffer size is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.scheduler.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.tick_interval_ms must be greater than 0".to_string(),
        ));
    }

    let speed = config.scheduler.default_speed_bps;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ConfigError::ValidationError(
            "scheduler.default_speed_bps must be a positive number".to_string(),
        ));
    }

    if config.mover.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "mover.buffer_size must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                port: 0,
                ..ServerConfig::default()
            },
            ..Config::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_tick_fails() {
        let mut config = Config::default();
        config.scheduler.tick_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_speed() {
        let mut config = Config::default();
        config.scheduler.default_speed_bps = 0.0;
        assert!(validate_config(&config).is_err());

        config.scheduler.default_speed_bps = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_buffer_fails() {
        let mut config = Config::default();
        config.mover.buffer_size = 0;
        assert!(validate_config(&config).is_err());
    }
}
