use crate::config::types::{
    AnalyzerConfig, Config, PipelineConfig, RenderConfig, ScheduleConfig, ThumbnailConfig,
    UserAgentConfig,
};
use crate::schedule::parse_daily_at;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline_config(&config.pipeline)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(config)?;
    validate_thumbnail_config(&config.thumbnail)?;
    validate_render_config(&config.render)?;
    validate_analyzer_config(&config.analyzer)?;
    validate_schedule_config(&config.schedule)?;

    if config.storage.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "storage path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates worker pool settings
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.capture_concurrency < 1 || config.capture_concurrency > config.workers {
        return Err(ConfigError::Validation(format!(
            "capture_concurrency must be between 1 and workers ({}), got {}",
            config.workers, config.capture_concurrency
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &Config) -> Result<(), ConfigError> {
    if config.fetch.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch timeout_secs must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    let name = &config.crawler_name;
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "crawler_name must be non-empty alphanumeric characters and hyphens, got '{}'",
            name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_thumbnail_config(config: &ThumbnailConfig) -> Result<(), ConfigError> {
    if config.width == 0 || config.height == 0 {
        return Err(ConfigError::Validation(format!(
            "thumbnail size must be non-zero, got {}x{}",
            config.width, config.height
        )));
    }

    if config.jpeg_quality == 0 || config.jpeg_quality > 100 {
        return Err(ConfigError::Validation(format!(
            "jpeg_quality must be between 1 and 100, got {}",
            config.jpeg_quality
        )));
    }

    if config.dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "thumbnail dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if config.max_pages < 1 || config.max_pages > 16 {
        return Err(ConfigError::Validation(format!(
            "render max_pages must be between 1 and 16, got {}",
            config.max_pages
        )));
    }

    if config.attempts < 1 {
        return Err(ConfigError::Validation(
            "render attempts must be >= 1".to_string(),
        ));
    }

    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(
            "render viewport must be non-zero".to_string(),
        ));
    }

    if let Some(remote) = &config.remote_url {
        Url::parse(remote)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid render remote_url: {}", e)))?;
    }

    Ok(())
}

fn validate_analyzer_config(config: &AnalyzerConfig) -> Result<(), ConfigError> {
    if config.max_keywords == 0 {
        return Err(ConfigError::Validation(
            "max_keywords must be >= 1".to_string(),
        ));
    }

    for theme in &config.themes {
        if theme.name.trim().is_empty() || theme.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "theme '{}' has an empty name or keyword",
                theme.name
            )));
        }
    }

    for tech in &config.technologies {
        if tech.name.trim().is_empty() || tech.patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "technology '{}' has an empty name or pattern",
                tech.name
            )));
        }
    }

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if let Some(daily_at) = &config.daily_at {
        parse_daily_at(daily_at).ok_or_else(|| {
            ConfigError::Validation(format!(
                "daily_at must be a time of day as HH:MM, got '{}'",
                daily_at
            ))
        })?;
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ConfigError> {
    match email.split_once('@') {
        Some((local, host)) if !local.is_empty() && host.contains('.') && !host.contains('@') => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "contact_email must look like user@host, got '{}'",
            email
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@sub.example.com").is_ok());

        for bad in ["", "invalid", "@example.com", "user@", "user@domain", "a@b@c.com"] {
            assert!(validate_email(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_capture_concurrency_bounded_by_workers() {
        let mut pipeline = PipelineConfig::default();
        assert!(validate_pipeline_config(&pipeline).is_ok());

        pipeline.workers = 2;
        pipeline.capture_concurrency = 3;
        assert!(validate_pipeline_config(&pipeline).is_err());

        pipeline.capture_concurrency = 0;
        assert!(validate_pipeline_config(&pipeline).is_err());
    }

    #[test]
    fn test_disabled_render_skips_checks() {
        let render = RenderConfig {
            max_pages: 0,
            ..RenderConfig::default()
        };
        assert!(validate_render_config(&render).is_ok());

        let render = RenderConfig {
            enabled: true,
            max_pages: 0,
            ..RenderConfig::default()
        };
        assert!(validate_render_config(&render).is_err());
    }

    #[test]
    fn test_schedule_time_format() {
        let ok = ScheduleConfig {
            daily_at: Some("16:00".to_string()),
        };
        assert!(validate_schedule_config(&ok).is_ok());

        let bad = ScheduleConfig {
            daily_at: Some("4pm".to_string()),
        };
        assert!(validate_schedule_config(&bad).is_err());
    }
}
