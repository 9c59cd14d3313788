use crate::{PipelineError, PipelineResult};

/// 配置校验接口
pub trait ConfigValidator {
    fn validate(&self) -> PipelineResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> PipelineResult<()> {
        if value.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a duration in seconds is positive and bounded
    pub fn validate_seconds(value: u64, field_name: &str, max: u64) -> PipelineResult<()> {
        if value == 0 {
            return Err(PipelineError::Configuration(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if value > max {
            return Err(PipelineError::Configuration(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Validate that a count is positive and bounded
    pub fn validate_count(count: usize, field_name: &str, max: usize) -> PipelineResult<()> {
        if count == 0 {
            return Err(PipelineError::Configuration(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(PipelineError::Configuration(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Validate that every entry of a list is non-empty
    pub fn validate_entries(values: &[String], field_name: &str) -> PipelineResult<()> {
        for value in values {
            Self::validate_not_empty(value, field_name)?;
        }
        Ok(())
    }

    /// Validate an http(s) base URL
    pub fn validate_http_url(value: &str, field_name: &str) -> PipelineResult<()> {
        Self::validate_not_empty(value, field_name)?;
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(PipelineError::Configuration(format!(
                "{field_name} must start with http:// or https://"
            )));
        }
        Ok(())
    }
}
