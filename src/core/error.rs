use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Reject negative or non-finite tuning values handed to a state
pub fn non_negative(name: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AgentError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_negative_accepts_zero() {
        assert_eq!(non_negative("wait", 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_non_negative_rejects_negative_and_nan() {
        assert!(non_negative("wait", -1.0).is_err());
        assert!(non_negative("wait", f32::NAN).is_err());
    }

    #[test]
    fn test_error_message_names_parameter() {
        let err = non_negative("hold_secs", -3.0).unwrap_err();
        assert_eq!(err.to_string(), "Invalid parameter hold_secs: -3");
    }
}
