//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Polar)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Polar API access token (polar_oat_... / polar_pat_...)
    pub polar_access_token: String,

    /// Polar API environment selector: "sandbox" or "production"
    #[serde(default = "default_polar_environment")]
    pub polar_environment: String,

    /// Webhook signing secret shared with Polar
    pub polar_webhook_secret: String,
}

impl PaymentConfig {
    /// Check if targeting the Polar sandbox
    pub fn is_sandbox(&self) -> bool {
        self.polar_environment == "sandbox"
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.polar_access_token.is_empty() {
            return Err(ValidationError::MissingRequired("POLAR_ACCESS_TOKEN"));
        }
        if self.polar_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("POLAR_WEBHOOK_SECRET"));
        }

        // Verify token prefix for safety
        if !self.polar_access_token.starts_with("polar_") {
            return Err(ValidationError::InvalidPolarToken);
        }
        if self.polar_environment != "sandbox" && self.polar_environment != "production" {
            return Err(ValidationError::InvalidPolarEnvironment);
        }

        Ok(())
    }
}

fn default_polar_environment() -> String {
    "sandbox".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PaymentConfig {
        PaymentConfig {
            polar_access_token: "polar_oat_abcd1234".to_string(),
            polar_environment: "sandbox".to_string(),
            polar_webhook_secret: "whsec_dGVzdF9zZWNyZXQ=".to_string(),
        }
    }

    #[test]
    fn test_is_sandbox() {
        let config = valid_config();
        assert!(config.is_sandbox());

        let config = PaymentConfig {
            polar_environment: "production".to_string(),
            ..valid_config()
        };
        assert!(!config.is_sandbox());
    }

    #[test]
    fn test_validation_missing_access_token() {
        let config = PaymentConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_missing_webhook_secret() {
        let config = PaymentConfig {
            polar_webhook_secret: String::new(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_token_prefix() {
        let config = PaymentConfig {
            polar_access_token: "sk_test_xxx".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_environment() {
        let config = PaymentConfig {
            polar_environment: "staging".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid_config().validate().is_ok());
    }
}
