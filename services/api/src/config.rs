//! Service configuration read from the environment

use std::env;
use std::time::Duration;

/// API service configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to listen on
    pub bind_addr: String,
    /// Port to listen on
    pub port: u16,
    /// FoodData Central search endpoint
    pub usda_api_url: String,
    /// FoodData Central API key
    pub usda_api_key: String,
    /// Upper bound on a remote nutrition lookup
    pub nutrition_timeout: Duration,
}

impl ApiConfig {
    /// Create a new ApiConfig from environment variables
    ///
    /// # Environment Variables
    /// - `BIND_ADDR`: Listen address (default: "0.0.0.0")
    /// - `PORT`: Listen port (default: 5000)
    /// - `USDA_API_URL`: Search endpoint (default: FoodData Central v1 search)
    /// - `USDA_API_KEY`: API key (default: "DEMO_KEY")
    /// - `NUTRITION_TIMEOUT_SECS`: Remote lookup timeout in seconds (default: 5)
    pub fn from_env() -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        let usda_api_url = env::var("USDA_API_URL")
            .unwrap_or_else(|_| "https://api.nal.usda.gov/fdc/v1/foods/search".to_string());

        let usda_api_key = env::var("USDA_API_KEY").unwrap_or_else(|_| "DEMO_KEY".to_string());

        let nutrition_timeout = env::var("NUTRITION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(5);

        Self {
            bind_addr,
            port,
            usda_api_url,
            usda_api_key,
            nutrition_timeout: Duration::from_secs(nutrition_timeout),
        }
    }

    /// `host:port` string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "BIND_ADDR",
        "PORT",
        "USDA_API_URL",
        "USDA_API_KEY",
        "NUTRITION_TIMEOUT_SECS",
    ];

    #[test]
    #[serial]
    fn test_api_config_defaults() {
        unsafe {
            for var in VARS {
                env::remove_var(var);
            }
        }

        let config = ApiConfig::from_env();
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert_eq!(config.usda_api_key, "DEMO_KEY");
        assert_eq!(config.nutrition_timeout, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_api_config_from_env_with_custom_values() {
        unsafe {
            env::set_var("PORT", "8080");
            env::set_var("USDA_API_KEY", "abc");
            env::set_var("NUTRITION_TIMEOUT_SECS", "0");
        }

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.usda_api_key, "abc");
        assert_eq!(config.nutrition_timeout, Duration::from_secs(5));

        unsafe {
            for var in VARS {
                env::remove_var(var);
            }
        }
    }
}
