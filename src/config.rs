use std::env;

/// Runtime configuration, read once at startup.
///
/// Everything comes from the environment so deployments can point the client
/// at a different inventory API without a rebuild:
///
/// * `STORAGE_APP_BIND` - listen address, default `127.0.0.1:3000`
/// * `STORAGE_API_URL` - base URL of the remote inventory REST API,
///   default `http://127.0.0.1:8000`
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Config {
        Config {
            bind_addr: env::var("STORAGE_APP_BIND")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            api_base_url: env::var("STORAGE_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // Env vars are process-global; only assert the defaults when the
        // variables are genuinely unset.
        if env::var("STORAGE_APP_BIND").is_err() && env::var("STORAGE_API_URL").is_err() {
            let config = Config::from_env();
            assert_eq!(config.bind_addr, "127.0.0.1:3000");
            assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        }
    }
}
