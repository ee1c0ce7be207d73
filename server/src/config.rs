use pong_shared::config::TICK_RATE_HZ;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// Fixed seed for reproducible serves; `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
    /// Text frames larger than this close the session.
    pub max_message_bytes: usize,
    /// Unparsable messages tolerated before the session is closed.
    pub max_parse_errors: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4000".to_string(),
            tick_rate_hz: TICK_RATE_HZ,
            rng_seed: None,
            max_message_bytes: 1024,
            max_parse_errors: 5,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT` and `PONG_RNG_SEED`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(port) = var("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| format!("PORT must be a port number, got {:?}", port))?;
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(seed) = var("PONG_RNG_SEED") {
            let seed: u64 = seed
                .trim()
                .parse()
                .map_err(|_| {
                    format!("PONG_RNG_SEED must be an unsigned integer, got {:?}", seed)
                })?;
            config.rng_seed = Some(seed);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err("tick_rate_hz must be in 1..=1000".to_string());
        }
        if self.max_message_bytes == 0 {
            return Err("max_message_bytes must be > 0".to_string());
        }
        Ok(())
    }
}
