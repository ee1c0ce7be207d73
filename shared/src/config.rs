/// Court width in world units.
pub const COURT_WIDTH: f64 = 600.0;
/// Court height in world units.
pub const COURT_HEIGHT: f64 = 400.0;
pub const PADDLE_WIDTH: f64 = 10.0;
pub const PADDLE_HEIGHT: f64 = 80.0;
/// Side length of the (square) ball.
pub const BALL_SIZE: f64 = 10.0;
/// First score to reach this value wins the match.
pub const WIN_SCORE: u32 = 5;
pub const TICK_RATE_HZ: u32 = 60;
/// Horizontal speed of a freshly served ball (units per tick).
pub const SERVE_SPEED: f64 = 4.0;
/// Served balls get a vertical speed sampled from `[-MAX_SERVE_VY, MAX_SERVE_VY]`.
pub const MAX_SERVE_VY: f64 = 3.0;

/// Court geometry as announced to clients in the welcome message.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct CourtConfig {
    pub width: f64,
    pub height: f64,
    pub paddle_width: f64,
    pub paddle_height: f64,
    pub ball_size: f64,
    pub win_score: u32,
    pub tick_rate_hz: u32,
}

impl Default for CourtConfig {
    fn default() -> Self {
        Self {
            width: COURT_WIDTH,
            height: COURT_HEIGHT,
            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,
            ball_size: BALL_SIZE,
            win_score: WIN_SCORE,
            tick_rate_hz: TICK_RATE_HZ,
        }
    }
}

impl CourtConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err("width must be finite and > 0".to_string());
        }
        if !self.height.is_finite() || self.height <= 0.0 {
            return Err("height must be finite and > 0".to_string());
        }
        if self.paddle_height <= 0.0 || self.paddle_height > self.height {
            return Err("paddle_height must be in (0, height]".to_string());
        }
        if self.paddle_width <= 0.0 || self.paddle_width * 2.0 >= self.width {
            return Err("paddle_width must be > 0 and leave room between paddles".to_string());
        }
        if self.ball_size <= 0.0 || self.ball_size >= self.height {
            return Err("ball_size must be in (0, height)".to_string());
        }
        if self.win_score == 0 {
            return Err("win_score must be >= 1".to_string());
        }
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be >= 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_court_config_is_valid() {
        let config = CourtConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn paddle_taller_than_court_invalid() {
        let config = CourtConfig {
            paddle_height: 500.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_win_score_invalid() {
        let config = CourtConfig {
            win_score: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
