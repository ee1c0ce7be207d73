//! Pure court physics: ball movement, wall and paddle contact, scoring, serving.
//!
//! Positions are the top-left corner of the ball's square, velocities are in
//! court units per tick. Nothing here touches room or registry state.

use pong_shared::config::{
    BALL_SIZE, COURT_HEIGHT, COURT_WIDTH, MAX_SERVE_VY, PADDLE_HEIGHT, PADDLE_WIDTH, SERVE_SPEED,
};
use pong_shared::protocol::Side;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Ball {
    /// A ball at the centre of the court with the given velocity.
    pub fn centered(vx: f64, vy: f64) -> Self {
        Self {
            x: COURT_WIDTH / 2.0,
            y: COURT_HEIGHT / 2.0,
            vx,
            vy,
        }
    }
}

/// A paddle as seen by the collision test: its side fixes the x-band,
/// `offset` is the y of its top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub side: Side,
    pub offset: f64,
}

/// Paddle offset a player starts with (paddle vertically centred).
pub fn initial_paddle_offset() -> f64 {
    COURT_HEIGHT / 2.0 - PADDLE_HEIGHT / 2.0
}

/// Clamp a raw input coordinate into `[0, COURT_HEIGHT - PADDLE_HEIGHT]`.
/// Returns `None` for NaN or infinite input.
pub fn clamp_paddle_offset(y: f64) -> Option<f64> {
    if !y.is_finite() {
        return None;
    }
    Some(y.clamp(0.0, COURT_HEIGHT - PADDLE_HEIGHT))
}

pub fn advance(ball: Ball) -> Ball {
    Ball {
        x: ball.x + ball.vx,
        y: ball.y + ball.vy,
        ..ball
    }
}

/// Flip `vy` when the leading edge has reached the top or bottom wall.
pub fn reflect_off_walls(ball: Ball) -> Ball {
    let hits_top = ball.y <= 0.0 && ball.vy < 0.0;
    let hits_bottom = ball.y + BALL_SIZE >= COURT_HEIGHT && ball.vy > 0.0;
    if hits_top || hits_bottom {
        Ball {
            vy: -ball.vy,
            ..ball
        }
    } else {
        ball
    }
}

/// Axis-aligned overlap between the ball square and the paddle rectangle.
///
/// A ball that is already entirely past the court edge never collides, so a
/// court exit is always scored.
pub fn collides_with_paddle(ball: &Ball, paddle: &Paddle) -> bool {
    let overlaps_y =
        ball.y + BALL_SIZE >= paddle.offset && ball.y <= paddle.offset + PADDLE_HEIGHT;
    let overlaps_x = match paddle.side {
        Side::Left => ball.x <= PADDLE_WIDTH && ball.x + BALL_SIZE >= 0.0,
        Side::Right => ball.x + BALL_SIZE >= COURT_WIDTH - PADDLE_WIDTH && ball.x <= COURT_WIDTH,
    };
    overlaps_x && overlaps_y
}

/// Send the ball back from a paddle it is moving into, pinning it to the
/// paddle face so it cannot tunnel through on the next tick.
pub fn bounce_off_paddle(ball: Ball, paddle: &Paddle) -> Ball {
    let approaching = match paddle.side {
        Side::Left => ball.vx < 0.0,
        Side::Right => ball.vx > 0.0,
    };
    if !approaching || !collides_with_paddle(&ball, paddle) {
        return ball;
    }
    let x = match paddle.side {
        Side::Left => PADDLE_WIDTH,
        Side::Right => COURT_WIDTH - PADDLE_WIDTH - BALL_SIZE,
    };
    Ball {
        x,
        vx: -ball.vx,
        ..ball
    }
}

/// The court edge the ball has passed, if any.
pub fn court_exit(ball: &Ball) -> Option<Side> {
    if ball.x < 0.0 {
        Some(Side::Left)
    } else if ball.x > COURT_WIDTH {
        Some(Side::Right)
    } else {
        None
    }
}

/// Re-centre the ball after a point, departing toward `toward`.
/// The vertical speed is resampled uniformly from `[-MAX_SERVE_VY, MAX_SERVE_VY]`.
pub fn reset_ball(toward: Side, rng: &mut impl Rng) -> Ball {
    let direction = match toward {
        Side::Left => -1.0,
        Side::Right => 1.0,
    };
    Ball::centered(
        direction * SERVE_SPEED,
        rng.gen_range(-MAX_SERVE_VY..=MAX_SERVE_VY),
    )
}

/// Opening serve of a match: random horizontal direction.
pub fn serve(rng: &mut impl Rng) -> Ball {
    let toward = if rng.gen_bool(0.5) {
        Side::Right
    } else {
        Side::Left
    };
    reset_ball(toward, rng)
}
