// src/mixer.rs

//! Four-rotor X mix.
//!
//! Motor positions and the sign of each correction:
//!
//! | motor | roll | pitch | yaw |
//! |-------|------|-------|-----|
//! | 0     | -    | -     | -   |
//! | 1     | -    | +     | +   |
//! | 2     | +    | +     | -   |
//! | 3     | +    | -     | +   |

/// Number of actuator channels.
pub const MOTOR_COUNT: usize = 4;

/// Highest duty value accepted by the PWM driver (10-bit).
pub const DEFAULT_MAX_DUTY: u16 = 1023;

const SIGNS: [[f32; 3]; MOTOR_COUNT] = [
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, 1.0],
];

/// Mixes throttle with `(roll, pitch, yaw)` corrections into duty values,
/// each clamped to `[0, max_duty]`.
pub fn mix_x(throttle: f32, correction: (f32, f32, f32), max_duty: u16) -> [u16; MOTOR_COUNT] {
    let (roll, pitch, yaw) = correction;
    let max = f32::from(max_duty);
    let mut out = [0u16; MOTOR_COUNT];
    for (duty, [r, p, y]) in out.iter_mut().zip(SIGNS) {
        let value = throttle + r * roll + p * pitch + y * yaw;
        // NaN fails both comparisons and clamps to zero
        *duty = if value > 0.0 {
            value.min(max) as u16
        } else {
            0
        };
    }
    out
}
