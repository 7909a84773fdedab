//! Arena-wide simulation constants.

use crate::unroll::MAX_UNROLLED_COMMANDS;
use serde::{Deserialize, Serialize};

/// Configuration for arena simulation.
///
/// Every field is a policy constant shared by the batch and real-time drivers.
/// Distances are in arena pixels (100 px = 1 m), angles in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Side length of the square arena.
    pub world_size: f64,
    /// Discrete sub-steps per simulated second (batch mode).
    pub fps: f64,
    /// Forward/backward drive speed (px/s).
    pub linear_speed: f64,
    /// Turn rate (deg/s).
    pub turn_rate: f64,
    /// Arm rate (deg/s).
    pub arm_rate: f64,
    /// Robot collision half-extents (across, along the chassis).
    pub robot_half_width: f64,
    pub robot_half_height: f64,
    /// Minimum distance between the robot center and the arena edge.
    pub wall_margin: f64,
    /// Maximum center distance for a lift/grab attempt (exclusive).
    pub interaction_radius: f64,
    /// Maximum center distance for a goal to count as reached (exclusive).
    pub goal_radius: f64,
    /// Carried objects ride this far above the robot center.
    pub carry_offset: f64,
    /// Fraction of a drive sub-step transferred to a pushed block.
    pub push_factor: f64,
    /// Consecutive blocked sub-steps after which a move is abandoned.
    pub max_consecutive_blocks: u32,
    /// Iteration cap for `repeat_forever` when building frames.
    pub batch_forever_cap: usize,
    /// Iteration cap for `repeat_forever` in the tick-driven simulator.
    pub realtime_forever_cap: usize,
    /// Longest program the unroller will produce; expansion stops there.
    pub max_unrolled_commands: usize,
    /// Pixels per millimetre for distances coming from source code.
    pub px_per_mm: f64,
    /// Range of the forward distance sensor.
    pub sensor_range: f64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        let robot_px = 44.0;
        Self {
            world_size: 400.0,
            fps: 30.0,
            linear_speed: 100.0,
            turn_rate: 180.0,
            arm_rate: 120.0,
            robot_half_width: robot_px * 0.45,
            robot_half_height: robot_px * 0.35,
            wall_margin: 4.0,
            interaction_radius: 50.0,
            goal_radius: 40.0,
            carry_offset: 20.0,
            push_factor: 0.8,
            max_consecutive_blocks: 3,
            batch_forever_cap: 3,
            realtime_forever_cap: 20,
            max_unrolled_commands: MAX_UNROLLED_COMMANDS,
            px_per_mm: 0.5,
            sensor_range: 200.0,
        }
    }
}

impl ArenaConfig {
    /// Distance a pushable block travels per batch drive sub-step.
    pub fn push_distance(&self) -> f64 {
        self.linear_speed / self.fps * self.push_factor
    }

    /// Number of frames for a fixed-length visual burst of `seconds`.
    pub fn burst(&self, seconds: f64) -> usize {
        (self.fps * seconds).round().max(0.0) as usize
    }
}
