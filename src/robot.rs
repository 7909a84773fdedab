//! Robot pose and capability profile.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Heading (degrees) that points "up" the arena (screen coordinates, +Y down).
pub const HEADING_UP: f64 = -90.0;

/// Kinematic state of the robot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotPose {
    /// Center of the chassis in arena pixels.
    pub position: DVec2,
    /// Unbounded; wrap with [`RobotPose::display_heading`] for display only.
    pub heading: f64,
    /// Arm elevation, always within `[0, 180]`.
    pub arm_angle: f64,
    pub claw_open: bool,
    /// Id of the obstacle currently carried by the arm or claw.
    pub carrying: Option<String>,
    /// Active light color, `None` when off.
    pub light: Option<String>,
}

impl RobotPose {
    /// Robot parked at `position`, facing up, arm lowered, claw open.
    pub fn at(position: DVec2) -> Self {
        Self {
            position,
            heading: HEADING_UP,
            arm_angle: 0.0,
            claw_open: true,
            carrying: None,
            light: None,
        }
    }

    /// Unit vector along the heading.
    pub fn forward(&self) -> DVec2 {
        heading_vector(self.heading)
    }

    /// Heading wrapped into `[0, 360)`.
    pub fn display_heading(&self) -> f64 {
        self.heading.rem_euclid(360.0)
    }
}

pub fn heading_vector(heading_deg: f64) -> DVec2 {
    let rad = heading_deg.to_radians();
    DVec2::new(rad.cos(), rad.sin())
}

/// What the robot hardware can do; gates lift and grab interactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotCapabilities {
    pub has_drive: bool,
    pub has_arm: bool,
    pub has_claw: bool,
    pub has_color_light_matrix: bool,
}

impl Default for RobotCapabilities {
    fn default() -> Self {
        Self {
            has_drive: true,
            has_arm: false,
            has_claw: false,
            has_color_light_matrix: false,
        }
    }
}

impl RobotCapabilities {
    /// Everything enabled.
    pub fn full() -> Self {
        Self {
            has_drive: true,
            has_arm: true,
            has_claw: true,
            has_color_light_matrix: true,
        }
    }

    /// Derives capabilities from the roles plugged into the hub ports.
    ///
    /// Drive requires both wheels; a grabber does not count as a claw.
    pub fn from_ports(roles: &[PortRole]) -> Self {
        let has = |r: PortRole| roles.contains(&r);
        Self {
            has_drive: has(PortRole::WheelLeft) && has(PortRole::WheelRight),
            has_arm: has(PortRole::Arm),
            has_claw: has(PortRole::Claw),
            has_color_light_matrix: has(PortRole::ColorLightMatrix),
        }
    }
}

/// Role assigned to a hub port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortRole {
    WheelLeft,
    WheelRight,
    Arm,
    Claw,
    Rotate,
    Grabber,
    Sensor,
    ColorLightMatrix,
    #[serde(other)]
    Empty,
}

/// Stock chassis layouts (ports A-F).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChassisPreset {
    Rover,
    ArmBot,
    Crane,
    Custom,
}

impl ChassisPreset {
    pub fn ports(self) -> [PortRole; 6] {
        use PortRole::*;
        match self {
            ChassisPreset::Rover => [WheelLeft, WheelRight, Arm, Sensor, Empty, Empty],
            ChassisPreset::ArmBot => [WheelLeft, WheelRight, Arm, Claw, Sensor, ColorLightMatrix],
            ChassisPreset::Crane => [Rotate, Arm, Claw, Sensor, Empty, Empty],
            ChassisPreset::Custom => [Empty; 6],
        }
    }

    pub fn capabilities(self) -> RobotCapabilities {
        RobotCapabilities::from_ports(&self.ports())
    }
}
