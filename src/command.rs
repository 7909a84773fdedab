//! Command primitives: the instruction vocabulary shared by every input source.

use serde::{Deserialize, Serialize};

/// The action a [`CommandPrimitive`] asks the robot to perform.
///
/// Unrecognized intent strings deserialize to [`Intent::Unknown`] and are
/// skipped by both interpreters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    // --- Motion ---
    Move,
    Turn,
    RotateBase,
    Stop,
    Wait,

    // --- Manipulator ---
    ArmUp,
    ArmDown,
    MotorAngle,
    RunMotor,
    ClawClose,
    ClawOpen,

    // --- Feedback ---
    Beep,
    Say,
    Light,
    LightOff,

    // --- Sensor cues (never branch) ---
    IfColor,
    IfDistance,
    IfButton,
    IfForce,
    IfTouched,
    IfReflection,
    IfAmbient,

    // --- Flow ---
    Repeat,
    RepeatForever,
    StopRepeat,

    #[serde(other)]
    Unknown,
}

impl Intent {
    /// Opens a loop block closed by [`Intent::StopRepeat`].
    pub fn opens_loop(self) -> bool {
        matches!(self, Intent::Repeat | Intent::RepeatForever)
    }

    /// One of the `if_*` sensor checks.
    pub fn is_sensor_check(self) -> bool {
        matches!(
            self,
            Intent::IfColor
                | Intent::IfDistance
                | Intent::IfButton
                | Intent::IfForce
                | Intent::IfTouched
                | Intent::IfReflection
                | Intent::IfAmbient
        )
    }

    /// Event/wire name, e.g. `arm_up`.
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Move => "move",
            Intent::Turn => "turn",
            Intent::RotateBase => "rotate_base",
            Intent::Stop => "stop",
            Intent::Wait => "wait",
            Intent::ArmUp => "arm_up",
            Intent::ArmDown => "arm_down",
            Intent::MotorAngle => "motor_angle",
            Intent::RunMotor => "run_motor",
            Intent::ClawClose => "claw_close",
            Intent::ClawOpen => "claw_open",
            Intent::Beep => "beep",
            Intent::Say => "say",
            Intent::Light => "light",
            Intent::LightOff => "light_off",
            Intent::IfColor => "if_color",
            Intent::IfDistance => "if_distance",
            Intent::IfButton => "if_button",
            Intent::IfForce => "if_force",
            Intent::IfTouched => "if_touched",
            Intent::IfReflection => "if_reflection",
            Intent::IfAmbient => "if_ambient",
            Intent::Repeat => "repeat",
            Intent::RepeatForever => "repeat_forever",
            Intent::StopRepeat => "stop_repeat",
            Intent::Unknown => "unknown",
        }
    }
}

/// Travel or rotation direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    /// `-1` for backward/left, `+1` otherwise.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Backward | Direction::Left => -1.0,
            Direction::Forward | Direction::Right => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Threshold comparison used by reflection/ambient sensor cues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Greater,
    Less,
    Dark,
    Bright,
}

/// Intent-specific parameters. Absent keys fall back to per-intent defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slots {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Signed straight-line distance; overrides `duration` for moves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_mm: Option<f64>,
}

/// One atomic robot instruction. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandPrimitive {
    pub id: u32,
    pub intent: Intent,
    #[serde(default)]
    pub slots: Slots,
    /// Display string, e.g. `"move forward 1.5s"`.
    #[serde(default)]
    pub raw: String,
}

impl CommandPrimitive {
    pub fn new(id: u32, intent: Intent, slots: Slots, raw: impl Into<String>) -> Self {
        Self {
            id,
            intent,
            slots,
            raw: raw.into(),
        }
    }

    /// A primitive with no slots.
    pub fn bare(id: u32, intent: Intent) -> Self {
        Self::new(id, intent, Slots::default(), intent.as_str())
    }

    pub fn direction(&self) -> Direction {
        self.slots.direction.unwrap_or(match self.intent {
            Intent::Turn | Intent::RotateBase => Direction::Right,
            _ => Direction::Forward,
        })
    }

    /// Arm target for `arm_up`, `arm_down` and `motor_angle`.
    pub fn arm_target(&self) -> f64 {
        self.slots.angle.unwrap_or(match self.intent {
            Intent::ArmDown => 0.0,
            _ => 90.0,
        })
    }

    pub fn phrase(&self) -> &str {
        self.slots.phrase.as_deref().unwrap_or("hello")
    }

    pub fn color(&self) -> &str {
        self.slots.color.as_deref().unwrap_or("blue")
    }

    pub fn power(&self) -> f64 {
        self.slots.power.unwrap_or(50.0)
    }

    /// Iteration count for `repeat`; missing means once.
    pub fn times(&self) -> usize {
        self.slots.times.unwrap_or(1) as usize
    }
}
