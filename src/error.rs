//! Error types. Nothing in the simulation core is fatal: parse errors are
//! reported to the caller and interaction failures become in-world warnings.

use crate::obstacle::ObstacleKind;
use thiserror::Error;

/// Structural problem in command source text. Line numbers are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected indent")]
    UnexpectedIndent { line: usize },
    #[error("line {line}: unindent does not match any outer indentation level")]
    InconsistentDedent { line: usize },
}

/// Why a lift or grab attempt did not succeed.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InteractionFailure {
    #[error("No {0} nearby")]
    NothingNearby(ObstacleKind),
    #[error("Robot has no arm")]
    NoArm,
    #[error("Robot has no claw")]
    NoClaw,
    #[error("Arm too low ({angle:.0}° < {min:.0}°)")]
    ArmTooLow { angle: f64, min: f64 },
    #[error("Arm too high ({angle:.0}° > {max:.0}°)")]
    ArmTooHigh { angle: f64, max: f64 },
    #[error("Claw must be closed")]
    ClawMustBeClosed,
    #[error("Claw must be open")]
    ClawMustBeOpen,
}
