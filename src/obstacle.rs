//! Obstacle type registry and the per-run obstacle arena.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of obstacle a level may place.
///
/// Unknown kind strings deserialize to [`ObstacleKind::Unknown`]; such
/// instances stay in the arena but are inert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Barrier,
    WallH,
    WallV,
    Liftable,
    Grabbable,
    Pushable,
    Goal,
    Ramp,
    ColorZone,
    #[serde(other)]
    Unknown,
}

impl ObstacleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleKind::Barrier => "barrier",
            ObstacleKind::WallH => "wall_h",
            ObstacleKind::WallV => "wall_v",
            ObstacleKind::Liftable => "liftable",
            ObstacleKind::Grabbable => "grabbable",
            ObstacleKind::Pushable => "pushable",
            ObstacleKind::Goal => "goal",
            ObstacleKind::Ramp => "ramp",
            ObstacleKind::ColorZone => "color_zone",
            ObstacleKind::Unknown => "unknown",
        }
    }

    /// Static definition for this kind, `None` for [`ObstacleKind::Unknown`].
    pub fn def(self) -> Option<&'static ObstacleTypeDef> {
        OBSTACLE_TYPES.iter().find(|d| d.kind == self)
    }
}

impl fmt::Display for ObstacleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preconditions for interacting with an obstacle. `None`/`false` means unconditional.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    pub needs_arm: bool,
    pub needs_claw: bool,
    pub arm_angle_min: Option<f64>,
    pub arm_angle_max: Option<f64>,
    pub claw_must_be_open: Option<bool>,
}

impl Requirements {
    const NONE: Self = Self {
        needs_arm: false,
        needs_claw: false,
        arm_angle_min: None,
        arm_angle_max: None,
        claw_must_be_open: None,
    };
}

/// Registry entry describing an obstacle kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ObstacleTypeDef {
    pub kind: ObstacleKind,
    pub label: &'static str,
    pub width: f64,
    pub height: f64,
    pub interactable: bool,
    /// Blocks robot movement on overlap (pushables are displaced instead).
    pub solid: bool,
    pub requires: Requirements,
}

impl ObstacleTypeDef {
    pub fn half_extents(&self) -> DVec2 {
        DVec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// The static obstacle registry.
pub static OBSTACLE_TYPES: [ObstacleTypeDef; 9] = [
    ObstacleTypeDef {
        kind: ObstacleKind::Barrier,
        label: "Barrier",
        width: 40.0,
        height: 40.0,
        interactable: false,
        solid: true,
        requires: Requirements::NONE,
    },
    ObstacleTypeDef {
        kind: ObstacleKind::WallH,
        label: "Wall (H)",
        width: 80.0,
        height: 16.0,
        interactable: false,
        solid: true,
        requires: Requirements::NONE,
    },
    ObstacleTypeDef {
        kind: ObstacleKind::WallV,
        label: "Wall (V)",
        width: 16.0,
        height: 80.0,
        interactable: false,
        solid: true,
        requires: Requirements::NONE,
    },
    ObstacleTypeDef {
        kind: ObstacleKind::Liftable,
        label: "Lift Box",
        width: 30.0,
        height: 30.0,
        interactable: true,
        solid: true,
        requires: Requirements {
            needs_arm: true,
            arm_angle_min: Some(45.0),
            ..Requirements::NONE
        },
    },
    ObstacleTypeDef {
        kind: ObstacleKind::Grabbable,
        label: "Grab Ball",
        width: 24.0,
        height: 24.0,
        interactable: true,
        solid: true,
        requires: Requirements {
            needs_claw: true,
            claw_must_be_open: Some(false),
            ..Requirements::NONE
        },
    },
    ObstacleTypeDef {
        kind: ObstacleKind::Pushable,
        label: "Push Block",
        width: 32.0,
        height: 32.0,
        interactable: true,
        solid: true,
        requires: Requirements::NONE,
    },
    ObstacleTypeDef {
        kind: ObstacleKind::Goal,
        label: "Goal Zone",
        width: 50.0,
        height: 50.0,
        interactable: false,
        solid: false,
        requires: Requirements::NONE,
    },
    // Requirement is informational only: ramps never block movement.
    ObstacleTypeDef {
        kind: ObstacleKind::Ramp,
        label: "Ramp",
        width: 40.0,
        height: 24.0,
        interactable: true,
        solid: false,
        requires: Requirements {
            needs_arm: true,
            arm_angle_max: Some(20.0),
            ..Requirements::NONE
        },
    },
    ObstacleTypeDef {
        kind: ObstacleKind::ColorZone,
        label: "Color Zone",
        width: 60.0,
        height: 60.0,
        interactable: false,
        solid: false,
        requires: Requirements::NONE,
    },
];

/// Level-authored obstacle placement (plain input data).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePlacement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObstacleKind,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ObstaclePlacement {
    pub fn new(id: impl Into<String>, kind: ObstacleKind, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A placed obstacle together with its runtime flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleInstance {
    pub id: String,
    pub kind: ObstacleKind,
    pub position: DVec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Displaced by the robot during the latest drive step.
    pub pushed: bool,
    /// Carried by the arm.
    pub lifted: bool,
    /// Carried by the claw.
    pub grabbed: bool,
}

impl ObstacleInstance {
    pub fn def(&self) -> Option<&'static ObstacleTypeDef> {
        self.kind.def()
    }

    /// Carried objects are excluded from collision testing.
    pub fn is_carried(&self) -> bool {
        self.lifted || self.grabbed
    }
}

impl From<&ObstaclePlacement> for ObstacleInstance {
    fn from(p: &ObstaclePlacement) -> Self {
        Self {
            id: p.id.clone(),
            kind: p.kind,
            position: DVec2::new(p.x, p.y),
            color: p.color.clone(),
            pushed: false,
            lifted: false,
            grabbed: false,
        }
    }
}

/// Index of an instance inside an [`ObstacleArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObstacleHandle(usize);

/// Owned, indexed storage for one simulation run's obstacles.
#[derive(Clone, Debug, Default)]
pub struct ObstacleArena {
    instances: Vec<ObstacleInstance>,
}

impl ObstacleArena {
    pub fn from_placements(placements: &[ObstaclePlacement]) -> Self {
        Self {
            instances: placements.iter().map(ObstacleInstance::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, handle: ObstacleHandle) -> &ObstacleInstance {
        &self.instances[handle.0]
    }

    pub fn get_mut(&mut self, handle: ObstacleHandle) -> &mut ObstacleInstance {
        &mut self.instances[handle.0]
    }

    pub fn handle_of(&self, id: &str) -> Option<ObstacleHandle> {
        self.instances
            .iter()
            .position(|o| o.id == id)
            .map(ObstacleHandle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObstacleHandle, &ObstacleInstance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, o)| (ObstacleHandle(i), o))
    }

    pub fn handles(&self) -> impl Iterator<Item = ObstacleHandle> + use<> {
        (0..self.instances.len()).map(ObstacleHandle)
    }

    pub fn clear_pushed(&mut self) {
        for o in &mut self.instances {
            o.pushed = false;
        }
    }

    /// Deep copy of every instance, in placement order.
    pub fn snapshot(&self) -> Vec<ObstacleInstance> {
        self.instances.clone()
    }
}
