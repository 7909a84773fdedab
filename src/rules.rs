//! World rules shared by the batch and real-time drivers.
//!
//! [`ArenaWorld`] owns one run's robot pose and obstacle arena and applies
//! every state transition that both schedulers need: collision resolution,
//! interaction validation, carrying, goal evaluation and sensor readings.
//! The drivers only decide *when* to apply them.

use crate::config::ArenaConfig;
use crate::error::InteractionFailure;
use crate::geometry::{OrientedRect, check_oriented_overlap, clamp_to_world, point_in_box};
use crate::obstacle::{
    ObstacleArena, ObstacleHandle, ObstacleInstance, ObstacleKind, ObstaclePlacement,
};
use crate::robot::{RobotCapabilities, RobotPose, heading_vector};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Outcome of testing the robot against one obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    None,
    Blocked(ObstacleHandle),
    Pushed(ObstacleHandle),
}

/// Result of a goal check.
#[derive(Clone, Debug, PartialEq)]
pub enum GoalOutcome {
    Reached { goal_id: String },
    Missed { distance: f64 },
}

/// How the robot currently holds an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grip {
    Arm,
    Claw,
}

/// Informational sensor snapshot. Never used for branching.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Color of the color zone under the robot center.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_below: Option<String>,
    /// Distance to the first solid obstacle or wall ahead, within sensor range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_ahead: Option<f64>,
    /// Something solid within 30 px ahead.
    pub contact_ahead: bool,
}

const CONTACT_PROBE: f64 = 30.0;

/// Collision policy for one obstacle: goals, ramps and other non-solid kinds
/// never block, pushables are displaced, solids block.
///
/// Pushed obstacles move `push_distance` along `heading` and are clamped fully
/// inside the arena. Carried and unknown obstacles are ignored.
pub fn resolve_collision(
    robot: &OrientedRect,
    obstacle: &mut ObstacleInstance,
    handle: ObstacleHandle,
    heading: f64,
    push_distance: f64,
    world_size: f64,
) -> Contact {
    let Some(def) = obstacle.def() else {
        return Contact::None;
    };
    if obstacle.is_carried() || !def.solid {
        return Contact::None;
    }
    let rect = OrientedRect::axis_aligned(obstacle.position, def.half_extents());
    if !check_oriented_overlap(robot, &rect) {
        return Contact::None;
    }
    if obstacle.kind == ObstacleKind::Pushable {
        let moved = obstacle.position + heading_vector(heading) * push_distance;
        obstacle.position = clamp_to_world(moved, world_size, def.half_extents());
        obstacle.pushed = true;
        return Contact::Pushed(handle);
    }
    Contact::Blocked(handle)
}

/// One simulation run's mutable world.
#[derive(Clone, Debug)]
pub struct ArenaWorld {
    pub config: ArenaConfig,
    pub capabilities: RobotCapabilities,
    pub pose: RobotPose,
    obstacles: ObstacleArena,
    carried: Option<(ObstacleHandle, Grip)>,
}

impl ArenaWorld {
    /// Robot at the arena center facing up; obstacles from `placements`.
    pub fn new(
        config: ArenaConfig,
        capabilities: RobotCapabilities,
        placements: &[ObstaclePlacement],
    ) -> Self {
        let center = DVec2::splat(config.world_size / 2.0);
        for p in placements.iter().filter(|p| p.kind.def().is_none()) {
            tracing::warn!(id = %p.id, "ignoring obstacle of unknown kind");
        }
        Self {
            config,
            capabilities,
            pose: RobotPose::at(center),
            obstacles: ObstacleArena::from_placements(placements),
            carried: None,
        }
    }

    pub fn obstacles(&self) -> &ObstacleArena {
        &self.obstacles
    }

    pub fn carried(&self) -> Option<(ObstacleHandle, Grip)> {
        self.carried
    }

    pub fn robot_rect(&self, position: DVec2, heading: f64) -> OrientedRect {
        OrientedRect::new(
            position,
            DVec2::new(self.config.robot_half_width, self.config.robot_half_height),
            heading + 90.0,
        )
    }

    /// Clamps a robot center into the drivable area.
    pub fn clamp_robot(&self, p: DVec2) -> DVec2 {
        clamp_to_world(
            p,
            self.config.world_size,
            DVec2::splat(self.config.wall_margin),
        )
    }

    /// Tests the robot placed at `position`/`heading` against every obstacle.
    /// The first non-`None` contact wins; pushables are displaced as a side effect.
    pub fn contact_at(&mut self, position: DVec2, heading: f64, push_distance: f64) -> Contact {
        self.obstacles.clear_pushed();
        let robot = self.robot_rect(position, heading);
        let world_size = self.config.world_size;
        for handle in self.obstacles.handles() {
            let obstacle = self.obstacles.get_mut(handle);
            let contact =
                resolve_collision(&robot, obstacle, handle, heading, push_distance, world_size);
            if contact != Contact::None {
                return contact;
            }
        }
        Contact::None
    }

    /// Attempts to drive the robot to `target` (clamped to the arena).
    /// Commits the move unless blocked.
    pub fn try_drive(&mut self, target: DVec2, push_distance: f64) -> Contact {
        let target = self.clamp_robot(target);
        let contact = self.contact_at(target, self.pose.heading, push_distance);
        if !matches!(contact, Contact::Blocked(_)) {
            self.pose.position = target;
            self.sync_carried();
        }
        contact
    }

    /// Attempts to rotate in place to `heading`. Commits unless blocked.
    pub fn try_rotate(&mut self, heading: f64) -> Contact {
        let push = self.config.push_distance();
        let contact = self.contact_at(self.pose.position, heading, push);
        if !matches!(contact, Contact::Blocked(_)) {
            self.pose.heading = heading;
        }
        contact
    }

    /// Sets the arm angle, clamped into `[0, 180]`.
    pub fn set_arm(&mut self, angle: f64) {
        self.pose.arm_angle = angle.clamp(0.0, 180.0);
    }

    /// Finds the nearest free obstacle of `kind` within the interaction radius
    /// and checks its requirements against the robot's capabilities and pose.
    pub fn validate_interaction(
        &self,
        kind: ObstacleKind,
    ) -> Result<ObstacleHandle, InteractionFailure> {
        let here = self.pose.position;
        let radius = self.config.interaction_radius;
        let target = self
            .obstacles
            .iter()
            .filter(|(_, o)| o.kind == kind && !o.is_carried())
            .map(|(h, o)| (h, o.position.distance(here)))
            .filter(|&(_, d)| d < radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(h, _)| h)
            .ok_or(InteractionFailure::NothingNearby(kind))?;

        let Some(def) = kind.def() else {
            return Err(InteractionFailure::NothingNearby(kind));
        };
        let req = def.requires;
        let arm = self.pose.arm_angle;
        if req.needs_arm && !self.capabilities.has_arm {
            return Err(InteractionFailure::NoArm);
        }
        if req.needs_claw && !self.capabilities.has_claw {
            return Err(InteractionFailure::NoClaw);
        }
        if let Some(min) = req.arm_angle_min
            && arm < min
        {
            return Err(InteractionFailure::ArmTooLow { angle: arm, min });
        }
        if let Some(max) = req.arm_angle_max
            && arm > max
        {
            return Err(InteractionFailure::ArmTooHigh { angle: arm, max });
        }
        match req.claw_must_be_open {
            Some(false) if self.pose.claw_open => Err(InteractionFailure::ClawMustBeClosed),
            Some(true) if !self.pose.claw_open => Err(InteractionFailure::ClawMustBeOpen),
            _ => Ok(target),
        }
    }

    /// Validates and, on success, picks up the nearest `kind` obstacle.
    ///
    /// Returns `Ok(None)` when the robot is already carrying something.
    pub fn pick_up(
        &mut self,
        kind: ObstacleKind,
        grip: Grip,
    ) -> Result<Option<ObstacleHandle>, InteractionFailure> {
        if self.carried.is_some() {
            return Ok(None);
        }
        let handle = self.validate_interaction(kind)?;
        let obstacle = self.obstacles.get_mut(handle);
        match grip {
            Grip::Arm => obstacle.lifted = true,
            Grip::Claw => obstacle.grabbed = true,
        }
        self.pose.carrying = Some(obstacle.id.clone());
        self.carried = Some((handle, grip));
        self.sync_carried();
        Ok(Some(handle))
    }

    /// Sets down the carried object at the carry offset. With `only` set, an
    /// object held by the other grip stays put.
    pub fn drop_carried(&mut self, only: Option<Grip>) -> Option<ObstacleHandle> {
        let (handle, grip) = self.carried?;
        if only.is_some_and(|g| g != grip) {
            return None;
        }
        let at = self.carry_point();
        let obstacle = self.obstacles.get_mut(handle);
        obstacle.lifted = false;
        obstacle.grabbed = false;
        obstacle.position = at;
        self.carried = None;
        self.pose.carrying = None;
        Some(handle)
    }

    fn carry_point(&self) -> DVec2 {
        self.pose.position - DVec2::new(0.0, self.config.carry_offset)
    }

    /// Moves the carried object along with the robot.
    pub fn sync_carried(&mut self) {
        if let Some((handle, _)) = self.carried {
            let at = self.carry_point();
            self.obstacles.get_mut(handle).position = at;
        }
    }

    /// Goal evaluation against the robot's current position. `None` when the
    /// arena has no goals.
    pub fn goal_outcome(&self) -> Option<GoalOutcome> {
        let here = self.pose.position;
        let nearest = self
            .obstacles
            .iter()
            .filter(|(_, o)| o.kind == ObstacleKind::Goal)
            .map(|(_, o)| (o, o.position.distance(here)))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;
        Some(if nearest.1 < self.config.goal_radius {
            GoalOutcome::Reached {
                goal_id: nearest.0.id.clone(),
            }
        } else {
            GoalOutcome::Missed { distance: nearest.1 }
        })
    }

    /// Every goal currently within the capture radius.
    pub fn goals_in_reach(&self) -> impl Iterator<Item = &ObstacleInstance> {
        let here = self.pose.position;
        let radius = self.config.goal_radius;
        self.obstacles
            .iter()
            .map(|(_, o)| o)
            .filter(move |o| o.kind == ObstacleKind::Goal && o.position.distance(here) < radius)
    }

    /// Samples the robot's sensors in the current pose.
    pub fn read_sensors(&self) -> SensorReading {
        let here = self.pose.position;
        let color_below = self
            .obstacles
            .iter()
            .map(|(_, o)| o)
            .filter(|o| o.kind == ObstacleKind::ColorZone)
            .find(|o| {
                o.def()
                    .is_some_and(|d| point_in_box(here, o.position, d.half_extents()))
            })
            .and_then(|o| o.color.clone());
        let distance_ahead = self.ray_distance(self.config.sensor_range);
        SensorReading {
            color_below,
            contact_ahead: distance_ahead.is_some_and(|d| d <= CONTACT_PROBE),
            distance_ahead,
        }
    }

    /// Marches along the heading from 10 px out in 3 px steps until the ray
    /// leaves the arena or enters a solid obstacle.
    fn ray_distance(&self, range: f64) -> Option<f64> {
        let origin = self.pose.position;
        let dir = self.pose.forward();
        let size = self.config.world_size;
        let mut d = 10.0;
        while d <= range {
            let p = origin + dir * d;
            if p.x <= 0.0 || p.y <= 0.0 || p.x >= size || p.y >= size {
                return Some(d);
            }
            let hit = self.obstacles.iter().any(|(_, o)| {
                !o.is_carried()
                    && o.def()
                        .is_some_and(|def| def.solid && point_in_box(p, o.position, def.half_extents()))
            });
            if hit {
                return Some(d);
            }
            d += 3.0;
        }
        None
    }
}
