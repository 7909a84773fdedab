//! Batch interpreter: turns a command list into a scrubbable frame array.
//!
//! The entry point is [`BatchInterpreter::simulate`] (or the [`simulate`]
//! shorthand with the default [`ArenaConfig`]). The whole program runs in a
//! single synchronous pass; identical inputs always yield identical frames.

use crate::command::{CommandPrimitive, Comparison, Direction, Intent};
use crate::config::ArenaConfig;
use crate::obstacle::{ObstacleInstance, ObstacleKind, ObstaclePlacement};
use crate::robot::{RobotCapabilities, RobotPose};
use crate::rules::{ArenaWorld, Contact, GoalOutcome, Grip, SensorReading};
use crate::unroll::{UnrollOptions, unroll_with};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Category of an in-world notification attached to a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEventKind {
    Collision,
    Success,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    pub kind: FrameEventKind,
    pub message: String,
}

impl FrameEvent {
    fn new(kind: FrameEventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Sensor cue animated by an `if_*` primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor", rename_all = "snake_case")]
pub enum SensorCue {
    Color { color: Option<String> },
    Distance,
    Button,
    Force { force: f64 },
    Touched,
    Reflection { comparison: Comparison, value: f64 },
    Ambient { comparison: Comparison, value: f64 },
}

impl SensorCue {
    /// Cue for a sensor-check primitive, `None` for any other intent.
    pub fn from_command(cmd: &CommandPrimitive) -> Option<Self> {
        let s = &cmd.slots;
        Some(match cmd.intent {
            Intent::IfColor => SensorCue::Color {
                color: s.color.clone(),
            },
            Intent::IfDistance => SensorCue::Distance,
            Intent::IfButton => SensorCue::Button,
            Intent::IfForce => SensorCue::Force {
                force: s.force.unwrap_or(3.0),
            },
            Intent::IfTouched => SensorCue::Touched,
            Intent::IfReflection => SensorCue::Reflection {
                comparison: s.comparison.unwrap_or(Comparison::Greater),
                value: s.value.unwrap_or(50.0),
            },
            Intent::IfAmbient => SensorCue::Ambient {
                comparison: s.comparison.unwrap_or(Comparison::Dark),
                value: s.value.unwrap_or(20.0),
            },
            _ => return None,
        })
    }

    fn label(&self) -> String {
        match self {
            SensorCue::Color { .. } => "Checking color…".into(),
            SensorCue::Distance => "Checking distance…".into(),
            SensorCue::Button => "Checking button…".into(),
            SensorCue::Force { force } => format!("Checking force > {force} N…"),
            SensorCue::Touched => "Checking touch…".into(),
            SensorCue::Reflection { comparison, value } => {
                let op = if *comparison == Comparison::Less { "<" } else { ">" };
                format!("Checking reflection {op} {value}%…")
            }
            SensorCue::Ambient { comparison, value } => match comparison {
                Comparison::Dark | Comparison::Less => format!("Checking dark < {value}%…"),
                _ => format!("Checking bright > {value}%…"),
            },
        }
    }
}

/// Transient visual cue carried by the first frame of a burst.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Beep,
    Say {
        phrase: String,
    },
    Light {
        color: String,
        has_color_light_matrix: bool,
    },
    LightOff,
    Sensor {
        cue: SensorCue,
        reading: SensorReading,
    },
    MotorRun {
        power: f64,
    },
}

/// Immutable snapshot of the world after one sub-step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub pose: RobotPose,
    /// Number of points of [`Simulation::trail`] visible at this frame.
    pub trail_len: usize,
    pub label: String,
    pub obstacles: Vec<ObstacleInstance>,
    pub event: Option<FrameEvent>,
    pub effect: Option<Effect>,
}

/// The full result of a batch run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub frames: Vec<Frame>,
    /// Shared position trail; frames index into it by length.
    pub trail: Vec<DVec2>,
}

impl Simulation {
    /// Trail visible at `frame`.
    pub fn trail_at(&self, frame: &Frame) -> &[DVec2] {
        &self.trail[..frame.trail_len.min(self.trail.len())]
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

/// How a single command's execution ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CommandOutcome {
    Completed,
    /// Drive cut short by repeated collisions, or a turn stopped by one.
    Aborted,
}

/// Builds frame arrays from command lists.
pub struct BatchInterpreter {
    config: ArenaConfig,
}

impl Default for BatchInterpreter {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}

impl BatchInterpreter {
    pub fn new(config: ArenaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Runs `commands` against `placements` and returns every frame.
    ///
    /// Loops are unrolled first (`repeat_forever` capped at
    /// [`ArenaConfig::batch_forever_cap`]); each loop marker shows a short
    /// "Loop" burst before its copies. After the last command the goal
    /// summary frames and a terminal "Done" burst are appended.
    pub fn simulate(
        &self,
        commands: &[CommandPrimitive],
        capabilities: RobotCapabilities,
        placements: &[ObstaclePlacement],
    ) -> Simulation {
        let world = ArenaWorld::new(self.config.clone(), capabilities, placements);
        let mut run = BatchRun {
            trail: vec![world.pose.position],
            frames: Vec::new(),
            world,
        };

        let options = UnrollOptions {
            forever_cap: self.config.batch_forever_cap,
            max_len: self.config.max_unrolled_commands,
            keep_loop_markers: true,
        };
        let sequence = unroll_with(commands, options);
        debug!(
            commands = commands.len(),
            unrolled = sequence.len(),
            obstacles = placements.len(),
            "starting batch simulation"
        );
        for cmd in &sequence {
            let outcome = run.execute(cmd);
            trace!(id = cmd.id, intent = cmd.intent.as_str(), ?outcome, "command finished");
        }
        run.finish();
        debug!(frames = run.frames.len(), "batch simulation complete");

        Simulation {
            frames: run.frames,
            trail: run.trail,
        }
    }
}

/// Runs `commands` with the default arena configuration.
pub fn simulate(
    commands: &[CommandPrimitive],
    capabilities: RobotCapabilities,
    placements: &[ObstaclePlacement],
) -> Simulation {
    BatchInterpreter::default().simulate(commands, capabilities, placements)
}

struct BatchRun {
    world: ArenaWorld,
    frames: Vec<Frame>,
    trail: Vec<DVec2>,
}

impl BatchRun {
    /// Appends `n` frames of the current state; `effect` rides on the first only.
    fn push(&mut self, label: &str, n: usize, event: Option<FrameEvent>, effect: Option<Effect>) {
        self.world.sync_carried();
        let mut effect = effect;
        for _ in 0..n {
            self.frames.push(Frame {
                pose: self.world.pose.clone(),
                trail_len: self.trail.len(),
                label: label.to_string(),
                obstacles: self.world.obstacles().snapshot(),
                event: event.clone(),
                effect: effect.take(),
            });
        }
    }

    fn burst(&self, seconds: f64) -> usize {
        self.world.config.burst(seconds)
    }

    fn execute(&mut self, cmd: &CommandPrimitive) -> CommandOutcome {
        match cmd.intent {
            Intent::Move => return self.drive(cmd),
            Intent::Turn => return self.rotate(cmd, "Turning", "Turn blocked!"),
            Intent::RotateBase => return self.rotate(cmd, "Rotating base", "Base rotation blocked!"),
            Intent::ArmUp => {
                self.move_arm(cmd, "Raising arm");
                self.try_lift();
            }
            Intent::MotorAngle => {
                self.move_arm(cmd, "Arm to");
                self.try_lift();
            }
            Intent::ArmDown => {
                self.move_arm(cmd, "Lowering arm");
                if self.world.drop_carried(None).is_some() {
                    let n = self.burst(0.3);
                    let event = FrameEvent::new(FrameEventKind::Success, "Object placed!");
                    self.push("Set down", n, Some(event), None);
                }
            }
            Intent::ClawClose => self.close_claw(),
            Intent::ClawOpen => {
                self.world.pose.claw_open = true;
                if self.world.drop_carried(Some(Grip::Claw)).is_some() {
                    let n = self.burst(0.3);
                    let event = FrameEvent::new(FrameEventKind::Success, "Object released!");
                    self.push("Released", n, Some(event), None);
                }
                let n = self.burst(0.4);
                self.push("Opening claw", n, None, None);
            }
            Intent::Stop => {
                let n = self.burst(0.3);
                self.push("Stopped", n, None, None);
            }
            Intent::Wait => {
                let seconds = cmd.slots.duration.unwrap_or(1.0).max(0.0);
                let n = ((seconds * self.world.config.fps).round() as usize).max(1);
                self.push(&format!("Waiting {seconds:.1}s"), n, None, None);
            }
            Intent::Beep => {
                let n = self.burst(0.4);
                self.push("Beep!", n, None, Some(Effect::Beep));
            }
            Intent::Say => {
                let phrase = cmd.phrase().to_string();
                let n = self.burst(0.6);
                let label = format!("\"{phrase}\"");
                self.push(&label, n, None, Some(Effect::Say { phrase }));
            }
            Intent::Light => {
                let color = cmd.color().to_string();
                self.world.pose.light = Some(color.clone());
                let effect = Effect::Light {
                    has_color_light_matrix: self.world.capabilities.has_color_light_matrix,
                    color: color.clone(),
                };
                let n = self.burst(0.3);
                self.push(&format!("Light {color}"), n, None, Some(effect));
            }
            Intent::LightOff => {
                self.world.pose.light = None;
                let n = self.burst(0.3);
                self.push("Lights off", n, None, Some(Effect::LightOff));
            }
            Intent::RunMotor => {
                let power = cmd.power();
                let n = self.burst(0.5);
                self.push(&format!("Motor at {power}%"), n, None, Some(Effect::MotorRun { power }));
            }
            Intent::IfColor
            | Intent::IfDistance
            | Intent::IfButton
            | Intent::IfForce
            | Intent::IfTouched
            | Intent::IfReflection
            | Intent::IfAmbient => {
                if let Some(cue) = SensorCue::from_command(cmd) {
                    let label = cue.label();
                    let effect = Effect::Sensor {
                        cue,
                        reading: self.world.read_sensors(),
                    };
                    let n = self.burst(0.5);
                    self.push(&label, n, None, Some(effect));
                }
            }
            Intent::Repeat | Intent::RepeatForever => {
                let n = self.burst(0.2);
                self.push("Loop", n, None, None);
            }
            // Closing markers never survive unrolling.
            Intent::StopRepeat => {}
            Intent::Unknown => warn!(id = cmd.id, raw = %cmd.raw, "skipping unknown command"),
        }
        CommandOutcome::Completed
    }

    fn drive(&mut self, cmd: &CommandPrimitive) -> CommandOutcome {
        let cfg = &self.world.config;
        let direction = cmd.direction();
        let (distance, duration) = match cmd.slots.distance_mm {
            Some(mm) => {
                let px = mm.abs() * cfg.px_per_mm;
                (px, px / cfg.linear_speed)
            }
            None => {
                let seconds = cmd.slots.duration.unwrap_or(1.0).max(0.0);
                (seconds * cfg.linear_speed, seconds)
            }
        };
        let mut steps = (duration * cfg.fps).round() as usize;
        if steps == 0 && distance > 0.0 {
            steps = 1;
        }
        if steps == 0 {
            return CommandOutcome::Completed;
        }
        let sign = if direction == Direction::Backward { -1.0 } else { 1.0 };
        let step = self.world.pose.forward() * (distance / steps as f64 * sign);
        let push_distance = cfg.push_distance();
        let max_blocks = cfg.max_consecutive_blocks;
        let moving = format!("Moving {}", direction.as_str());

        let mut blocked = 0;
        for _ in 0..steps {
            let target = self.world.pose.position + step;
            match self.world.try_drive(target, push_distance) {
                Contact::Blocked(_) => {
                    blocked += 1;
                    let event = FrameEvent::new(FrameEventKind::Collision, "Hit an obstacle!");
                    self.push("Blocked!", 1, Some(event), None);
                    if blocked >= max_blocks {
                        return CommandOutcome::Aborted;
                    }
                }
                contact => {
                    blocked = 0;
                    self.trail.push(self.world.pose.position);
                    let label = if matches!(contact, Contact::Pushed(_)) {
                        "Pushing!"
                    } else {
                        moving.as_str()
                    };
                    self.push(label, 1, None, None);
                }
            }
        }
        CommandOutcome::Completed
    }

    fn rotate(&mut self, cmd: &CommandPrimitive, verb: &str, blocked_label: &str) -> CommandOutcome {
        let cfg = &self.world.config;
        let degrees = match (cmd.intent, cmd.slots.degrees, cmd.slots.duration) {
            (_, Some(d), _) => d,
            (Intent::Turn, None, Some(seconds)) => seconds * cfg.turn_rate,
            (_, None, _) => cmd.slots.angle.unwrap_or(90.0),
        };
        let steps = ((degrees.abs() / cfg.turn_rate * cfg.fps).round() as usize).max(1);
        let direction = cmd.direction();
        let delta = degrees / steps as f64 * direction.sign();

        for _ in 0..steps {
            let next = self.world.pose.heading + delta;
            if let Contact::Blocked(_) = self.world.try_rotate(next) {
                let event =
                    FrameEvent::new(FrameEventKind::Collision, "Cannot turn, obstacle in the way!");
                self.push(blocked_label, 1, Some(event), None);
                return CommandOutcome::Aborted;
            }
            let label = format!(
                "{verb} {} {:.0}°",
                direction.as_str(),
                self.world.pose.display_heading()
            );
            self.push(&label, 1, None, None);
        }
        CommandOutcome::Completed
    }

    /// Steps the arm toward the (clamped) target at the arm rate.
    fn move_arm(&mut self, cmd: &CommandPrimitive, verb: &str) {
        let cfg = &self.world.config;
        let target = cmd.arm_target().clamp(0.0, 180.0);
        let start = self.world.pose.arm_angle;
        let steps = ((target - start).abs() / cfg.arm_rate * cfg.fps).round() as usize;
        if steps == 0 {
            self.world.set_arm(target);
            let label = format!("{verb} {:.0}°", self.world.pose.arm_angle);
            self.push(&label, 1, None, None);
            return;
        }
        let delta = (target - start) / steps as f64;
        for i in 1..=steps {
            let angle = if i == steps {
                target
            } else {
                start + delta * i as f64
            };
            self.world.set_arm(angle);
            let label = format!("{verb} {:.0}°", self.world.pose.arm_angle);
            self.push(&label, 1, None, None);
        }
    }

    fn try_lift(&mut self) {
        if let Ok(Some(_)) = self.world.pick_up(ObstacleKind::Liftable, Grip::Arm) {
            let n = self.burst(0.3);
            let event = FrameEvent::new(FrameEventKind::Success, "Object lifted!");
            self.push("Lifting!", n, Some(event), None);
        }
    }

    fn close_claw(&mut self) {
        self.world.pose.claw_open = false;
        let n = self.burst(0.4);
        self.push("Closing claw", n, None, None);

        let n = self.burst(0.3);
        match self.world.pick_up(ObstacleKind::Grabbable, Grip::Claw) {
            Ok(Some(_)) => {
                let event = FrameEvent::new(FrameEventKind::Success, "Object grabbed!");
                self.push("Grabbed!", n, Some(event), None);
            }
            Ok(None) => {}
            Err(reason) => {
                let reason = reason.to_string();
                let event = FrameEvent::new(FrameEventKind::Warning, reason.clone());
                self.push(&reason, n, Some(event), None);
            }
        }
    }

    fn finish(&mut self) {
        let n = self.burst(0.5);
        match self.world.goal_outcome() {
            Some(GoalOutcome::Reached { .. }) => {
                let event = FrameEvent::new(FrameEventKind::Success, "You reached the goal!");
                self.push("Goal reached!", n, Some(event), None);
            }
            Some(GoalOutcome::Missed { distance }) => {
                let event = FrameEvent::new(
                    FrameEventKind::Warning,
                    format!("Almost! {distance:.0}px from the goal."),
                );
                self.push(&format!("Missed goal ({distance:.0}px away)"), n, Some(event), None);
            }
            None => {}
        }
        self.push("Done", n, None, None);
    }
}
