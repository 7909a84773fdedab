//! Real-time interpreter driven by an external game-loop clock.
//!
//! [`RealtimeSimulator`] holds one active command at a time and advances it
//! on every [`update`](RealtimeSimulator::update). Instead of frames it
//! records [`RobotEvent`]s, which the host drains with
//! [`take_events`](RealtimeSimulator::take_events) after each tick.
//!
//! Movement, collision, lifting and grabbing go through the same
//! [`ArenaWorld`] rules as the batch interpreter.

use crate::batch::SensorCue;
use crate::command::{CommandPrimitive, Direction, Intent};
use crate::config::ArenaConfig;
use crate::obstacle::{ObstacleHandle, ObstacleKind, ObstaclePlacement};
use crate::robot::{RobotCapabilities, RobotPose};
use crate::rules::{ArenaWorld, Contact, Grip, SensorReading};
use crate::unroll::{UnrollOptions, unroll_with};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

const CLAW_TOGGLE_S: f64 = 0.3;
const BEEP_S: f64 = 0.3;
const SAY_S: f64 = 1.5;
const LIGHT_S: f64 = 0.4;
const SENSOR_S: f64 = 0.1;
const SKIP_S: f64 = 0.1;

/// Playback control signals accepted by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Control {
    Play,
    Pause,
    Reset,
}

/// Discrete notifications emitted while running.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RobotEvent {
    CommandsLoaded { count: usize },
    CommandStart { id: u32, intent: Intent },
    CommandComplete { id: u32, intent: Intent },
    AllCommandsDone,
    ArmChanged { angle: f64 },
    ClawChanged { open: bool },
    HeadingChanged { heading: f64 },
    GoalReached { goal_id: String },
    Collision { obstacle_id: String },
    ObjectPickedUp { obstacle_id: String },
    ObjectDropped { obstacle_id: String },
    ObjectPushed { obstacle_id: String },
    SensorReading { cue: SensorCue, reading: SensorReading },
    Beep,
    Say { phrase: String },
    Light { color: Option<String> },
    InteractionFailed { reason: String },
}

impl RobotEvent {
    /// Bus name of the event, e.g. `COMMAND_START`.
    pub fn name(&self) -> &'static str {
        match self {
            RobotEvent::CommandsLoaded { .. } => "COMMANDS_LOADED",
            RobotEvent::CommandStart { .. } => "COMMAND_START",
            RobotEvent::CommandComplete { .. } => "COMMAND_COMPLETE",
            RobotEvent::AllCommandsDone => "ALL_COMMANDS_DONE",
            RobotEvent::ArmChanged { .. } => "ARM_CHANGED",
            RobotEvent::ClawChanged { .. } => "CLAW_CHANGED",
            RobotEvent::HeadingChanged { .. } => "HEADING_CHANGED",
            RobotEvent::GoalReached { .. } => "GOAL_REACHED",
            RobotEvent::Collision { .. } => "COLLISION",
            RobotEvent::ObjectPickedUp { .. } => "OBJECT_PICKED_UP",
            RobotEvent::ObjectDropped { .. } => "OBJECT_DROPPED",
            RobotEvent::ObjectPushed { .. } => "OBJECT_PUSHED",
            RobotEvent::SensorReading { .. } => "SENSOR_READING",
            RobotEvent::Beep => "BEEP",
            RobotEvent::Say { .. } => "SAY",
            RobotEvent::Light { .. } => "LIGHT",
            RobotEvent::InteractionFailed { .. } => "INTERACTION_FAILED",
        }
    }
}

#[derive(Clone, Debug)]
enum Motion {
    Drive { velocity: DVec2, blocked_ticks: u32 },
    Rotate { start: f64, target: f64 },
    Arm { start: f64, target: f64, lift: bool, drop: bool },
    CloseClaw,
    Hold,
}

#[derive(Clone, Debug)]
struct ActiveCommand {
    command: CommandPrimitive,
    /// Seconds.
    elapsed: f64,
    duration: f64,
    motion: Motion,
}

/// Tick-driven robot simulator with play/pause/reset control.
pub struct RealtimeSimulator {
    world: ArenaWorld,
    initial: ArenaWorld,
    queue: VecDeque<CommandPrimitive>,
    active: Option<ActiveCommand>,
    paused: bool,
    finished: bool,
    reached_goals: Vec<String>,
    events: Vec<RobotEvent>,
}

impl RealtimeSimulator {
    pub fn new(
        config: ArenaConfig,
        capabilities: RobotCapabilities,
        placements: &[ObstaclePlacement],
    ) -> Self {
        let world = ArenaWorld::new(config, capabilities, placements);
        Self {
            initial: world.clone(),
            world,
            queue: VecDeque::new(),
            active: None,
            paused: false,
            finished: false,
            reached_goals: Vec::new(),
            events: Vec::new(),
        }
    }

    // --- Accessors ---

    pub fn pose(&self) -> &RobotPose {
        &self.world.pose
    }

    pub fn world(&self) -> &ArenaWorld {
        &self.world
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_command(&self) -> Option<&CommandPrimitive> {
        self.active.as_ref().map(|a| &a.command)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Current drive velocity (px/s); zero while paused or not driving.
    pub fn velocity(&self) -> DVec2 {
        match &self.active {
            Some(ActiveCommand {
                motion: Motion::Drive { velocity, .. },
                ..
            }) if !self.paused => *velocity,
            _ => DVec2::ZERO,
        }
    }

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<RobotEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Control ---

    /// Replaces the queue with `commands`, unrolling loops with
    /// [`ArenaConfig::realtime_forever_cap`].
    pub fn load_commands(&mut self, commands: &[CommandPrimitive]) {
        let options = UnrollOptions {
            max_len: self.world.config.max_unrolled_commands,
            ..UnrollOptions::new(self.world.config.realtime_forever_cap)
        };
        self.queue = unroll_with(commands, options).into();
        self.active = None;
        self.finished = false;
        debug!(queued = self.queue.len(), "loaded commands");
        self.emit(RobotEvent::CommandsLoaded {
            count: self.queue.len(),
        });
    }

    pub fn handle(&mut self, control: Control) {
        match control {
            Control::Play => self.resume(),
            Control::Pause => self.pause(),
            Control::Reset => self.reset(),
        }
    }

    /// Freezes the active command; the host loop may keep calling `update`.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Clears the queue and restores the robot and obstacles to their start.
    pub fn reset(&mut self) {
        self.world = self.initial.clone();
        self.queue.clear();
        self.active = None;
        self.paused = false;
        self.finished = false;
        self.reached_goals.clear();
    }

    // --- Tick ---

    /// Advances the simulation by `dt`.
    pub fn update(&mut self, dt: Duration) {
        if self.paused || self.finished {
            return;
        }
        if self.active.is_none() {
            let Some(next) = self.queue.pop_front() else {
                self.finished = true;
                self.emit(RobotEvent::AllCommandsDone);
                return;
            };
            self.start(next);
        }
        if self.active.is_some() {
            self.advance(dt.as_secs_f64());
        }
    }

    fn emit(&mut self, event: RobotEvent) {
        self.events.push(event);
    }

    fn obstacle_id(&self, handle: ObstacleHandle) -> String {
        self.world.obstacles().get(handle).id.clone()
    }

    fn start(&mut self, cmd: CommandPrimitive) {
        let cfg = &self.world.config;
        let pose = &self.world.pose;
        let (duration, motion) = match cmd.intent {
            Intent::Move => {
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
                let sign = if cmd.direction() == Direction::Backward { -1.0 } else { 1.0 };
                let speed = if duration > 0.0 { distance / duration } else { 0.0 };
                let velocity = pose.forward() * speed * sign;
                (
                    duration,
                    Motion::Drive {
                        velocity,
                        blocked_ticks: 0,
                    },
                )
            }
            Intent::Turn | Intent::RotateBase => {
                let degrees = match (cmd.intent, cmd.slots.degrees, cmd.slots.duration) {
                    (_, Some(d), _) => d,
                    (Intent::Turn, None, Some(seconds)) => seconds * cfg.turn_rate,
                    (_, None, _) => cmd.slots.angle.unwrap_or(90.0),
                };
                let delta = degrees * cmd.direction().sign();
                (
                    degrees.abs() / cfg.turn_rate,
                    Motion::Rotate {
                        start: pose.heading,
                        target: pose.heading + delta,
                    },
                )
            }
            Intent::ArmUp | Intent::ArmDown | Intent::MotorAngle => {
                let target = cmd.arm_target().clamp(0.0, 180.0);
                (
                    (target - pose.arm_angle).abs() / cfg.arm_rate,
                    Motion::Arm {
                        start: pose.arm_angle,
                        target,
                        lift: cmd.intent != Intent::ArmDown,
                        drop: cmd.intent == Intent::ArmDown,
                    },
                )
            }
            Intent::ClawClose => {
                self.world.pose.claw_open = false;
                self.emit(RobotEvent::ClawChanged { open: false });
                (CLAW_TOGGLE_S, Motion::CloseClaw)
            }
            Intent::ClawOpen => {
                self.world.pose.claw_open = true;
                if let Some(handle) = self.world.drop_carried(Some(Grip::Claw)) {
                    let obstacle_id = self.obstacle_id(handle);
                    self.emit(RobotEvent::ObjectDropped { obstacle_id });
                }
                self.emit(RobotEvent::ClawChanged { open: true });
                (CLAW_TOGGLE_S, Motion::Hold)
            }
            Intent::Stop => {
                self.finished = true;
                self.emit(RobotEvent::AllCommandsDone);
                return;
            }
            Intent::Wait | Intent::RunMotor => {
                (cmd.slots.duration.unwrap_or(1.0).max(0.0), Motion::Hold)
            }
            Intent::Beep => {
                self.emit(RobotEvent::Beep);
                (BEEP_S, Motion::Hold)
            }
            Intent::Say => {
                let phrase = cmd.phrase().to_string();
                self.emit(RobotEvent::Say { phrase });
                (SAY_S, Motion::Hold)
            }
            Intent::Light => {
                let color = cmd.color().to_string();
                self.world.pose.light = Some(color.clone());
                self.emit(RobotEvent::Light { color: Some(color) });
                (LIGHT_S, Motion::Hold)
            }
            Intent::LightOff => {
                self.world.pose.light = None;
                self.emit(RobotEvent::Light { color: None });
                (LIGHT_S, Motion::Hold)
            }
            Intent::IfColor
            | Intent::IfDistance
            | Intent::IfButton
            | Intent::IfForce
            | Intent::IfTouched
            | Intent::IfReflection
            | Intent::IfAmbient => {
                if let Some(cue) = SensorCue::from_command(&cmd) {
                    let reading = self.world.read_sensors();
                    self.emit(RobotEvent::SensorReading { cue, reading });
                }
                (SENSOR_S, Motion::Hold)
            }
            Intent::Repeat | Intent::RepeatForever | Intent::StopRepeat | Intent::Unknown => {
                warn!(id = cmd.id, raw = %cmd.raw, "skipping unsupported command");
                (SKIP_S, Motion::Hold)
            }
        };

        self.emit(RobotEvent::CommandStart {
            id: cmd.id,
            intent: cmd.intent,
        });
        self.active = Some(ActiveCommand {
            command: cmd,
            elapsed: 0.0,
            duration,
            motion,
        });
    }

    fn advance(&mut self, dt: f64) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let before = active.elapsed.min(active.duration);
        active.elapsed += dt;
        let t = if active.duration > 0.0 {
            (active.elapsed / active.duration).min(1.0)
        } else {
            1.0
        };
        let step_time = active.elapsed.min(active.duration) - before;

        let mut aborted = false;
        match &mut active.motion {
            Motion::Drive {
                velocity,
                blocked_ticks,
            } => {
                let step = *velocity * step_time;
                let push = step.length() * self.world.config.push_factor;
                let target = self.world.pose.position + step;
                match self.world.try_drive(target, push) {
                    Contact::Blocked(h) => {
                        *blocked_ticks += 1;
                        if *blocked_ticks == 1 {
                            let obstacle_id = self.obstacle_id(h);
                            self.emit(RobotEvent::Collision { obstacle_id });
                        }
                        aborted = *blocked_ticks >= self.world.config.max_consecutive_blocks;
                    }
                    Contact::Pushed(h) => {
                        *blocked_ticks = 0;
                        let obstacle_id = self.obstacle_id(h);
                        self.emit(RobotEvent::ObjectPushed { obstacle_id });
                    }
                    Contact::None => *blocked_ticks = 0,
                }
                self.check_goals();
            }
            Motion::Rotate { start, target } => {
                let heading = *start + (*target - *start) * t;
                if let Contact::Blocked(h) = self.world.try_rotate(heading) {
                    let obstacle_id = self.obstacle_id(h);
                    self.emit(RobotEvent::Collision { obstacle_id });
                    aborted = true;
                } else {
                    self.emit(RobotEvent::HeadingChanged { heading });
                }
            }
            Motion::Arm { start, target, .. } => {
                self.world.set_arm(*start + (*target - *start) * t);
                let angle = self.world.pose.arm_angle;
                self.emit(RobotEvent::ArmChanged { angle });
            }
            Motion::CloseClaw | Motion::Hold => {}
        }
        self.world.sync_carried();

        if t >= 1.0 || aborted {
            self.complete(active, aborted);
        } else {
            self.active = Some(active);
        }
    }

    fn complete(&mut self, active: ActiveCommand, aborted: bool) {
        match active.motion {
            Motion::Arm {
                target, lift, drop, ..
            } => {
                self.world.set_arm(target);
                if lift
                    && let Ok(Some(handle)) = self.world.pick_up(ObstacleKind::Liftable, Grip::Arm)
                {
                    let obstacle_id = self.obstacle_id(handle);
                    self.emit(RobotEvent::ObjectPickedUp { obstacle_id });
                }
                if drop && let Some(handle) = self.world.drop_carried(None) {
                    let obstacle_id = self.obstacle_id(handle);
                    self.emit(RobotEvent::ObjectDropped { obstacle_id });
                }
            }
            Motion::CloseClaw => match self.world.pick_up(ObstacleKind::Grabbable, Grip::Claw) {
                Ok(Some(handle)) => {
                    let obstacle_id = self.obstacle_id(handle);
                    self.emit(RobotEvent::ObjectPickedUp { obstacle_id });
                }
                Ok(None) => {}
                Err(reason) => self.emit(RobotEvent::InteractionFailed {
                    reason: reason.to_string(),
                }),
            },
            Motion::Drive { .. } | Motion::Rotate { .. } | Motion::Hold => {}
        }
        if aborted {
            debug!(id = active.command.id, "command cut short by collision");
        }
        self.emit(RobotEvent::CommandComplete {
            id: active.command.id,
            intent: active.command.intent,
        });
    }

    fn check_goals(&mut self) {
        let fresh: Vec<String> = self
            .world
            .goals_in_reach()
            .filter(|g| !self.reached_goals.contains(&g.id))
            .map(|g| g.id.clone())
            .collect();
        for goal_id in fresh {
            self.reached_goals.push(goal_id.clone());
            self.emit(RobotEvent::GoalReached { goal_id });
        }
    }
}
