// tests/realtime_events.rs
use glam::DVec2;
use robot_arena::{
    ArenaConfig, CommandPrimitive, Control, Direction, HEADING_UP, Intent, ObstacleKind,
    ObstaclePlacement, RealtimeSimulator, RobotCapabilities, RobotEvent, Slots,
};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(20);

fn forward(id: u32, seconds: f64) -> CommandPrimitive {
    let slots = Slots {
        direction: Some(Direction::Forward),
        duration: Some(seconds),
        ..Slots::default()
    };
    CommandPrimitive::new(id, Intent::Move, slots, "move forward")
}

fn simulator(caps: RobotCapabilities, placements: &[ObstaclePlacement]) -> RealtimeSimulator {
    RealtimeSimulator::new(ArenaConfig::default(), caps, placements)
}

/// Ticks until the queue is exhausted, collecting every event.
fn run_to_end(sim: &mut RealtimeSimulator) -> Vec<RobotEvent> {
    let mut events = sim.take_events();
    for _ in 0..10_000 {
        if sim.is_finished() {
            break;
        }
        sim.update(TICK);
        events.extend(sim.take_events());
    }
    assert!(sim.is_finished(), "simulation did not finish");
    events
}

fn names(events: &[RobotEvent]) -> Vec<&'static str> {
    events.iter().map(RobotEvent::name).collect()
}

#[test]
fn test_event_sequence_for_simple_program() {
    let mut sim = simulator(RobotCapabilities::default(), &[]);
    sim.load_commands(&[CommandPrimitive::bare(0, Intent::Beep), forward(1, 0.5)]);

    let events = run_to_end(&mut sim);
    assert_eq!(
        names(&events),
        vec![
            "COMMANDS_LOADED",
            "BEEP",
            "COMMAND_START",
            "COMMAND_COMPLETE",
            "COMMAND_START",
            "COMMAND_COMPLETE",
            "ALL_COMMANDS_DONE",
        ]
    );
    assert_eq!(events[0], RobotEvent::CommandsLoaded { count: 2 });
    assert!(sim.pose().position.distance(DVec2::new(200.0, 150.0)) < 1e-6);
    assert_eq!(sim.velocity(), DVec2::ZERO);
}

#[test]
fn test_turn_and_arm_report_progress() {
    let mut sim = simulator(RobotCapabilities::full(), &[]);
    let turn = CommandPrimitive::new(
        0,
        Intent::Turn,
        Slots {
            direction: Some(Direction::Left),
            degrees: Some(90.0),
            ..Slots::default()
        },
        "turn left 90",
    );
    let arm = CommandPrimitive::new(
        1,
        Intent::ArmUp,
        Slots {
            angle: Some(60.0),
            ..Slots::default()
        },
        "arm up 60",
    );
    sim.load_commands(&[turn, arm]);
    let events = run_to_end(&mut sim);

    let headings: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            RobotEvent::HeadingChanged { heading } => Some(*heading),
            _ => None,
        })
        .collect();
    assert!(headings.windows(2).all(|w| w[1] <= w[0]), "left turns decrease heading");
    assert!((sim.pose().heading - (HEADING_UP - 90.0)).abs() < 1e-9);

    assert!(events.iter().any(|e| matches!(e, RobotEvent::ArmChanged { .. })));
    assert_eq!(sim.pose().arm_angle, 60.0);
}

#[test]
fn test_lift_through_events() {
    let placements = [ObstaclePlacement::new("box", ObstacleKind::Liftable, 240.0, 100.0)];
    let mut sim = simulator(RobotCapabilities::full(), &placements);
    sim.load_commands(&[
        forward(0, 1.0),
        CommandPrimitive::bare(1, Intent::ArmUp),
        forward(2, 0.5),
    ]);
    let events = run_to_end(&mut sim);

    assert!(events.contains(&RobotEvent::ObjectPickedUp {
        obstacle_id: "box".into()
    }));
    assert_eq!(sim.pose().carrying.as_deref(), Some("box"));

    let handle = sim.world().obstacles().handle_of("box").unwrap();
    let carried = sim.world().obstacles().get(handle);
    assert!(carried.lifted);
    assert!(carried.position.distance(DVec2::new(200.0, 30.0)) < 1e-6);
}

#[test]
fn test_grab_failure_is_reported() {
    let placements = [ObstaclePlacement::new("ball", ObstacleKind::Grabbable, 200.0, 160.0)];
    let mut sim = simulator(RobotCapabilities::default(), &placements);
    sim.load_commands(&[CommandPrimitive::bare(0, Intent::ClawClose)]);
    let events = run_to_end(&mut sim);

    assert!(events.contains(&RobotEvent::ClawChanged { open: false }));
    assert!(events.contains(&RobotEvent::InteractionFailed {
        reason: "Robot has no claw".into()
    }));
    assert!(sim.pose().carrying.is_none());
}

#[test]
fn test_collision_cuts_move_short() {
    let placements = [ObstaclePlacement::new("wall", ObstacleKind::Barrier, 200.0, 164.0)];
    let mut sim = simulator(RobotCapabilities::default(), &placements);
    sim.load_commands(&[forward(0, 1.0)]);

    // Start plus three blocked ticks.
    for _ in 0..3 {
        sim.update(TICK);
    }
    let events = sim.take_events();
    let collisions = events
        .iter()
        .filter(|e| matches!(e, RobotEvent::Collision { .. }))
        .count();
    assert_eq!(collisions, 1, "one collision event per blocked streak");
    assert!(events.contains(&RobotEvent::CommandComplete {
        id: 0,
        intent: Intent::Move
    }));
    assert_eq!(sim.pose().position, DVec2::new(200.0, 200.0));
}

#[test]
fn test_pause_freezes_and_play_resumes() {
    let mut sim = simulator(RobotCapabilities::default(), &[]);
    sim.load_commands(&[forward(0, 1.0)]);
    sim.update(Duration::from_millis(100));
    let before = sim.pose().position;
    assert!(before.distance(DVec2::new(200.0, 190.0)) < 1e-6);

    sim.handle(Control::Pause);
    assert!(sim.is_paused());
    assert_eq!(sim.velocity(), DVec2::ZERO);
    sim.update(Duration::from_millis(500));
    assert_eq!(sim.pose().position, before);

    sim.handle(Control::Play);
    assert!(sim.velocity().length() > 0.0);
    run_to_end(&mut sim);
    assert!(sim.pose().position.distance(DVec2::new(200.0, 100.0)) < 1e-6);
}

#[test]
fn test_reset_restores_start() {
    let placements = [ObstaclePlacement::new("crate", ObstacleKind::Pushable, 200.0, 150.0)];
    let mut sim = simulator(RobotCapabilities::default(), &placements);
    sim.load_commands(&[forward(0, 1.0), forward(1, 1.0)]);
    for _ in 0..60 {
        sim.update(TICK);
    }
    let events = sim.take_events();
    assert!(events.contains(&RobotEvent::ObjectPushed {
        obstacle_id: "crate".into()
    }));

    sim.handle(Control::Reset);
    assert_eq!(sim.pose().position, DVec2::new(200.0, 200.0));
    assert_eq!(sim.pose().heading, HEADING_UP);
    assert_eq!(sim.queue_len(), 0);
    assert!(sim.current_command().is_none());
    let handle = sim.world().obstacles().handle_of("crate").unwrap();
    assert_eq!(
        sim.world().obstacles().get(handle).position,
        DVec2::new(200.0, 150.0)
    );

    sim.update(TICK);
    assert_eq!(sim.take_events(), vec![RobotEvent::AllCommandsDone]);
}

#[test]
fn test_stop_ends_run() {
    let mut sim = simulator(RobotCapabilities::default(), &[]);
    sim.load_commands(&[
        CommandPrimitive::bare(0, Intent::Stop),
        CommandPrimitive::bare(1, Intent::Beep),
    ]);
    sim.take_events();

    sim.update(TICK);
    assert_eq!(sim.take_events(), vec![RobotEvent::AllCommandsDone]);
    assert!(sim.is_finished());
    assert_eq!(sim.queue_len(), 1);

    sim.update(TICK);
    assert!(sim.take_events().is_empty());
}

#[test]
fn test_goal_reached_once() {
    let placements = [ObstaclePlacement::new("goal", ObstacleKind::Goal, 200.0, 150.0)];
    let mut sim = simulator(RobotCapabilities::default(), &placements);
    sim.load_commands(&[forward(0, 1.5)]);
    let events = run_to_end(&mut sim);

    let reached: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, RobotEvent::GoalReached { .. }))
        .collect();
    assert_eq!(reached.len(), 1);
}

#[test]
fn test_forever_loop_uses_realtime_cap() {
    let mut sim = simulator(RobotCapabilities::default(), &[]);
    sim.load_commands(&[
        CommandPrimitive::bare(0, Intent::RepeatForever),
        CommandPrimitive::bare(1, Intent::Beep),
        CommandPrimitive::bare(2, Intent::StopRepeat),
    ]);
    assert_eq!(
        sim.take_events(),
        vec![RobotEvent::CommandsLoaded { count: 20 }]
    );
    assert_eq!(sim.queue_len(), 20);
}

#[test]
fn test_events_serialize_with_bus_names() {
    let event = RobotEvent::CommandStart {
        id: 3,
        intent: Intent::ArmUp,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "COMMAND_START");
    assert_eq!(json["intent"], "arm_up");
    assert_eq!(event.name(), "COMMAND_START");
}

#[test]
fn test_blocked_turn_ends_command() {
    let placements = [ObstaclePlacement::new("wall", ObstacleKind::Barrier, 200.0, 236.0)];
    let mut sim = simulator(RobotCapabilities::default(), &placements);
    let turn = CommandPrimitive::new(
        0,
        Intent::Turn,
        Slots {
            direction: Some(Direction::Right),
            degrees: Some(90.0),
            ..Slots::default()
        },
        "turn right 90",
    );
    sim.load_commands(&[turn]);
    sim.take_events();

    sim.update(TICK);
    let events = sim.take_events();
    assert_eq!(
        names(&events),
        vec!["COMMAND_START", "COLLISION", "COMMAND_COMPLETE"]
    );
    assert_eq!(sim.pose().heading, HEADING_UP);
    assert!(sim.current_command().is_none());
}

#[test]
fn test_ramp_does_not_block_realtime_drive() {
    let placements = [ObstaclePlacement::new("ramp", ObstacleKind::Ramp, 200.0, 150.0)];
    let mut sim = simulator(RobotCapabilities::default(), &placements);
    sim.load_commands(&[forward(0, 1.0)]);
    let events = run_to_end(&mut sim);

    assert!(!events.iter().any(|e| matches!(e, RobotEvent::Collision { .. })));
    assert!(sim.pose().position.distance(DVec2::new(200.0, 100.0)) < 1e-6);
}
