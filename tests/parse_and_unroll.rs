// tests/parse_and_unroll.rs
use robot_arena::{
    CommandPrimitive, Direction, Intent, MAX_UNROLLED_COMMANDS, ParseError, Slots, UnrollOptions,
    WHEEL_DIAMETER_MM, parse, unroll, unroll_with,
};

fn intents(commands: &[CommandPrimitive]) -> Vec<Intent> {
    commands.iter().map(|c| c.intent).collect()
}

fn repeat(id: u32, times: u32) -> CommandPrimitive {
    let slots = Slots {
        times: Some(times),
        ..Slots::default()
    };
    CommandPrimitive::new(id, Intent::Repeat, slots, format!("repeat {times}"))
}

fn bare(id: u32, intent: Intent) -> CommandPrimitive {
    CommandPrimitive::bare(id, intent)
}

// --- Unroll ---

#[test]
fn test_repeat_emits_body_n_times() {
    let program = [
        repeat(0, 3),
        bare(1, Intent::Beep),
        bare(2, Intent::StopRepeat),
    ];
    let flat = unroll(&program, 3);

    assert_eq!(intents(&flat), vec![Intent::Beep; 3]);
    assert!(flat.iter().all(|c| c.id == 1), "copies keep the source id");
}

#[test]
fn test_nested_repeats_expand_inside_out() {
    let program = [
        repeat(0, 2),
        bare(1, Intent::Beep),
        repeat(2, 2),
        bare(3, Intent::Wait),
        bare(4, Intent::StopRepeat),
        bare(5, Intent::StopRepeat),
        bare(6, Intent::Stop),
    ];
    let ids: Vec<u32> = unroll(&program, 3).iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 3, 3, 1, 3, 3, 6]);
}

#[test]
fn test_forever_is_capped() {
    let program = [
        bare(0, Intent::RepeatForever),
        bare(1, Intent::Beep),
        bare(2, Intent::Turn),
        bare(3, Intent::StopRepeat),
    ];
    assert_eq!(unroll(&program, 3).len(), 6);
    assert_eq!(unroll(&program, 20).len(), 40);
}

#[test]
fn test_malformed_loops_never_panic() {
    // Orphan close is dropped.
    let orphan = [bare(0, Intent::Beep), bare(1, Intent::StopRepeat), bare(2, Intent::Say)];
    assert_eq!(intents(&unroll(&orphan, 3)), vec![Intent::Beep, Intent::Say]);

    // Unclosed loop runs over the rest of the list.
    let open = [bare(0, Intent::Stop), repeat(1, 2), bare(2, Intent::Beep), bare(3, Intent::Say)];
    assert_eq!(
        intents(&unroll(&open, 3)),
        vec![Intent::Stop, Intent::Beep, Intent::Say, Intent::Beep, Intent::Say]
    );

    // Trailing repeat has an empty body.
    let trailing = [bare(0, Intent::Beep), repeat(1, 5)];
    assert_eq!(intents(&unroll(&trailing, 3)), vec![Intent::Beep]);

    // Zero iterations.
    let zero = [repeat(0, 0), bare(1, Intent::Beep), bare(2, Intent::StopRepeat)];
    assert!(unroll(&zero, 3).is_empty());
}

#[test]
fn test_huge_repeat_counts_are_bounded() {
    let program = [
        repeat(0, 1_000_000_000),
        bare(1, Intent::Beep),
        bare(2, Intent::StopRepeat),
        bare(3, Intent::Say),
    ];
    let flat = unroll(&program, 3);
    assert_eq!(flat.len(), MAX_UNROLLED_COMMANDS);
    assert!(flat.iter().all(|c| c.intent == Intent::Beep));

    let options = UnrollOptions {
        max_len: 7,
        ..UnrollOptions::new(3)
    };
    assert_eq!(unroll_with(&program, options).len(), 7);

    // Bodies that expand to nothing stop after one pass.
    let empty_body = [
        repeat(0, u32::MAX),
        repeat(1, 0),
        bare(2, Intent::Beep),
        bare(3, Intent::StopRepeat),
        bare(4, Intent::StopRepeat),
    ];
    assert!(unroll(&empty_body, 3).is_empty());

    let parsed = parse("for _ in range(1000000000):\n    hub.speaker.beep()").unwrap();
    assert_eq!(unroll(&parsed, 3).len(), MAX_UNROLLED_COMMANDS);
}

#[test]
fn test_loop_markers_kept_on_request() {
    let program = [
        repeat(0, 2),
        bare(1, Intent::Beep),
        bare(2, Intent::RepeatForever),
        bare(3, Intent::Say),
        bare(4, Intent::StopRepeat),
        bare(5, Intent::StopRepeat),
    ];
    let options = UnrollOptions {
        keep_loop_markers: true,
        ..UnrollOptions::new(2)
    };
    let ids: Vec<u32> = unroll_with(&program, options).iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 3, 1, 2, 3, 3]);
}

#[test]
fn test_missing_times_runs_once() {
    let program = [
        bare(0, Intent::Repeat),
        bare(1, Intent::Beep),
        bare(2, Intent::StopRepeat),
    ];
    assert_eq!(unroll(&program, 3).len(), 1);
}

// --- Parser ---

#[test]
fn test_for_loop_program() {
    let source = "for _ in range(2):\n    robot.straight(100)\n    robot.turn(90)\n";
    let parsed = parse(source).unwrap();

    assert_eq!(
        intents(&parsed),
        vec![Intent::Repeat, Intent::Move, Intent::Turn, Intent::StopRepeat]
    );
    assert_eq!(parsed[0].slots.times, Some(2));
    assert_eq!(parsed[1].slots.distance_mm, Some(100.0));
    assert_eq!(parsed[1].direction(), Direction::Forward);
    assert_eq!(parsed[2].slots.degrees, Some(90.0));
    assert_eq!(parsed[2].direction(), Direction::Right);
    assert_eq!(parsed[1].raw, "robot.straight(100)");

    let ids: Vec<u32> = parsed.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);

    let flat = unroll(&parsed, 3);
    assert_eq!(
        intents(&flat),
        vec![Intent::Move, Intent::Turn, Intent::Move, Intent::Turn]
    );
}

#[test]
fn test_signs_pick_direction() {
    let parsed = parse("robot.straight(-50)\nrobot.turn(-45)").unwrap();

    assert_eq!(parsed[0].direction(), Direction::Backward);
    assert_eq!(parsed[0].slots.distance_mm, Some(50.0));
    assert_eq!(parsed[1].direction(), Direction::Left);
    assert_eq!(parsed[1].slots.degrees, Some(45.0));
}

#[test]
fn test_conditionals_are_flattened() {
    let source = "\
if sensor.color() == Color.RED:
    robot.straight(50)
elif sensor.distance() < 100:
    hub.speaker.beep()
else:
    robot.turn(90)
";
    let parsed = parse(source).unwrap();
    assert_eq!(intents(&parsed), vec![Intent::Move, Intent::Beep, Intent::Turn]);
}

#[test]
fn test_while_true_opens_forever_loop() {
    let source = "while True:\n    hub.speaker.beep()\n    wait(500)\nrobot.stop()";
    let parsed = parse(source).unwrap();

    assert_eq!(
        intents(&parsed),
        vec![
            Intent::RepeatForever,
            Intent::Beep,
            Intent::Wait,
            Intent::StopRepeat,
            Intent::Stop
        ]
    );
    assert_eq!(parsed[2].slots.duration, Some(0.5));
}

#[test]
fn test_statement_matchers() {
    let source = "\
# setup
from pybricks.hubs import PrimeHub

robot.curve(100, 90)
arm.run_target(200, 45)
arm.run_target(200, 270)
arm.run_angle(300, 120)
left.run_angle(500, 360)
drive.run_time(200, 1500)
hub.light.on(Color.RED)
hub.speaker.say(\"hi there\")
claw.close()
gripper.open()
print(\"ignored\")
";
    let parsed = parse(source).unwrap();
    assert_eq!(
        intents(&parsed),
        vec![
            Intent::Move,
            Intent::Turn,
            Intent::MotorAngle,
            Intent::MotorAngle,
            Intent::Move,
            Intent::Move,
            Intent::Light,
            Intent::Say,
            Intent::ClawClose,
            Intent::ClawOpen,
        ]
    );

    // Curve: arc length then heading change.
    let arc = parsed[0].slots.distance_mm.unwrap();
    assert!((arc - 100.0 * std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    assert_eq!(parsed[1].slots.degrees, Some(90.0));

    // run_target in range positions the arm; out of range is dropped.
    assert_eq!(parsed[2].slots.angle, Some(45.0));
    // run_angle within a half turn is an arm move.
    assert_eq!(parsed[3].slots.angle, Some(120.0));
    // Larger angles are wheel rotation.
    let wheel_mm = (360f64.to_radians() * WHEEL_DIAMETER_MM / 2.0).round();
    assert_eq!(parsed[4].slots.distance_mm, Some(wheel_mm));
    // 200 mm/s for 1.5 s.
    assert_eq!(parsed[5].slots.distance_mm, Some(300.0));

    assert_eq!(parsed[6].color(), "red");
    assert_eq!(parsed[7].phrase(), "hi there");
}

#[test]
fn test_empty_and_comment_only_sources() {
    assert!(parse("").unwrap().is_empty());
    assert!(parse("\n\n   \n# nothing here\n").unwrap().is_empty());
}

#[test]
fn test_header_takes_next_line_as_body() {
    // A flush-left line right after a header is still its body.
    let parsed = parse("for _ in range(3):\nrobot.straight(10)\nhub.speaker.beep()").unwrap();
    assert_eq!(
        intents(&parsed),
        vec![Intent::Repeat, Intent::Move, Intent::StopRepeat, Intent::Beep]
    );
    let flat = unroll(&parsed, 3);
    assert_eq!(
        intents(&flat),
        vec![Intent::Move, Intent::Move, Intent::Move, Intent::Beep]
    );

    // A header at the end of the source is an empty loop.
    let parsed = parse("robot.straight(10)\nwhile True:").unwrap();
    assert_eq!(
        intents(&parsed),
        vec![Intent::Move, Intent::RepeatForever, Intent::StopRepeat]
    );
    assert_eq!(intents(&unroll(&parsed, 3)), vec![Intent::Move]);

    // Nested headers each take the following line.
    let parsed = parse("for _ in range(2):\nfor _ in range(2):\nrobot.turn(90)").unwrap();
    assert_eq!(unroll(&parsed, 3).len(), 4);
}

#[test]
fn test_indentation_errors() {
    assert_eq!(
        parse("robot.straight(10)\n    robot.turn(90)"),
        Err(ParseError::UnexpectedIndent { line: 2 })
    );
    assert_eq!(
        parse("for _ in range(2):\n    robot.straight(10)\n  robot.turn(90)"),
        Err(ParseError::InconsistentDedent { line: 3 })
    );
}

#[test]
fn test_blank_lines_keep_source_numbering() {
    let err = parse("robot.straight(10)\n\n# comment\n      robot.turn(90)").unwrap_err();
    assert_eq!(err, ParseError::UnexpectedIndent { line: 4 });
    assert_eq!(err.to_string(), "line 4: unexpected indent");
}
