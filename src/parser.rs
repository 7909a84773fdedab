//! Parser for the restricted Python-like robot dialect.
//!
//! The dialect is line oriented and indentation sensitive:
//!
//! ```text
//! for _ in range(4):
//!     robot.straight(200)
//!     robot.turn(90)
//! while True:
//!     hub.speaker.beep()
//! ```
//!
//! `for _ in range(N):` and `while True:` become loop markers around their
//! body; `if` / `elif` / `else` bodies are flattened into the unconditional
//! sequence (conditions are not evaluated). Every other line is tried against
//! an ordered list of statement matchers where the first match wins. Lines no
//! matcher recognizes are skipped.

use crate::command::{CommandPrimitive, Direction, Intent, Slots};
use crate::error::ParseError;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Wheel diameter used to convert wheel rotation degrees into travel.
pub const WHEEL_DIAMETER_MM: f64 = 56.0;

/// Parses `source` into a primitive list (loop markers included).
///
/// Empty or comment-only input yields an empty list.
pub fn parse(source: &str) -> Result<Vec<CommandPrimitive>, ParseError> {
    let lines: Vec<SourceLine<'_>> = source
        .lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                return None;
            }
            Some(SourceLine {
                number: idx + 1,
                indent: raw.len() - raw.trim_start().len(),
                text,
            })
        })
        .collect();

    let mut parser = Parser {
        lines,
        out: Vec::new(),
    };
    parser.block(0, None)?;
    debug!(primitives = parser.out.len(), "parsed command source");
    Ok(parser.out)
}

struct SourceLine<'a> {
    number: usize,
    indent: usize,
    text: &'a str,
}

struct Parser<'a> {
    lines: Vec<SourceLine<'a>>,
    out: Vec<CommandPrimitive>,
}

#[derive(Clone, Copy)]
enum Header {
    Repeat(u32),
    Forever,
    Conditional,
}

impl Parser<'_> {
    /// Consumes one block starting at `start`. Once it holds a line, the
    /// block ends at the first line indented at or below `parent_indent`, so
    /// a header always takes at least the line after it as its body.
    /// Returns the index of the first line not consumed.
    fn block(&mut self, start: usize, parent_indent: Option<usize>) -> Result<usize, ParseError> {
        let mut block_indent = None;
        let mut i = start;
        while i < self.lines.len() {
            let (number, indent, text) = {
                let l = &self.lines[i];
                (l.number, l.indent, l.text)
            };
            if i > start && parent_indent.is_some_and(|p| indent <= p) {
                break;
            }
            match block_indent {
                None => block_indent = Some(indent),
                Some(b) if indent > b => return Err(ParseError::UnexpectedIndent { line: number }),
                Some(b) if indent < b => {
                    return Err(ParseError::InconsistentDedent { line: number });
                }
                Some(_) => {}
            }

            let Some(header) = match_header(text) else {
                self.statement(text);
                i += 1;
                continue;
            };

            match header {
                Header::Repeat(times) => self.emit(
                    Intent::Repeat,
                    Slots {
                        times: Some(times),
                        ..Slots::default()
                    },
                    text,
                ),
                Header::Forever => self.emit(Intent::RepeatForever, Slots::default(), text),
                Header::Conditional => {}
            }
            let next = self.block(i + 1, Some(indent))?;
            if !matches!(header, Header::Conditional) {
                self.emit(Intent::StopRepeat, Slots::default(), "stop repeating");
            }
            i = next;
        }
        Ok(i)
    }

    fn statement(&mut self, text: &str) {
        for (name, matcher) in STATEMENT_MATCHERS {
            if let Some(actions) = matcher(text) {
                trace!(matcher = name, statement = text, "matched");
                for (intent, slots) in actions {
                    self.emit(intent, slots, text);
                }
                return;
            }
        }
        trace!(statement = text, "no matcher recognized statement");
    }

    fn emit(&mut self, intent: Intent, slots: Slots, raw: &str) {
        let id = self.out.len() as u32;
        self.out.push(CommandPrimitive::new(id, intent, slots, raw));
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("statement pattern is valid")
}

static FOR_RANGE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^for\s+\w+\s+in\s+range\s*\(\s*(\d+)\s*\)\s*:"));
static WHILE_TRUE: LazyLock<Regex> = LazyLock::new(|| compile(r"^while\s+True\s*:"));
static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| compile(r"^(?:if|elif|else)\b.*:"));

fn match_header(text: &str) -> Option<Header> {
    if let Some(c) = FOR_RANGE.captures(text) {
        // Counts that overflow u32 are treated as zero iterations.
        return Some(Header::Repeat(c[1].parse().unwrap_or(0)));
    }
    if WHILE_TRUE.is_match(text) {
        return Some(Header::Forever);
    }
    CONDITIONAL.is_match(text).then_some(Header::Conditional)
}

// --- Statement matchers ---

type Action = (Intent, Slots);

/// Returns `Some` when the statement is recognized, possibly with no actions.
type Matcher = fn(&str) -> Option<Vec<Action>>;

/// Tried in order; the first matcher returning `Some` wins.
const STATEMENT_MATCHERS: [(&str, Matcher); 13] = [
    ("straight", match_straight),
    ("turn", match_turn),
    ("curve", match_curve),
    ("run_time", match_run_time),
    ("run_target", match_run_target),
    ("run_angle", match_run_angle),
    ("wait", match_wait),
    ("beep", match_beep),
    ("light", match_light),
    ("say", match_say),
    ("claw_close", match_claw_close),
    ("claw_open", match_claw_open),
    ("stop", match_stop),
];

const NUM: &str = r"(-?\d+(?:\.\d+)?)";

static STRAIGHT: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\.straight\s*\(\s*{NUM}\s*\)")));
static TURN: LazyLock<Regex> = LazyLock::new(|| compile(&format!(r"\.turn\s*\(\s*{NUM}\s*\)")));
static CURVE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\.curve\s*\(\s*{NUM}\s*,\s*{NUM}\s*\)")));
static RUN_TIME: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\.run_time\s*\(\s*{NUM}\s*,\s*(\d+(?:\.\d+)?)\s*\)")));
static RUN_TARGET: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\.run_target\s*\(\s*\d+\s*,\s*{NUM}\s*\)")));
static RUN_ANGLE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\.run_angle\s*\(\s*{NUM}\s*,\s*{NUM}\s*\)")));
static WAIT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bwait\s*\(\s*(\d+(?:\.\d+)?)\s*\)"));
static BEEP: LazyLock<Regex> = LazyLock::new(|| compile(r"\.(?:speaker\.)?beep\s*\("));
static LIGHT_ON: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\.light\.on\s*\(\s*Color\.(\w+)\s*\)"));
static SAY: LazyLock<Regex> = LazyLock::new(|| compile(r#"\.speaker\.say\s*\(\s*"([^"]*)"\s*\)"#));
static CLAW_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\bclaw_close\b|\bclose_claw\b|\b(?:gripper|claw)\.close\s*\(")
});
static CLAW_OPEN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\bclaw_open\b|\bopen_claw\b|\b(?:gripper|claw)\.open\s*\("));
static STOP: LazyLock<Regex> = LazyLock::new(|| compile(r"\.(?:stop|brake|hold)\s*\(\s*\)"));

fn num(c: &Captures<'_>, idx: usize) -> f64 {
    c.get(idx)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

fn drive(mm: f64) -> Action {
    let direction = if mm < 0.0 {
        Direction::Backward
    } else {
        Direction::Forward
    };
    (
        Intent::Move,
        Slots {
            direction: Some(direction),
            distance_mm: Some(mm.abs()),
            ..Slots::default()
        },
    )
}

fn rotate(degrees: f64) -> Action {
    let direction = if degrees < 0.0 {
        Direction::Left
    } else {
        Direction::Right
    };
    (
        Intent::Turn,
        Slots {
            direction: Some(direction),
            degrees: Some(degrees.abs()),
            ..Slots::default()
        },
    )
}

fn arm_to(angle: f64) -> Action {
    (
        Intent::MotorAngle,
        Slots {
            angle: Some(angle),
            ..Slots::default()
        },
    )
}

fn match_straight(s: &str) -> Option<Vec<Action>> {
    let c = STRAIGHT.captures(s)?;
    Some(vec![drive(num(&c, 1))])
}

fn match_turn(s: &str) -> Option<Vec<Action>> {
    let c = TURN.captures(s)?;
    Some(vec![rotate(num(&c, 1))])
}

/// Arc approximated as its straight-line length followed by the turn.
fn match_curve(s: &str) -> Option<Vec<Action>> {
    let c = CURVE.captures(s)?;
    let (radius, angle) = (num(&c, 1), num(&c, 2));
    let arc_mm = (radius * angle.to_radians()).abs();
    let mut actions = Vec::with_capacity(2);
    if arc_mm > 0.0 {
        actions.push(drive(arc_mm));
    }
    actions.push(rotate(angle));
    Some(actions)
}

/// `run_time(speed_mm_s, ms)` drives `speed × time`.
fn match_run_time(s: &str) -> Option<Vec<Action>> {
    let c = RUN_TIME.captures(s)?;
    let mm = (num(&c, 1) * num(&c, 2) / 1000.0).round();
    Some(if mm != 0.0 { vec![drive(mm)] } else { Vec::new() })
}

/// `run_target(speed, angle)` positions the arm; out-of-range targets are ignored.
fn match_run_target(s: &str) -> Option<Vec<Action>> {
    let c = RUN_TARGET.captures(s)?;
    let angle = num(&c, 1);
    Some(if (0.0..=180.0).contains(&angle) {
        vec![arm_to(angle)]
    } else {
        Vec::new()
    })
}

/// `run_angle(speed, degrees)`: up to a half turn moves the arm, anything
/// larger is read as wheel rotation.
fn match_run_angle(s: &str) -> Option<Vec<Action>> {
    let c = RUN_ANGLE.captures(s)?;
    let angle = num(&c, 2);
    if angle.abs() <= 180.0 {
        return Some(vec![arm_to(angle.abs())]);
    }
    let mm = (angle.to_radians() * WHEEL_DIAMETER_MM / 2.0).round();
    Some(if mm != 0.0 { vec![drive(mm)] } else { Vec::new() })
}

fn match_wait(s: &str) -> Option<Vec<Action>> {
    let c = WAIT.captures(s)?;
    Some(vec![(
        Intent::Wait,
        Slots {
            duration: Some(num(&c, 1) / 1000.0),
            ..Slots::default()
        },
    )])
}

fn match_beep(s: &str) -> Option<Vec<Action>> {
    BEEP.is_match(s).then(|| vec![(Intent::Beep, Slots::default())])
}

fn match_light(s: &str) -> Option<Vec<Action>> {
    let c = LIGHT_ON.captures(s)?;
    Some(vec![(
        Intent::Light,
        Slots {
            color: Some(c[1].to_lowercase()),
            ..Slots::default()
        },
    )])
}

fn match_say(s: &str) -> Option<Vec<Action>> {
    let c = SAY.captures(s)?;
    Some(vec![(
        Intent::Say,
        Slots {
            phrase: Some(c[1].to_string()),
            ..Slots::default()
        },
    )])
}

fn match_claw_close(s: &str) -> Option<Vec<Action>> {
    CLAW_CLOSE
        .is_match(s)
        .then(|| vec![(Intent::ClawClose, Slots::default())])
}

fn match_claw_open(s: &str) -> Option<Vec<Action>> {
    CLAW_OPEN
        .is_match(s)
        .then(|| vec![(Intent::ClawOpen, Slots::default())])
}

fn match_stop(s: &str) -> Option<Vec<Action>> {
    STOP
        .is_match(s)
        .then(|| vec![(Intent::Stop, Slots::default())])
}
