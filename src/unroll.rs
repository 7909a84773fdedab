//! Loop unrolling: flattens `repeat` / `repeat_forever` blocks.

use crate::command::{CommandPrimitive, Intent};
use tracing::warn;

/// Upper bound on the length of an unrolled program.
pub const MAX_UNROLLED_COMMANDS: usize = 10_000;

/// Knobs for [`unroll_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnrollOptions {
    /// Iterations emitted for a `repeat_forever` body.
    pub forever_cap: usize,
    /// Expansion stops once the output holds this many primitives.
    pub max_len: usize,
    /// Emit each `repeat` / `repeat_forever` marker once, ahead of its copies.
    pub keep_loop_markers: bool,
}

impl UnrollOptions {
    pub fn new(forever_cap: usize) -> Self {
        Self {
            forever_cap,
            max_len: MAX_UNROLLED_COMMANDS,
            keep_loop_markers: false,
        }
    }
}

/// Expands loop blocks into a flat instruction stream without loop markers.
///
/// A `repeat` body (everything up to its matching `stop_repeat`) is emitted
/// `times` times; a `repeat_forever` body is emitted `forever_cap` times.
/// Nested loops are expanded recursively. A `stop_repeat` with no open loop
/// is dropped, and a loop left open runs over the rest of the list, so a
/// trailing `repeat` expands to nothing.
pub fn unroll(commands: &[CommandPrimitive], forever_cap: usize) -> Vec<CommandPrimitive> {
    unroll_with(commands, UnrollOptions::new(forever_cap))
}

/// [`unroll`] with explicit options. Expansion stops at `max_len` primitives.
pub fn unroll_with(commands: &[CommandPrimitive], options: UnrollOptions) -> Vec<CommandPrimitive> {
    let mut out = Vec::with_capacity(commands.len().min(options.max_len));
    expand_into(commands, &options, &mut out);
    if out.len() >= options.max_len {
        warn!(limit = options.max_len, "unrolled program hit the length limit");
    }
    out
}

fn expand_into(commands: &[CommandPrimitive], options: &UnrollOptions, out: &mut Vec<CommandPrimitive>) {
    let mut i = 0;
    while i < commands.len() && out.len() < options.max_len {
        let cmd = &commands[i];
        match cmd.intent {
            Intent::Repeat | Intent::RepeatForever => {
                let times = if cmd.intent == Intent::RepeatForever {
                    options.forever_cap
                } else {
                    cmd.times() as usize
                };
                if options.keep_loop_markers {
                    out.push(cmd.clone());
                }
                let (body, next) = capture_body(commands, i + 1);
                for _ in 0..times {
                    let before = out.len();
                    expand_into(body, options, out);
                    // A body that emits nothing will never emit anything.
                    if out.len() == before || out.len() >= options.max_len {
                        break;
                    }
                }
                i = next;
            }
            Intent::StopRepeat => i += 1,
            _ => {
                out.push(cmd.clone());
                i += 1;
            }
        }
    }
}

/// Returns the loop body starting at `start` and the index just past its
/// closing `stop_repeat` (or the end of the list when unmatched).
fn capture_body(commands: &[CommandPrimitive], start: usize) -> (&[CommandPrimitive], usize) {
    let mut depth = 1usize;
    for (offset, cmd) in commands[start..].iter().enumerate() {
        if cmd.intent.opens_loop() {
            depth += 1;
        } else if cmd.intent == Intent::StopRepeat {
            depth -= 1;
            if depth == 0 {
                let end = start + offset;
                return (&commands[start..end], end + 1);
            }
        }
    }
    (&commands[start..], commands.len())
}
