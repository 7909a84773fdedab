//! # robot-arena
//!
//! A deterministic command-to-motion engine for a 2D educational robot arena.
//!
//! Programs arrive as [`CommandPrimitive`] lists, either built directly or parsed
//! from a small Python-like robot dialect by [`parse`]. They are then executed
//! against a 400×400 px arena populated with typed obstacles, in one of two modes:
//!
//! * [`BatchInterpreter`] produces the complete frame array in one pass, ready for
//!   scrubbing and replay.
//! * [`RealtimeSimulator`] advances one command per tick from an external clock and
//!   emits [`RobotEvent`]s, with play/pause/reset control.
//!
//! Both modes share the collision, carrying and goal rules in [`rules`], so the
//! same program yields the same outcome in either.

pub mod batch;
pub mod command;
pub mod config;
pub mod error;
pub mod geometry;
pub mod obstacle;
pub mod parser;
pub mod realtime;
pub mod robot;
pub mod rules;
pub mod unroll;

pub use batch::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use obstacle::*;
pub use parser::*;
pub use realtime::*;
pub use robot::*;
pub use unroll::*;
