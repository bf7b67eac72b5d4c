// Core module - Session logic
pub mod cycle;
pub mod handoff;
pub mod queue;
pub mod reader;
pub mod session;
pub mod timestamp;

pub use queue::WriteQueue;
pub use session::{LoopExit, Session};
pub use timestamp::TimestampAnnotator;
