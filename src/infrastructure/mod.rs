// Infrastructure module - External dependencies and adapters
pub mod config;
pub mod console;
pub mod lock;
pub mod logging;
pub mod signals;
pub mod term;

pub use console::Console;
pub use lock::UucpLock;
pub use signals::ShutdownFlag;
pub use term::{TermControl, TermiosPort};
