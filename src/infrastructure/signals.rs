//! Process signal setup for the session.
//!
//! Termination requests set a flag that the event loop observes at its poll
//! wait point; incidental signals are ignored outright so they can never
//! disturb the serial line mid-session.

use crate::domain::error::{SerComError, SerComResult};
use nix::sys::signal::{signal, SigHandler, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative shutdown request, set from the SIGTERM handler.
#[derive(Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

const IGNORED: [Signal; 6] = [
    Signal::SIGINT,
    Signal::SIGHUP,
    Signal::SIGALRM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
    Signal::SIGPIPE,
];

/// Install the session's signal disposition and return the shutdown flag.
pub fn install() -> SerComResult<ShutdownFlag> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&flag))?;

    for sig in IGNORED {
        unsafe { signal(sig, SigHandler::SigIgn) }
            .map_err(|e| SerComError::term("signal", e))?;
    }

    Ok(ShutdownFlag(flag))
}
