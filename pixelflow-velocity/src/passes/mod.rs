//! The three velocity sub-passes, recorded in strict order by the
//! orchestrator: emitters (conditional), simulation (mandatory),
//! preview (conditional).

pub mod emitter;
pub mod preview;
pub mod simulate;
