//! Model-backed operations.
//!
//! - [`IdeaAnalyzer`]: one-shot classification of a submitted idea
//! - [`StageEvaluator`]: one-shot Stage-Gate assessment of a transcript
//! - [`ChatMode`]: streamed mentor replies
//!
//! All modes share the text generator and sampling parameters via
//! [`ModeCore`] composition.

mod analyze;
mod chat;
mod core;
mod evaluate;

pub use self::core::ModeCore;
pub use analyze::*;
pub use chat::*;
pub use evaluate::*;
