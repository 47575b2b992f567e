//! Turning a streamed model reply into display text.
//!
//! [`StreamingJsonExtractor`] gives a live preview of the `message` field while
//! chunks arrive; [`finalize_reply`] settles the complete buffer once the
//! stream ends, degrading gracefully when the model emits broken JSON.

mod extractor;
mod finalizer;

pub use extractor::{extract_message_preview, StreamingJsonExtractor};
pub use finalizer::{
    decode_json, finalize_reply, repair_json_escapes, strip_code_fences, FinalReply, ReplySource,
};
