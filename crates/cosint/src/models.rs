//! These models represent the objects passed between the chat client and the backend
//!
//! There are a few related shapes we deal with:
//! - chat messages, kept locally and replayed from stored conversation history
//! - directives extracted from streamed assistant text (intel packets, action triggers)
//! - notebook records returned by the REST endpoints (conversations, notes, tracked bills)
//! - dashboard payloads for members and bills
//!
//! Backend payloads that we only ever render are kept as `serde_json::Value` so
//! upstream schema changes in the congressional data feed don't break decoding.
pub mod intel;
pub mod message;
pub mod records;
