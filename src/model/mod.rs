//! Data model: the decoded email consumed by the assembly pipeline and the
//! attachments it produces.

pub mod attachment;
pub mod email;
