//! The decoder collaborator: turns `.eml` bytes into a [`ParsedEmail`].
//!
//! [`ParsedEmail`]: crate::model::email::ParsedEmail

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

pub mod eml;
pub mod header;

/// Standard-alphabet base64 that accepts payloads with or without padding.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
