//! URL-safe base64 without padding.
//!
//! Handy for deriving reference image identifiers from arbitrary bytes
//! (hashes, binary keys) that must survive inside a `/ref/{id}` path.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeError, Engine};

// Decoding also accepts input that still carries `=` padding.
const URL_SAFE_UNPADDED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn b64_encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_UNPADDED.encode(input)
}

pub fn b64_decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE_UNPADDED.decode(input)
}
