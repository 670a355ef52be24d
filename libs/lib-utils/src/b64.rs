use base64::engine::{general_purpose, Engine};

/// Standard (padded) base64, the alphabet transactional email APIs expect for
/// inline HTML bodies.
pub fn b64_encode(content: impl AsRef<[u8]>) -> String {
    general_purpose::STANDARD.encode(content)
}

pub fn b64_decode(b64: &str) -> Result<Vec<u8>, Error> {
    general_purpose::STANDARD
        .decode(b64)
        .map_err(|_| Error::FailToB64Decode)
}

pub fn b64_decode_to_string(b64: &str) -> Result<String, Error> {
    b64_decode(b64)
        .ok()
        .and_then(|r| String::from_utf8(r).ok())
        .ok_or(Error::FailToB64Decode)
}

#[derive(Debug)]
pub enum Error {
    FailToB64Decode,
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}
