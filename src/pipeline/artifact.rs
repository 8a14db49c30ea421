//! On-disk format of the fitted pipeline.
//!
//! ```text
//! +--------+------------+------------------+
//! | "DRPL" | u16 LE ver | postcard payload |
//! +--------+------------+------------------+
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;

use super::FittedPipeline;
use crate::errors::{ArtifactKind, Error, Result};
use crate::io;

pub const ARTIFACT_MAGIC: [u8; 4] = *b"DRPL";
pub const ARTIFACT_VERSION: u16 = 1;

const HEADER_LEN: usize = ARTIFACT_MAGIC.len() + 2;

pub(super) fn encode(pipeline: &FittedPipeline) -> std::result::Result<Vec<u8>, postcard::Error> {
    let body = postcard::to_allocvec(pipeline)?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&ARTIFACT_MAGIC);
    bytes.extend_from_slice(&ARTIFACT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub(super) fn decode(bytes: &[u8]) -> std::result::Result<FittedPipeline, String> {
    if bytes.len() < HEADER_LEN {
        return Err("file is too short to be a model artifact".into());
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    if header[..4] != ARTIFACT_MAGIC {
        return Err("not a deployrisk model artifact".into());
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != ARTIFACT_VERSION {
        return Err(format!(
            "unsupported artifact version {version}, expected {ARTIFACT_VERSION}"
        ));
    }
    let (pipeline, rest) =
        postcard::take_from_bytes::<FittedPipeline>(body).map_err(|e| e.to_string())?;
    if !rest.is_empty() {
        return Err(format!("{} trailing bytes after payload", rest.len()));
    }
    Ok(pipeline)
}

pub(super) fn write(path: &Path, pipeline: &FittedPipeline) -> Result<()> {
    let bytes = encode(pipeline).map_err(|e| Error::corrupt(path, e.to_string()))?;
    io::write_file(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "model artifact written");
    Ok(())
}

pub(super) fn read(path: &Path) -> Result<FittedPipeline> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found(ArtifactKind::Model, path))
        }
        Err(e) => return Err(e.into()),
    };
    decode(&bytes).map_err(|message| Error::corrupt(path, message))
}
