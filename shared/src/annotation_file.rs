use bincode::{Decode, Encode};
use thiserror::Error;

use crate::Annotation;

pub const ANNOTATION_FILE_MAGIC: [u8; 4] = *b"PMAN";
pub const ANNOTATION_FILE_VERSION: u32 = 1;

/// Everything persisted for one floor plan, in creation order.
#[derive(Clone, Debug, Default, PartialEq, Encode, Decode)]
pub struct AnnotationFileData {
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Error)]
#[error("failed to encode annotation file: {0}")]
pub struct AnnotationFileEncodeError(#[from] bincode::error::EncodeError);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotationFileDecodeError {
    #[error("not an annotation file")]
    NotAnnotationFile,
    #[error("unsupported annotation file version {0}")]
    UnsupportedVersion(u32),
    #[error("annotation file body is corrupt")]
    CorruptBody,
    #[error("{0} unexpected bytes after the annotation list")]
    TrailingBytes(usize),
    #[error("annotation {0} has non-finite coordinates")]
    NonFinite(usize),
}

/// `PMAN`, little-endian version, then the bincode body.
pub fn encode_annotation_file(
    data: &AnnotationFileData,
) -> Result<Vec<u8>, AnnotationFileEncodeError> {
    let mut payload = Vec::with_capacity(64 + data.annotations.len() * 48);
    payload.extend_from_slice(&ANNOTATION_FILE_MAGIC);
    payload.extend_from_slice(&ANNOTATION_FILE_VERSION.to_le_bytes());
    bincode::encode_into_std_write(data, &mut payload, bincode::config::standard())?;
    Ok(payload)
}

/// Decodes a whole file. Every annotation in the result has finite
/// coordinates.
pub fn decode_annotation_file(
    payload: &[u8],
) -> Result<AnnotationFileData, AnnotationFileDecodeError> {
    let (magic, rest) = payload
        .split_first_chunk::<4>()
        .ok_or(AnnotationFileDecodeError::NotAnnotationFile)?;
    if *magic != ANNOTATION_FILE_MAGIC {
        return Err(AnnotationFileDecodeError::NotAnnotationFile);
    }
    let (version, body) = rest
        .split_first_chunk::<4>()
        .ok_or(AnnotationFileDecodeError::NotAnnotationFile)?;
    let version = u32::from_le_bytes(*version);
    if version != ANNOTATION_FILE_VERSION {
        return Err(AnnotationFileDecodeError::UnsupportedVersion(version));
    }

    let (data, read): (AnnotationFileData, usize) =
        bincode::decode_from_slice(body, bincode::config::standard())
            .map_err(|_| AnnotationFileDecodeError::CorruptBody)?;
    if read < body.len() {
        return Err(AnnotationFileDecodeError::TrailingBytes(body.len() - read));
    }
    if let Some(index) = data.annotations.iter().position(|a| !a.is_finite()) {
        return Err(AnnotationFileDecodeError::NonFinite(index));
    }
    Ok(data)
}
