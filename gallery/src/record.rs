//! Binary record format for one persisted descriptor.
//!
//! ```text
//! [4B magic "FDSC"] [4B version=1]
//! [4B labelLen] [labelLen bytes UTF-8 label]
//! [4B pathLen]  [pathLen bytes UTF-8 source path, 0 = none]
//! [4B dim] [dim x 4B float32 vector]
//! ```
//!
//! All multi-byte values are little-endian.

use std::path::PathBuf;

use crate::descriptor::Descriptor;
use crate::label::Label;
use crate::GalleryError;

const RECORD_MAGIC: [u8; 4] = [b'F', b'D', b'S', b'C'];
const RECORD_VERSION: u32 = 1;

/// Serializes a descriptor into its record bytes.
pub fn encode(d: &Descriptor) -> Vec<u8> {
    let label = d.label().as_str().as_bytes();
    let path = d
        .source_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = path.as_bytes();

    let mut buf = Vec::with_capacity(20 + label.len() + path.len() + d.dimension() * 4);
    buf.extend_from_slice(&RECORD_MAGIC);
    buf.extend_from_slice(&RECORD_VERSION.to_le_bytes());
    buf.extend_from_slice(&(label.len() as u32).to_le_bytes());
    buf.extend_from_slice(label);
    buf.extend_from_slice(&(path.len() as u32).to_le_bytes());
    buf.extend_from_slice(path);
    buf.extend_from_slice(&(d.dimension() as u32).to_le_bytes());
    for &v in d.vector() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Deserializes record bytes produced by [`encode`].
///
/// The record must be consumed exactly; trailing bytes are rejected.
pub fn decode(data: &[u8]) -> Result<Descriptor, GalleryError> {
    let mut r = Reader { data, pos: 0 };

    let magic = r.take(4)?;
    if magic != RECORD_MAGIC {
        return Err(GalleryError::InvalidRecord(format!(
            "invalid magic {:?}",
            magic
        )));
    }
    let version = r.u32()?;
    if version != RECORD_VERSION {
        return Err(GalleryError::InvalidRecord(format!(
            "unsupported version {version}"
        )));
    }

    let label = r.string()?;
    let label = Label::new(&label)
        .map_err(|_| GalleryError::InvalidRecord(format!("invalid label {label:?}")))?;
    let path = r.string()?;

    let dim = r.u32()? as usize;
    if dim == 0 {
        return Err(GalleryError::InvalidRecord("zero dimension".into()));
    }
    let raw = r.take(dim.checked_mul(4).ok_or_else(|| {
        GalleryError::InvalidRecord(format!("dimension {dim} overflows"))
    })?)?;
    let mut vector = Vec::with_capacity(dim);
    for chunk in raw.chunks_exact(4) {
        let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !v.is_finite() {
            return Err(GalleryError::InvalidRecord("non-finite value".into()));
        }
        vector.push(v);
    }

    if r.pos != data.len() {
        return Err(GalleryError::InvalidRecord(format!(
            "{} trailing bytes",
            data.len() - r.pos
        )));
    }

    let d = Descriptor::new(label, vector)?;
    Ok(if path.is_empty() {
        d
    } else {
        d.with_source(PathBuf::from(path))
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], GalleryError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| GalleryError::InvalidRecord("truncated".into()))?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, GalleryError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self) -> Result<String, GalleryError> {
        let n = self.u32()? as usize;
        let b = self.take(n)?;
        String::from_utf8(b.to_vec())
            .map_err(|_| GalleryError::InvalidRecord("invalid utf-8".into()))
    }
}
