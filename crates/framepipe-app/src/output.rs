//! Raw planar output.

use framepipe_core::Picture;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes pictures as concatenated raw planes, or discards them.
pub enum RawSink {
    File(BufWriter<File>),
    Discard,
}

impl RawSink {
    pub fn create(path: Option<&Path>) -> io::Result<Self> {
        Ok(match path {
            Some(path) => Self::File(BufWriter::new(File::create(path)?)),
            None => Self::Discard,
        })
    }

    /// Write every plane of `picture`, returning the bytes written.
    pub fn write_picture(&mut self, picture: &Picture) -> io::Result<usize> {
        let mut written = 0;
        for plane in picture.planes() {
            let bytes = plane.as_bytes();
            if let Self::File(out) = self {
                out.write_all(bytes)?;
            }
            written += bytes.len();
        }
        Ok(written)
    }

    pub fn finish(self) -> io::Result<()> {
        match self {
            Self::File(mut out) => out.flush(),
            Self::Discard => Ok(()),
        }
    }
}
