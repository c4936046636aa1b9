use std::fs;
use std::path::Path;

use log::debug;

use crate::error::LoadError;

/// A program image: an origin address and the words to place there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    origin: u16,
    words: Vec<u16>,
}

impl Image {
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Image { origin, words }
    }

    /// Read an image file of big-endian words, the first of which is the origin.
    pub fn read(path: impl AsRef<Path>) -> Result<Image, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(&bytes).map_err(|err| match err {
            BytesError::Empty => LoadError::Empty {
                path: path.to_path_buf(),
            },
            BytesError::Unaligned(len) => LoadError::Unaligned {
                path: path.to_path_buf(),
                len,
            },
        })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Image, BytesError> {
        if bytes.len() % 2 != 0 {
            return Err(BytesError::Unaligned(bytes.len()));
        }
        let mut words = bytes
            .chunks_exact(2)
            .map(|word| u16::from_be_bytes([word[0], word[1]]));
        let origin = words.next().ok_or(BytesError::Empty)?;
        Ok(Image {
            origin,
            words: words.collect(),
        })
    }

    /// Encode back into the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    pub fn origin(&self) -> u16 {
        self.origin
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }
}

/// Path-less failure, given a path by [`Image::read`].
#[derive(Debug, PartialEq)]
enum BytesError {
    Empty,
    Unaligned(usize),
}
