//! The program loader: materializes object streams into memory and
//! installs vector-table entries pointing at loaded handlers.
//!
//! An object is a sequence of big-endian 16-bit words. Word 0 is the origin
//! address; the rest is code and data stored at consecutive addresses. The
//! loader writes through the privileged direct-store path, never MAR/MDR.

use crate::error::{Error, LoaderError};
use crate::machine::Machine;
use crate::word::Word;

/// A parsed object stream: origin plus code words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    origin: Word,
    code: Vec<Word>,
}

impl ObjectFile {
    /// Parse a byte stream. The input must hold at least the origin word
    /// and an even number of bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, LoaderError> {
        if bytes.len() < 2 {
            return Err(LoaderError::TooShort(bytes.len()));
        }
        if bytes.len() % 2 != 0 {
            return Err(LoaderError::OddLength(bytes.len()));
        }
        let origin = Word::new(u16::from_be_bytes([bytes[0], bytes[1]]));
        let code = bytes[2..]
            .chunks_exact(2)
            .map(|pair| Word::new(u16::from_be_bytes([pair[0], pair[1]])))
            .collect();
        Ok(Self { origin, code })
    }

    /// Build an object from words already in hand.
    pub fn from_words(origin: Word, code: Vec<Word>) -> Self {
        Self { origin, code }
    }

    pub fn origin(&self) -> Word {
        self.origin
    }

    pub fn code(&self) -> &[Word] {
        &self.code
    }
}

impl Machine {
    /// Write an object's words to memory starting at its origin. Empty
    /// code is rejected. Returns the number of words written.
    pub fn load(&mut self, object: &ObjectFile) -> Result<usize, Error> {
        if object.code.is_empty() {
            return Err(LoaderError::Empty.into());
        }
        let mut addr = object.origin;
        for &word in &object.code {
            self.mem
                .store_direct(addr, word)
                .map_err(|source| LoaderError::Store {
                    addr,
                    source: Box::new(source),
                })?;
            addr = addr.wrapping_add(Word::new(1));
        }
        tracing::info!(
            origin = %object.origin,
            words = object.code.len(),
            "object loaded"
        );
        Ok(object.code.len())
    }

    /// Parse and load a raw byte stream.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let object = ObjectFile::parse(bytes)?;
        self.load(&object)
    }

    /// Load a handler and point the vector-table entry at `vector` to its
    /// origin.
    pub fn load_vector(&mut self, vector: Word, object: &ObjectFile) -> Result<usize, Error> {
        let count = self.load(object)?;
        self.mem
            .store_direct(vector, object.origin)
            .map_err(|source| LoaderError::Store {
                addr: vector,
                source: Box::new(source),
            })?;
        tracing::debug!(%vector, handler = %object.origin, "vector installed");
        Ok(count)
    }

    /// Convenience for words already decoded (tests, embedders).
    pub fn load_words(&mut self, origin: Word, words: &[Word]) -> Result<usize, Error> {
        self.load(&ObjectFile::from_words(origin, words.to_vec()))
    }
}
