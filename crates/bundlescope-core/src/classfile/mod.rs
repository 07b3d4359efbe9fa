//! Compiled class decoding.
//!
//! `parse_class` decodes one class file and replays its declarations,
//! member references, and attribute type usage through a [`ClassVisitor`].
//! Nothing here touches the filesystem; callers supply the raw bytes.

pub mod descriptor;
pub mod pool;
#[cfg(test)]
pub(crate) mod testutil;
pub mod visitor;

pub use pool::{Constant, ConstantPool};
pub use visitor::{parse_class, ClassVisitor};

use bytes::Buf;
use thiserror::Error;

/// Errors produced while decoding a class file. All of them are fatal for
/// the archive being analyzed.
#[derive(Error, Debug)]
pub enum ClassAnalysisError {
    /// The data did not start with the class-file magic number.
    #[error("not a class file: bad magic 0x{0:08X}")]
    BadMagic(u32),

    /// The data ended before the structure being read was complete.
    #[error("truncated class data while reading {what}")]
    Truncated { what: &'static str },

    /// A constant-pool index pointed outside the pool.
    #[error("constant pool index {index} is out of range")]
    BadPoolIndex { index: u16 },

    /// A constant-pool slot held a different kind of constant than the
    /// referencing structure requires.
    #[error("constant pool index {index} holds {found}, expected {expected}")]
    UnexpectedConstant {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },

    /// An unknown constant-pool tag byte.
    #[error("unknown constant pool tag {0}")]
    UnknownPoolTag(u8),

    /// An unknown annotation element-value tag byte.
    #[error("unknown annotation element tag {0}")]
    UnknownAnnotationTag(u8),

    /// A UTF-8 constant did not decode.
    #[error("malformed UTF-8 constant in class data")]
    InvalidUtf8,
}

/// Big-endian cursor over class bytes with bounds-checked reads.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn need(&self, n: usize, what: &'static str) -> Result<(), ClassAnalysisError> {
        if self.data.remaining() < n {
            Err(ClassAnalysisError::Truncated { what })
        } else {
            Ok(())
        }
    }

    pub(crate) fn u8(&mut self, what: &'static str) -> Result<u8, ClassAnalysisError> {
        self.need(1, what)?;
        Ok(self.data.get_u8())
    }

    pub(crate) fn u16(&mut self, what: &'static str) -> Result<u16, ClassAnalysisError> {
        self.need(2, what)?;
        Ok(self.data.get_u16())
    }

    pub(crate) fn u32(&mut self, what: &'static str) -> Result<u32, ClassAnalysisError> {
        self.need(4, what)?;
        Ok(self.data.get_u32())
    }

    pub(crate) fn u64(&mut self, what: &'static str) -> Result<u64, ClassAnalysisError> {
        self.need(8, what)?;
        Ok(self.data.get_u64())
    }

    pub(crate) fn bytes(
        &mut self,
        n: usize,
        what: &'static str,
    ) -> Result<&'a [u8], ClassAnalysisError> {
        self.need(n, what)?;
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    pub(crate) fn skip(&mut self, n: usize, what: &'static str) -> Result<(), ClassAnalysisError> {
        self.need(n, what)?;
        self.data.advance(n);
        Ok(())
    }
}
