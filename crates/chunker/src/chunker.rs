//! The chunking loop.

use std::io::Read;

use checksums::{strong_sum, RabinRoller, WeakSum};

use crate::block::Block;
use crate::config::ChunkerConfig;
use crate::error::ChunkerError;

const READ_BUFFER_LEN: usize = 64 * 1024;

/// Splits a reader into content-defined blocks.
///
/// Implements [`Iterator`]; each item is the next [`Block`] or the I/O error
/// that ended the stream. After an error or end of input the iterator yields
/// `None` forever.
pub struct Chunker<R> {
    reader: R,
    config: ChunkerConfig,
    roller: RabinRoller,
    /// Bytes read from the stream but not yet cut into a block.
    pending: Vec<u8>,
    read_buf: Vec<u8>,
    next_index: u64,
    eof: bool,
    failed: bool,
}

impl<R: Read> Chunker<R> {
    /// Creates a chunker with the default configuration.
    pub fn new(reader: R) -> Result<Self, ChunkerError> {
        Self::with_config(reader, ChunkerConfig::default())
    }

    /// Creates a chunker with an explicit configuration.
    pub fn with_config(reader: R, config: ChunkerConfig) -> Result<Self, ChunkerError> {
        let config = config.validated()?;
        Ok(Self {
            reader,
            config,
            roller: RabinRoller::with_window_len(config.window_len),
            pending: Vec::with_capacity(config.max_block),
            read_buf: vec![0; READ_BUFFER_LEN],
            next_index: 0,
            eof: false,
            failed: false,
        })
    }

    /// Scans `pending` from `from` onward for a boundary, rolling each byte
    /// through the fingerprint. Returns the cut length if a boundary was hit.
    fn scan_for_boundary(&mut self, from: usize) -> Option<usize> {
        let mask = self.config.boundary_mask();
        for offset in from..self.pending.len() {
            let fingerprint = self.roller.push(self.pending[offset]);
            let len = offset + 1;
            if len >= self.config.max_block {
                return Some(len);
            }
            if len >= self.config.min_block && (fingerprint & mask) == mask {
                return Some(len);
            }
        }
        None
    }

    fn cut_block(&mut self, len: usize) -> Block {
        let weak = WeakSum::new(self.roller.fingerprint());
        let rest = self.pending.split_off(len);
        let data = std::mem::replace(&mut self.pending, rest);
        let strong = strong_sum(&data);
        let block = Block::new(self.next_index, data, weak, strong);
        self.next_index += 1;
        self.roller.reset();
        block
    }

    fn next_block(&mut self) -> Result<Option<Block>, ChunkerError> {
        // The fingerprint state only ever covers bytes of the block being
        // formed, so after a refill the scan resumes where it left off.
        let mut scanned = 0;
        loop {
            if let Some(len) = self.scan_for_boundary(scanned) {
                return Ok(Some(self.cut_block(len)));
            }
            scanned = self.pending.len();

            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let len = self.pending.len();
                return Ok(Some(self.cut_block(len)));
            }

            match self.reader.read(&mut self.read_buf) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&self.read_buf[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<Block, ChunkerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
