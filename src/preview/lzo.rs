//! Safe LZO1X block decompressor.
//!
//! Map previews are stored as raw LZO1X-1 blocks with no stream header; the
//! block's uncompressed size comes from the preview's own block header. The
//! decoder here follows the reference `lzo1x_decompress_safe` instruction
//! set bit-for-bit, with every read, write and back-reference checked.
//!
//! # Instruction summary
//!
//! | first byte | meaning |
//! |------------|---------|
//! | `> 17` (stream start only) | `byte - 17` literals |
//! | `0..=15` after a match-free state | literal run of `byte + 3` (0 = extended) |
//! | `0..=15` right after a match | short match: 2 bytes (3 after a literal run) |
//! | `16..=31` | M4 match, distance up to 48 KB; distance 0 ends the stream |
//! | `32..=63` | M3 match, distance up to 16 KB |
//! | `64..=255` | M2 match, distance up to 2 KB |
//!
//! The low two bits of the byte two positions before the end of a match
//! instruction give the number (0-3) of literals that follow it.

use std::fmt;

/// Distance bias of a short match that directly follows a literal run.
const M2_MAX_OFFSET: usize = 0x0800;

/// Distance bias applied to every M4 match.
const M4_DISTANCE_BIAS: usize = 0x4000;

/// Reasons a block fails to decompress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzoError {
    /// The instruction stream ended before the end-of-stream marker.
    InputOverrun,
    /// The block would decompress to more than the expected size.
    OutputOverrun,
    /// A match referenced bytes before the start of the output.
    LookbehindOverrun,
    /// Bytes remain after the end-of-stream marker.
    InputNotConsumed,
    /// The stream ended with a different output size than expected.
    LengthMismatch {
        /// The size the block header promised.
        expected: usize,
        /// The size actually produced.
        actual: usize,
    },
}

impl fmt::Display for LzoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LzoError::InputOverrun => write!(f, "input overrun"),
            LzoError::OutputOverrun => write!(f, "output overrun"),
            LzoError::LookbehindOverrun => write!(f, "lookbehind overrun"),
            LzoError::InputNotConsumed => write!(f, "input not consumed"),
            LzoError::LengthMismatch { expected, actual } => {
                write!(f, "decompressed {actual} bytes, expected {expected}")
            }
        }
    }
}

impl std::error::Error for LzoError {}

/// Decompresses one raw LZO1X block that must produce exactly `expected_len` bytes.
///
/// # Errors
///
/// Returns an [`LzoError`] for any malformed stream; the decoder never reads
/// or writes out of bounds.
///
/// # Example
///
/// ```
/// use cnc_map_core::preview::lzo::decompress_block;
///
/// // Three literals, one 6-byte match at distance 3, end of stream.
/// let block = [20, b'a', b'b', b'c', 0xA8, 0x00, 0x11, 0x00, 0x00];
/// assert_eq!(decompress_block(&block, 9).unwrap(), b"abcabcabc");
/// ```
pub fn decompress_block(src: &[u8], expected_len: usize) -> Result<Vec<u8>, LzoError> {
    Decoder {
        src,
        ip: 0,
        out: Vec::with_capacity(expected_len),
        limit: expected_len,
    }
    .run()
}

/// Where the decoder is in the instruction grammar.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Expecting a literal run or a match.
    Instruction,
    /// Right after a literal run: a byte below 16 is a 3-byte short match.
    AfterLiteralRun,
    /// Dispatching a match instruction byte.
    Match(u8),
    /// A match just finished; trailing literals may follow.
    AfterMatch,
}

struct Decoder<'a> {
    src: &'a [u8],
    ip: usize,
    out: Vec<u8>,
    limit: usize,
}

impl Decoder<'_> {
    fn run(mut self) -> Result<Vec<u8>, LzoError> {
        let mut state = State::Instruction;

        if let Some(&first) = self.src.first() {
            if first > 17 {
                self.ip = 1;
                let count = usize::from(first - 17);
                self.literals(count)?;
                state = if count < 4 {
                    State::Match(self.byte()?)
                } else {
                    State::AfterLiteralRun
                };
            }
        }

        loop {
            state = match state {
                State::Instruction => {
                    let t = self.byte()?;
                    if t >= 16 {
                        State::Match(t)
                    } else {
                        let count = if t == 0 {
                            self.extended_length(15)?
                        } else {
                            usize::from(t)
                        };
                        self.literals(count + 3)?;
                        State::AfterLiteralRun
                    }
                }
                State::AfterLiteralRun => {
                    let t = self.byte()?;
                    if t >= 16 {
                        State::Match(t)
                    } else {
                        let next = self.byte()?;
                        let distance =
                            1 + M2_MAX_OFFSET + usize::from(t >> 2) + (usize::from(next) << 2);
                        self.copy_match(distance, 3)?;
                        State::AfterMatch
                    }
                }
                State::Match(t) => {
                    if self.dispatch_match(t)? {
                        return self.finish();
                    }
                    State::AfterMatch
                }
                State::AfterMatch => {
                    let trailing = usize::from(self.src[self.ip - 2] & 3);
                    if trailing == 0 {
                        State::Instruction
                    } else {
                        self.literals(trailing)?;
                        State::Match(self.byte()?)
                    }
                }
            };
        }
    }

    /// Executes one match instruction; returns `true` at the end-of-stream marker.
    fn dispatch_match(&mut self, t: u8) -> Result<bool, LzoError> {
        if t >= 64 {
            // M2: 3-8 bytes, distance 1-2048
            let next = self.byte()?;
            let distance = 1 + usize::from((t >> 2) & 7) + (usize::from(next) << 3);
            let len = usize::from(t >> 5) + 1;
            self.copy_match(distance, len)?;
        } else if t >= 32 {
            // M3
            let mut len = usize::from(t & 31);
            if len == 0 {
                len = self.extended_length(31)?;
            }
            let distance = 1 + (self.le16()? >> 2);
            self.copy_match(distance, len + 2)?;
        } else if t >= 16 {
            // M4
            let high = usize::from(t & 8) << 11;
            let mut len = usize::from(t & 7);
            if len == 0 {
                len = self.extended_length(7)?;
            }
            let distance = high + (self.le16()? >> 2);
            if distance == 0 {
                return Ok(true);
            }
            self.copy_match(distance + M4_DISTANCE_BIAS, len + 2)?;
        } else {
            // M1: 2 bytes, distance 1-1024
            let next = self.byte()?;
            let distance = 1 + usize::from(t >> 2) + (usize::from(next) << 2);
            self.copy_match(distance, 2)?;
        }
        Ok(false)
    }

    fn finish(self) -> Result<Vec<u8>, LzoError> {
        if self.ip != self.src.len() {
            return Err(LzoError::InputNotConsumed);
        }
        if self.out.len() != self.limit {
            return Err(LzoError::LengthMismatch {
                expected: self.limit,
                actual: self.out.len(),
            });
        }
        Ok(self.out)
    }

    fn byte(&mut self) -> Result<u8, LzoError> {
        let b = *self.src.get(self.ip).ok_or(LzoError::InputOverrun)?;
        self.ip += 1;
        Ok(b)
    }

    fn le16(&mut self) -> Result<usize, LzoError> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(usize::from(u16::from_le_bytes([lo, hi])))
    }

    /// Reads a zero-extended length: each `0` byte adds 255, then `base + byte`.
    fn extended_length(&mut self, base: usize) -> Result<usize, LzoError> {
        let mut len = 0usize;
        loop {
            let b = self.byte()?;
            if b != 0 {
                return Ok(len + base + usize::from(b));
            }
            len += 255;
            // Longer than any output we accept; stop before the counter grows unbounded.
            if len > self.limit + base + 255 {
                return Err(LzoError::OutputOverrun);
            }
        }
    }

    fn literals(&mut self, count: usize) -> Result<(), LzoError> {
        if self.out.len() + count > self.limit {
            return Err(LzoError::OutputOverrun);
        }
        let end = self.ip + count;
        let chunk = self.src.get(self.ip..end).ok_or(LzoError::InputOverrun)?;
        self.out.extend_from_slice(chunk);
        self.ip = end;
        Ok(())
    }

    fn copy_match(&mut self, distance: usize, len: usize) -> Result<(), LzoError> {
        if distance == 0 || distance > self.out.len() {
            return Err(LzoError::LookbehindOverrun);
        }
        if self.out.len() + len > self.limit {
            return Err(LzoError::OutputOverrun);
        }
        // Byte at a time: source and destination may overlap.
        let start = self.out.len() - distance;
        for i in 0..len {
            let b = self.out[start + i];
            self.out.push(b);
        }
        Ok(())
    }
}

/// Builds a literal-only LZO1X block; used to synthesize test streams.
#[cfg(test)]
pub(crate) fn literal_block(data: &[u8]) -> Vec<u8> {
    let mut block = Vec::with_capacity(data.len() + 8);
    if data.len() <= 238 {
        block.push(17 + u8::try_from(data.len()).unwrap());
    } else {
        block.push(0);
        let mut remaining = data.len() - 18;
        while remaining > 255 {
            block.push(0);
            remaining -= 255;
        }
        block.push(u8::try_from(remaining).unwrap());
    }
    block.extend_from_slice(data);
    block.extend_from_slice(&[0x11, 0x00, 0x00]);
    block
}
