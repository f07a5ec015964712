//! Byte-level helpers for the compact corpus encodings

use atoi::FromRadix10Checked;
use memchr::memchr;

// Divide a bytestring into two at delim
#[inline]
pub fn bs_split_once(bytes: &[u8], delim: u8) -> Option<(&[u8], &[u8])> {
    let pos = memchr(delim, bytes)?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}

/// Parse an unsigned decimal integer that spans the whole slice
///
/// Empty input, stray characters and overflow all yield `None`.
#[inline]
pub fn bs_atoi(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }
    match usize::from_radix_10_checked(bytes) {
        (Some(n), used) if used == bytes.len() => Some(n),
        _ => None,
    }
}

/// Iterate over lines with their 1-based line numbers
///
/// Handles `\n` and `\r\n` endings; a trailing newline does not produce
/// an extra empty line.
pub fn bs_lines(data: &[u8]) -> BsLines<'_> {
    BsLines {
        rest: data,
        line_num: 0,
    }
}

pub struct BsLines<'a> {
    rest: &'a [u8],
    line_num: usize,
}

impl<'a> Iterator for BsLines<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        self.line_num += 1;
        let line = match memchr(b'\n', self.rest) {
            Some(pos) => {
                let line = &self.rest[..pos];
                self.rest = &self.rest[pos + 1..];
                line
            }
            None => std::mem::take(&mut self.rest),
        };
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some((self.line_num, line))
    }
}
