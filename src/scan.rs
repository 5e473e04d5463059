//! Reader for formatted numeric streams.
//!
//! Parameter files are plain whitespace-separated numbers with no header.
//! Tokens are read straight from the `BufRead` and exactly the bytes of the
//! tokens taken are consumed, so consecutive layers can read their sections
//! from one shared stream.

use std::io::{self, BufRead};

use crate::real::Real;

/// Read the next whitespace-separated token, or `None` at end of stream.
pub fn read_token<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    let mut token = Vec::new();

    loop {
        let (used, done) = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }

            let mut used = 0;
            let mut done = false;
            for &byte in buf {
                if byte.is_ascii_whitespace() {
                    if token.is_empty() {
                        used += 1;
                        continue;
                    }
                    done = true;
                    break;
                }
                token.push(byte);
                used += 1;
            }
            (used, done)
        };

        reader.consume(used);
        if done {
            break;
        }
    }

    if token.is_empty() {
        return Ok(None);
    }

    String::from_utf8(token)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Read one number. Fails on end of stream or on a malformed token.
pub fn scan_real<T: Real, R: BufRead + ?Sized>(reader: &mut R) -> io::Result<T> {
    let token = read_token(reader)?.ok_or_else(|| {
        io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended before all values were read")
    })?;

    token.parse::<T>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("cannot parse '{}' as a number", token),
        )
    })
}

/// Fill `values` from the stream, in order.
pub fn scan_reals<T: Real, R: BufRead + ?Sized>(
    reader: &mut R,
    values: &mut [T],
) -> io::Result<()> {
    for value in values.iter_mut() {
        *value = scan_real(reader)?;
    }
    Ok(())
}
