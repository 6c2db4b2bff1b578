//! The variable-width length prefix written before every word.
//!
//! The prefix is self-delimiting: the high bits of the first byte say how
//! many bytes follow.
//!
//! ```text
//! length range              bytes  first-byte pattern
//! 0x00       ..= 0x7F         1    0xxxxxxx
//! 0x80       ..= 0x3FFF       2    10xxxxxx
//! 0x4000     ..= 0x1FFFFF     3    110xxxxx
//! 0x200000   ..= 0xFFFFFFF    4    1110xxxx
//! 0x10000000 ..= u32::MAX     5    11110000  (then 4 bytes big-endian)
//! ```

use hotspot_transport::Connection;

use crate::ProtocolError;

/// Largest number of bytes a length prefix can occupy.
pub const MAX_PREFIX_LEN: usize = 5;

/// Appends the encoded form of `len` to `out`, using the fewest bytes.
pub fn encode_length(len: u32, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x4000 {
        out.extend_from_slice(&((len | 0x8000) as u16).to_be_bytes());
    } else if len < 0x20_0000 {
        out.extend_from_slice(&(len | 0xC0_0000).to_be_bytes()[1..]);
    } else if len < 0x1000_0000 {
        out.extend_from_slice(&(len | 0xE000_0000).to_be_bytes());
    } else {
        out.push(0xF0);
        out.extend_from_slice(&len.to_be_bytes());
    }
}

/// Returns how many bytes [`encode_length`] writes for `len`.
pub fn encoded_size(len: u32) -> usize {
    match len {
        0..0x80 => 1,
        0x80..0x4000 => 2,
        0x4000..0x20_0000 => 3,
        0x20_0000..0x1000_0000 => 4,
        _ => 5,
    }
}

/// Number of bytes that follow a prefix starting with `first`.
pub fn continuation_len(first: u8) -> Result<usize, ProtocolError> {
    match first {
        0x00..=0x7F => Ok(0),
        0x80..=0xBF => Ok(1),
        0xC0..=0xDF => Ok(2),
        0xE0..=0xEF => Ok(3),
        0xF0 => Ok(4),
        other => Err(ProtocolError::InvalidLengthPrefix(other)),
    }
}

/// Reassembles a length from its first byte and continuation bytes.
///
/// `rest` must hold exactly [`continuation_len`]`(first)` bytes.
fn assemble(first: u8, rest: &[u8]) -> u32 {
    let masked = match rest.len() {
        0 => return u32::from(first),
        1 => first & 0x3F,
        2 => first & 0x1F,
        3 => first & 0x0F,
        _ => 0,
    };
    rest.iter()
        .fold(u32::from(masked), |acc, &b| (acc << 8) | u32::from(b))
}

/// Decodes a length prefix from the start of `bytes`.
///
/// Returns `Ok(None)` when `bytes` does not yet hold the whole prefix,
/// otherwise the length and the number of prefix bytes consumed.
pub fn decode_length(bytes: &[u8]) -> Result<Option<(u32, usize)>, ProtocolError> {
    let Some(&first) = bytes.first() else {
        return Ok(None);
    };
    let extra = continuation_len(first)?;
    let Some(rest) = bytes.get(1..=extra) else {
        return Ok(None);
    };
    Ok(Some((assemble(first, rest), 1 + extra)))
}

/// Reads one length prefix from `conn`.
///
/// A short read while fetching continuation bytes surfaces as a transport
/// error; nothing is retried here.
pub async fn read_length<C: Connection>(conn: &C) -> Result<u32, ProtocolError> {
    let mut first = [0u8; 1];
    conn.recv_exact(&mut first).await?;
    let extra = continuation_len(first[0])?;
    if extra == 0 {
        return Ok(u32::from(first[0]));
    }
    let mut rest = [0u8; MAX_PREFIX_LEN - 1];
    conn.recv_exact(&mut rest[..extra]).await?;
    Ok(assemble(first[0], &rest[..extra]))
}
