//! Bounds-checked big-endian reads over a raw datagram.
//!
//! Every accessor returns [`DecodeErrors::Truncated`] instead of panicking
//! when the requested bytes run past the end of the buffer.
use super::DecodeErrors;

pub(crate) fn take(message: &[u8], offset: usize, needed: usize) -> Result<&[u8], DecodeErrors> {
    offset
        .checked_add(needed)
        .and_then(|end| message.get(offset..end))
        .ok_or(DecodeErrors::Truncated {
            offset,
            needed,
            len: message.len(),
        })
}

pub(crate) fn read_u8(message: &[u8], offset: usize) -> Result<u8, DecodeErrors> {
    Ok(take(message, offset, 1)?[0])
}

pub(crate) fn read_u16(message: &[u8], offset: usize) -> Result<u16, DecodeErrors> {
    let bytes = take(message, offset, 2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(message: &[u8], offset: usize) -> Result<u32, DecodeErrors> {
    let bytes = take(message, offset, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
