//! Little-endian integer codec for slab and instruction bytes
//!
//! Every reader is lenient: a read that would run past the end of the buffer
//! returns zero (or an all-zero address) instead of failing, so slabs written
//! by older, shorter layouts still decode partially.

use solana_sdk::pubkey::Pubkey;

/// Width of an on-chain address in bytes
pub const ADDRESS_LEN: usize = 32;

#[inline]
fn window<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    buf.get(offset..end)?.try_into().ok()
}

pub fn read_u8(buf: &[u8], offset: usize) -> u8 {
    buf.get(offset).copied().unwrap_or(0)
}

pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    window(buf, offset).map(u16::from_le_bytes).unwrap_or(0)
}

pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    window(buf, offset).map(u32::from_le_bytes).unwrap_or(0)
}

pub fn read_u64(buf: &[u8], offset: usize) -> u64 {
    window(buf, offset).map(u64::from_le_bytes).unwrap_or(0)
}

pub fn read_u128(buf: &[u8], offset: usize) -> u128 {
    window(buf, offset).map(u128::from_le_bytes).unwrap_or(0)
}

/// Reads a u64 and reinterprets it as two's complement.
pub fn read_i64(buf: &[u8], offset: usize) -> i64 {
    read_u64(buf, offset) as i64
}

/// Reads a u128 and reinterprets it as two's complement: when the top bit of
/// the most significant byte is set the value is `raw - 2^128`.
pub fn read_i128(buf: &[u8], offset: usize) -> i128 {
    read_u128(buf, offset) as i128
}

/// Reads a 32-byte address; out of range yields the all-zero address.
pub fn read_address(buf: &[u8], offset: usize) -> Pubkey {
    window::<ADDRESS_LEN>(buf, offset)
        .map(Pubkey::new_from_array)
        .unwrap_or_default()
}

/// Raw 32-byte field (e.g. an oracle feed id) without interpreting it as an address.
pub fn read_bytes32(buf: &[u8], offset: usize) -> [u8; 32] {
    window(buf, offset).unwrap_or([0; 32])
}

/// Encodes a signed 128-bit value as 16 little-endian two's-complement bytes.
///
/// The magnitude is written first; negative values are then inverted and
/// incremented with the carry rippling from the low byte upward.
pub fn encode_i128(value: i128) -> [u8; 16] {
    let mut out = value.unsigned_abs().to_le_bytes();
    if value < 0 {
        let mut carry = true;
        for byte in out.iter_mut() {
            *byte = !*byte;
            if carry {
                let (sum, overflow) = byte.overflowing_add(1);
                *byte = sum;
                carry = overflow;
            }
        }
    }
    out
}

/// Encodes an unsigned 128-bit value as 16 little-endian bytes.
pub fn encode_u128(value: u128) -> [u8; 16] {
    value.to_le_bytes()
}

// ============================================================================
// WRITERS
// ============================================================================

/// Writes `bytes` at `offset`, silently dropping anything past the end.
///
/// Mirrors the read leniency so fixtures can be built against short buffers.
pub fn write_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    if offset >= buf.len() {
        return;
    }
    let end = buf.len().min(offset.saturating_add(bytes.len()));
    buf[offset..end].copy_from_slice(&bytes[..end - offset]);
}

pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    write_bytes(buf, offset, &value.to_le_bytes());
}

pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    write_bytes(buf, offset, &value.to_le_bytes());
}

pub fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    write_bytes(buf, offset, &value.to_le_bytes());
}

pub fn write_u128(buf: &mut [u8], offset: usize, value: u128) {
    write_bytes(buf, offset, &encode_u128(value));
}

pub fn write_i128(buf: &mut [u8], offset: usize, value: i128) {
    write_bytes(buf, offset, &encode_i128(value));
}

pub fn write_address(buf: &mut [u8], offset: usize, address: &Pubkey) {
    write_bytes(buf, offset, address.as_ref());
}
