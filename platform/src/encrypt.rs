// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Obfuscation of small secrets (saved credentials, mostly) at rest.
//!
//! An XTEA-style block cipher, 12 rounds over 64-bit blocks with a 4×32-bit
//! machine-bound key from [`Platform::machine_key`](crate::Platform). The
//! ciphertext starts with a header of three fixed magic words and the
//! payload length, enciphered as the first two blocks; the payload follows
//! in 8-byte blocks, zero-padded at the end.
//!
//! This keeps secrets from being grep'd out of a config file or carried to
//! another machine. It is not, and does not try to be, protection against
//! anyone who can run code on the same machine.

use bytemuck::{bytes_of, pod_read_unaligned};

use alloc::vec::Vec;

use crate::{ErrorKind, PlatformError, PlatformResult};

const DELTA: u32 = 0x9E37_79B9;
const ROUNDS: u32 = 12;
const MAGIC: [u32; 3] = [0xCC00_5EC0, 0x0DA4_A0DE, 0xC0DE_D000];
const BLOCK_SIZE: usize = 8;
const HEADER_SIZE: usize = 16;

fn encipher_block(v: &mut [u32; 2], key: &[u32; 4]) {
    let [mut v0, mut v1] = *v;
    let mut sum = 0u32;

    for _ in 0..ROUNDS {
        v0 = v0.wrapping_add(
            (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1)) ^ sum.wrapping_add(key[(sum & 3) as usize]),
        );
        sum = sum.wrapping_add(DELTA);
        v1 = v1.wrapping_add(
            (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize]),
        );
    }
    *v = [v0, v1];
}

fn decipher_block(v: &mut [u32; 2], key: &[u32; 4]) {
    let [mut v0, mut v1] = *v;
    let mut sum = DELTA.wrapping_mul(ROUNDS);

    for _ in 0..ROUNDS {
        v1 = v1.wrapping_sub(
            (((v0 << 4) ^ (v0 >> 5)).wrapping_add(v0))
                ^ sum.wrapping_add(key[((sum >> 11) & 3) as usize]),
        );
        sum = sum.wrapping_sub(DELTA);
        v0 = v0.wrapping_sub(
            (((v1 << 4) ^ (v1 >> 5)).wrapping_add(v1)) ^ sum.wrapping_add(key[(sum & 3) as usize]),
        );
    }
    *v = [v0, v1];
}

/// Reads one zero-padded block from the front of `data`. The words are in
/// native byte order: the output is machine-bound anyway, the key never
/// leaves the machine.
fn read_block(data: &[u8]) -> [u32; 2] {
    let mut block = [0u8; BLOCK_SIZE];
    let used = data.len().min(BLOCK_SIZE);
    block[..used].copy_from_slice(&data[..used]);
    pod_read_unaligned::<[u32; 2]>(&block)
}

/// Enciphers `data` with the given machine-bound key.
///
/// Fails with [`ErrorKind::InvalidArgument`] only if `data` is too large for
/// the header's 32-bit length field.
pub fn encrypt(data: &[u8], key: &[u32; 4]) -> PlatformResult<Vec<u8>> {
    let len = u32::try_from(data.len())
        .map_err(|_| PlatformError::new(ErrorKind::InvalidArgument))?;
    let mut out = Vec::with_capacity(HEADER_SIZE + data.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE);

    let mut header = [MAGIC[0], MAGIC[1]];
    encipher_block(&mut header, key);
    out.extend_from_slice(bytes_of(&header));

    let mut header = [MAGIC[2], len];
    encipher_block(&mut header, key);
    out.extend_from_slice(bytes_of(&header));

    for chunk in data.chunks(BLOCK_SIZE) {
        let mut block = read_block(chunk);
        encipher_block(&mut block, key);
        out.extend_from_slice(bytes_of(&block));
    }
    Ok(out)
}

/// Deciphers data produced by [`encrypt`] with the same key.
///
/// The three magic words are verified before the length field is trusted:
/// a mismatch (wrong key, wrong machine, or corruption) is a hard
/// [`ErrorKind::InvalidArgument`] failure, never a partial result. Input
/// shorter than one header fails with [`ErrorKind::UnexpectedEof`].
pub fn decrypt(data: &[u8], key: &[u32; 4]) -> PlatformResult<Vec<u8>> {
    if data.len() < HEADER_SIZE {
        return Err(ErrorKind::UnexpectedEof.into());
    }

    let mut head = read_block(&data[0..]);
    decipher_block(&mut head, key);
    let mut tail = read_block(&data[BLOCK_SIZE..]);
    decipher_block(&mut tail, key);

    if head[0] != MAGIC[0] || head[1] != MAGIC[1] || tail[0] != MAGIC[2] {
        return Err(ErrorKind::InvalidArgument.into());
    }

    let payload = &data[HEADER_SIZE..];
    let len = tail[1] as usize;
    if len > payload.len() {
        return Err(ErrorKind::InvalidArgument.into());
    }

    let mut out = Vec::with_capacity(len);
    let mut remaining = len;
    for chunk in payload.chunks(BLOCK_SIZE) {
        if remaining == 0 {
            break;
        }
        let mut block = read_block(chunk);
        decipher_block(&mut block, key);

        let take = remaining.min(BLOCK_SIZE);
        out.extend_from_slice(&bytes_of(&block)[..take]);
        remaining -= take;
    }
    Ok(out)
}

/// Extracts a cipher key from free-form machine identity text, e.g. the
/// contents of `/etc/machine-id`.
///
/// Takes the first 32 hex digits found anywhere in the text ("b3 c5a-0d9"
/// style separators are fine) and packs them into the key bytes. Missing
/// digits stay zero, so even a short identity yields a usable (if weaker)
/// key.
pub fn decode_machine_id(text: &str) -> [u32; 4] {
    let mut bytes = [0u8; 16];
    let mut digits = text.chars().filter_map(|c| c.to_digit(16));

    for byte in bytes.iter_mut() {
        let hi = match digits.next() {
            Some(d) => d,
            None => break,
        };
        let lo = digits.next().unwrap_or(0);
        *byte = ((hi << 4) | lo) as u8;
    }
    pod_read_unaligned::<[u32; 4]>(&bytes)
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use crate::ErrorKind;

    use super::{decode_machine_id, decrypt, encrypt};

    const KEY: [u32; 4] = [0x0123_4567, 0x89AB_CDEF, 0xDEAD_BEEF, 0x8BAD_F00D];

    #[test]
    fn round_trips_at_awkward_lengths() {
        for len in [0usize, 1, 7, 8, 9, 63, 64, 100] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let sealed = encrypt(&data, &KEY).unwrap();
            assert_eq!(16 + len.div_ceil(8) * 8, sealed.len());
            assert_eq!(data, decrypt(&sealed, &KEY).unwrap());
        }
    }

    #[test]
    fn wrong_key_is_rejected_before_the_length_is_trusted() {
        let sealed = encrypt(b"hunter2", &KEY).unwrap();
        let wrong = [KEY[0] ^ 1, KEY[1], KEY[2], KEY[3]];
        let err = decrypt(&sealed, &wrong).unwrap_err();
        assert!(err.is(ErrorKind::InvalidArgument));
    }

    #[test]
    fn tampered_header_is_rejected() {
        let mut sealed = encrypt(b"hunter2", &KEY).unwrap();
        sealed[3] ^= 0x40;
        let err = decrypt(&sealed, &KEY).unwrap_err();
        assert!(err.is(ErrorKind::InvalidArgument));
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(decrypt(&[0u8; 15], &KEY)
            .unwrap_err()
            .is(ErrorKind::UnexpectedEof));

        // A header whose length field overruns the actual payload.
        let sealed = encrypt(&[7u8; 32], &KEY).unwrap();
        let err = decrypt(&sealed[..sealed.len() - 8], &KEY).unwrap_err();
        assert!(err.is(ErrorKind::InvalidArgument));
    }

    #[test]
    fn machine_id_digits_are_found_between_separators() {
        let a = decode_machine_id("0123456789abcdef0123456789abcdef");
        let b = decode_machine_id("01 23-45:67 89ab/cdef\n0123456789ABCDEF");
        assert_eq!(a, b);

        let partial = decode_machine_id("ff");
        assert_eq!(partial, decode_machine_id("ff 00 00"));
        assert_ne!(partial, [0u32; 4]);

        assert_eq!([0u32; 4], decode_machine_id("-- nothing --"));
    }
}
