//! Hashing and hex helpers shared by the EVM modules.

use tiny_keccak::{Hasher, Keccak};

use crate::error::{CoreError, CoreResult};

/// Keccak256 hash (used for addresses, digests and transaction ids)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Convert raw address bytes to an EIP-55 checksummed address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if ch.is_ascii_digit() || nibble < 8 {
            result.push(ch);
        } else {
            result.push(ch.to_ascii_uppercase());
        }
    }

    result
}

/// Strip an optional `0x`/`0X` prefix
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode hex with or without prefix; `0x` alone decodes to empty bytes
pub fn decode_hex(s: &str) -> CoreResult<Vec<u8>> {
    Ok(hex::decode(strip_hex_prefix(s.trim()))?)
}

/// `0x`-prefixed lowercase hex
pub fn encode_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Left-zero-pad a big-endian value to exactly 32 bytes
pub fn left_pad_32(bytes: &[u8]) -> CoreResult<[u8; 32]> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[start..];
    if significant.len() > 32 {
        return Err(CoreError::encoding(format!(
            "Value does not fit in 32 bytes ({} bytes)",
            significant.len()
        )));
    }
    let mut out = [0u8; 32];
    out[32 - significant.len()..].copy_from_slice(significant);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256() {
        assert_eq!(
            hex::encode(keccak256(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_checksum_address() {
        let addr = hex::decode("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            to_checksum_address(&addr),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(decode_hex("0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(decode_hex("BEEF").unwrap(), vec![0xbe, 0xef]);
        assert!(decode_hex("0xzz").is_err());
    }

    #[test]
    fn test_left_pad_32() {
        let padded = left_pad_32(&[0x01, 0x02]).unwrap();
        assert_eq!(padded[30..], [0x01, 0x02]);
        assert!(padded[..30].iter().all(|b| *b == 0));

        // leading zeros beyond 32 bytes are tolerated
        let mut wide = vec![0u8; 33];
        wide[32] = 7;
        assert_eq!(left_pad_32(&wide).unwrap()[31], 7);

        assert!(left_pad_32(&[1u8; 33]).is_err());
    }
}
