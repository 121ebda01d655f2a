//! Minimal EVM encoding: `CREATE` addresses, selectors and proxy constructor arguments.

use canvas_registry::Address;
use tiny_keccak::{Hasher, Keccak};

/// `initialize()` - called by the proxy constructor to run the registry's initializer.
pub const INITIALIZE_SIGNATURE: &str = "initialize()";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut k = Keccak::v256();
    k.update(data);
    let mut out = [0u8; 32];
    k.finalize(&mut out);
    out
}

/// 4-byte function selector of a signature like `initialize()`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Address of the contract created by `sender` at `nonce`:
/// `keccak256(rlp([sender, nonce]))[12..]`.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(30);
    payload.push(0x80 + 20);
    payload.extend_from_slice(sender.as_bytes());
    rlp_append_u64(&mut payload, nonce);

    let mut stream = Vec::with_capacity(payload.len() + 1);
    // payload is at most 30 bytes, always a short list
    stream.push(0xc0 + payload.len() as u8);
    stream.extend_from_slice(&payload);

    let hash = keccak256(&stream);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address::from_bytes(out)
}

fn rlp_append_u64(buf: &mut Vec<u8>, n: u64) {
    match n {
        0 => buf.push(0x80),
        1..=0x7f => buf.push(n as u8),
        _ => {
            let bytes = n.to_be_bytes();
            let first = bytes.iter().position(|b| *b != 0).unwrap_or(7);
            let be = &bytes[first..];
            buf.push(0x80 + be.len() as u8);
            buf.extend_from_slice(be);
        }
    }
}

/// ABI-encode `(address logic, bytes data)`, the ERC-1967 proxy constructor arguments.
pub fn encode_proxy_constructor(logic: &Address, data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(96 + padded_len);
    out.extend_from_slice(&address_word(logic));
    out.extend_from_slice(&u64_word(64));
    out.extend_from_slice(&u64_word(data.len() as u64));
    out.extend_from_slice(data);
    out.resize(96 + padded_len, 0);
    out
}

fn address_word(addr: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_bytes());
    word
}

fn u64_word(n: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&n.to_be_bytes());
    word
}

/// `0x`-prefixed lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn initialize_selector() {
        assert_eq!(hex::encode(selector(INITIALIZE_SIGNATURE)), "8129fc1c");
    }

    #[test]
    fn create_addresses_match_known_vectors() {
        let sender = addr("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
        assert_eq!(
            create_address(&sender, 0).to_string(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            create_address(&sender, 1).to_string(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
        assert_eq!(
            create_address(&sender, 2).to_string(),
            "0xf778b86fa74e846c4f0a1fbd1335fe81c00a0c91"
        );
    }

    #[test]
    fn hardhat_default_account_addresses() {
        let sender = addr("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        assert_eq!(
            create_address(&sender, 0).to_string(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
        assert_eq!(
            create_address(&sender, 1).to_string(),
            "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"
        );
    }

    #[test]
    fn rlp_nonce_encoding() {
        let enc = |n| {
            let mut buf = Vec::new();
            rlp_append_u64(&mut buf, n);
            buf
        };
        assert_eq!(enc(0), vec![0x80]);
        assert_eq!(enc(0x7f), vec![0x7f]);
        assert_eq!(enc(0x80), vec![0x81, 0x80]);
        assert_eq!(enc(1024), vec![0x82, 0x04, 0x00]);
    }

    #[test]
    fn proxy_constructor_layout() {
        let logic = Address::from_bytes([0xab; 20]);
        let encoded = encode_proxy_constructor(&logic, &selector(INITIALIZE_SIGNATURE));
        assert_eq!(encoded.len(), 128);
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], &[0xab; 20]);
        assert_eq!(encoded[63], 0x40);
        assert_eq!(encoded[95], 4);
        assert_eq!(&encoded[96..100], &[0x81, 0x29, 0xfc, 0x1c]);
        assert!(encoded[100..].iter().all(|b| *b == 0));
    }

    #[test]
    fn empty_init_data() {
        let encoded = encode_proxy_constructor(&Address::from_bytes([1; 20]), &[]);
        assert_eq!(encoded.len(), 96);
        assert_eq!(encoded[95], 0);
    }
}
