//! Minimal contract ABI helpers: function selectors and address words.

use sha3::{Digest, Keccak256};

use super::{Address, LedgerError};

/// Solidity signature of the governance contract's account-manager accessor.
pub const ACCOUNT_MANAGER_SIGNATURE: &str = "accountManager()";

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

/// Left-pad an address into a single 32-byte ABI word.
pub fn encode_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Decode the first return word of a call as an address.
///
/// The upper 12 bytes must be zero; trailing words are ignored.
pub fn decode_address(output: &[u8]) -> Result<Address, LedgerError> {
    if output.len() < 32 {
        return Err(LedgerError::Malformed(format!(
            "expected a 32-byte address word, got {} bytes",
            output.len()
        )));
    }
    if output[..12].iter().any(|b| *b != 0) {
        return Err(LedgerError::Malformed(
            "address word has non-zero padding".into(),
        ));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&output[12..32]);
    Ok(Address::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_erc20_value() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
    }

    #[test]
    fn address_word_decodes_back() {
        let addr: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let word = encode_address(&addr);
        assert_eq!(decode_address(&word).unwrap(), addr);
    }

    #[test]
    fn short_output_is_malformed() {
        let err = decode_address(&[0u8; 31]).unwrap_err();
        assert!(matches!(err, LedgerError::Malformed(_)));
        assert!(decode_address(&[]).is_err());
    }

    #[test]
    fn dirty_padding_is_malformed() {
        let mut word = [0u8; 32];
        word[0] = 1;
        assert!(matches!(decode_address(&word), Err(LedgerError::Malformed(_))));
    }
}
