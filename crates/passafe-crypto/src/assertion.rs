use crate::codec::decode_base64url;
use p256::ecdsa::Signature;
use passafe_types::{PassafeError, PassafeResult, Uint256, P256_COORDINATE_SIZE, P256_RAW_SIGNATURE_SIZE};

const DER_SEQUENCE_TAG: u8 = 0x30;

fn looks_like_der(raw: &[u8]) -> bool {
    raw.len() > 2 && raw[0] == DER_SEQUENCE_TAG && raw[1] as usize == raw.len() - 2
}

/// Splits an ECDSA P-256 signature into `(r, s)`.
///
/// Accepts ASN.1 DER (`SEQUENCE { INTEGER r, INTEGER s }`, what platform
/// authenticators return) or the raw 64-byte `r || s` form.
pub fn parse_signature(raw: &[u8]) -> PassafeResult<(Uint256, Uint256)> {
    if looks_like_der(raw) {
        match Signature::from_der(raw) {
            Ok(signature) => {
                let bytes = signature.to_bytes();
                let (r, s) = bytes.split_at(P256_COORDINATE_SIZE);
                return Ok((Uint256::from_be_slice(r)?, Uint256::from_be_slice(s)?));
            }
            Err(e) if raw.len() != P256_RAW_SIGNATURE_SIZE => {
                return Err(PassafeError::InvalidSignatureEncoding(format!(
                    "bad DER signature: {e}"
                )));
            }
            Err(_) => {}
        }
    }

    if raw.len() == P256_RAW_SIGNATURE_SIZE {
        let (r, s) = raw.split_at(P256_COORDINATE_SIZE);
        return Ok((Uint256::from_be_slice(r)?, Uint256::from_be_slice(s)?));
    }

    Err(PassafeError::InvalidSignatureEncoding(format!(
        "expected DER or {} raw bytes, got {} bytes",
        P256_RAW_SIGNATURE_SIZE,
        raw.len()
    )))
}

/// Splits `client_data_json` around the first occurrence of `challenge`.
/// `prefix + challenge + suffix` reproduces the input byte for byte.
pub fn split_client_data(client_data_json: &str, challenge: &str) -> PassafeResult<(String, String)> {
    if challenge.is_empty() {
        return Err(PassafeError::MalformedEncoding("challenge is empty".into()));
    }
    let position = client_data_json
        .find(challenge)
        .ok_or_else(|| PassafeError::ChallengeNotFound(challenge.to_string()))?;

    let prefix = &client_data_json[..position];
    let suffix = &client_data_json[position + challenge.len()..];
    Ok((prefix.to_string(), suffix.to_string()))
}

/// Authenticator data is forwarded verbatim; the verifier checks flags and counter.
pub fn decode_authenticator_data(encoded: &str) -> PassafeResult<Vec<u8>> {
    decode_base64url(encoded)
}

pub fn decode_client_data(encoded: &str) -> PassafeResult<String> {
    let bytes = decode_base64url(encoded)?;
    String::from_utf8(bytes)
        .map_err(|e| PassafeError::MalformedEncoding(format!("client data is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_base64url;

    const CLIENT_DATA: &str = r#"{"type":"webauthn.get","challenge":"abc123","origin":"https://x"}"#;

    fn der(r: &[u8], s: &[u8]) -> Vec<u8> {
        fn integer(n: &[u8]) -> Vec<u8> {
            let n: Vec<u8> = n.iter().skip_while(|b| **b == 0).copied().collect();
            let pad = n.first().map_or(true, |b| b & 0x80 != 0);
            let mut out = vec![0x02, (n.len() + pad as usize) as u8];
            if pad {
                out.push(0);
            }
            out.extend_from_slice(&n);
            out
        }
        let r = integer(r);
        let s = integer(s);
        let mut out = vec![0x30, (r.len() + s.len()) as u8];
        out.extend(r);
        out.extend(s);
        out
    }

    #[test]
    fn test_split_client_data_reassembles() {
        let (prefix, suffix) = split_client_data(CLIENT_DATA, "abc123").unwrap();
        assert_eq!(prefix, r#"{"type":"webauthn.get","challenge":""#);
        assert_eq!(suffix, r#"","origin":"https://x"}"#);
        assert_eq!(format!("{prefix}abc123{suffix}"), CLIENT_DATA);
    }

    #[test]
    fn test_split_client_data_missing_challenge() {
        assert!(matches!(
            split_client_data(CLIENT_DATA, "zzz999"),
            Err(PassafeError::ChallengeNotFound(_))
        ));
        assert!(matches!(
            split_client_data(CLIENT_DATA, ""),
            Err(PassafeError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_split_uses_first_occurrence() {
        let json = r#"{"challenge":"aa","other":"aa"}"#;
        let (prefix, suffix) = split_client_data(json, "aa").unwrap();
        assert_eq!(prefix, r#"{"challenge":""#);
        assert_eq!(suffix, r#"","other":"aa"}"#);
    }

    #[test]
    fn test_parse_raw_signature() {
        let mut raw = [0x11u8; 64];
        raw[32..].fill(0x82);
        let (r, s) = parse_signature(&raw).unwrap();
        assert_eq!(r, Uint256([0x11; 32]));
        assert_eq!(s, Uint256([0x82; 32]));
    }

    #[test]
    fn test_der_and_raw_agree() {
        let r = [0x11u8; 32];
        let s = [0x82u8; 32];
        let der_sig = der(&r, &s);
        // s has its high bit set, so DER carries a 0x00 sign byte.
        assert_eq!(der_sig.len(), 71);

        let mut raw = r.to_vec();
        raw.extend_from_slice(&s);

        assert_eq!(parse_signature(&der_sig).unwrap(), parse_signature(&raw).unwrap());
    }

    #[test]
    fn test_der_with_short_integer() {
        let mut r = [0u8; 32];
        r[1..].fill(0x33);
        let s = [0x44u8; 32];
        let (parsed_r, parsed_s) = parse_signature(&der(&r, &s)).unwrap();
        assert_eq!(parsed_r, Uint256(r));
        assert_eq!(parsed_s, Uint256(s));
    }

    #[test]
    fn test_parse_signature_rejects_other_lengths() {
        assert!(matches!(
            parse_signature(&[0u8; 63]),
            Err(PassafeError::InvalidSignatureEncoding(_))
        ));
        assert!(matches!(
            parse_signature(&[]),
            Err(PassafeError::InvalidSignatureEncoding(_))
        ));
        // Well-formed header, garbage body.
        assert!(matches!(
            parse_signature(&[0x30, 0x03, 0x02, 0x01, 0x00]),
            Err(PassafeError::InvalidSignatureEncoding(_))
        ));
    }

    #[test]
    fn test_decode_client_data() {
        let encoded = encode_base64url(CLIENT_DATA.as_bytes());
        assert_eq!(decode_client_data(&encoded).unwrap(), CLIENT_DATA);
        assert!(decode_client_data(&encode_base64url(&[0xff, 0xfe])).is_err());
        assert!(decode_authenticator_data("!!").is_err());
    }
}
