//! Webhook signature verification.
//!
//! Both the payment and the scheduling provider sign webhooks the same way:
//! a header `t=<unix timestamp>,v1=<hex HMAC-SHA256>` where the HMAC covers
//! `"{timestamp}.{raw body}"`.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        Error::Signature(format!("Invalid timestamp: {}", value))
                    })?);
                }
                Some(("v1", value)) => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| Error::Signature("Missing timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(Error::Signature("Missing v1 signature".to_string()));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    Ok(mac)
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &str) -> Result<String> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Maximum accepted age of a signed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    pub now: DateTime<Utc>,
    pub max_age: Duration,
}

/// Verify a signature header against the raw payload.
pub fn verify(
    header: &str,
    payload: &str,
    secret: &str,
    tolerance: Option<Tolerance>,
) -> Result<SignatureHeader> {
    let parsed = SignatureHeader::parse(header)?;

    let mac = mac_for(secret, parsed.timestamp, payload)?;

    let matches = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matches {
        return Err(Error::Signature(
            "No signatures found matching the expected signature for payload".to_string(),
        ));
    }

    if let Some(tolerance) = tolerance {
        let signed_at = DateTime::from_timestamp(parsed.timestamp, 0)
            .ok_or_else(|| Error::Signature("Timestamp out of range".to_string()))?;
        if tolerance.now - signed_at > tolerance.max_age {
            return Err(Error::Signature(
                "Timestamp outside the tolerance zone".to_string(),
            ));
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &str = r#"{"event":"invitee.created"}"#;

    fn header_for(timestamp: i64, payload: &str) -> String {
        format!("t={},v1={}", timestamp, compute_signature(SECRET, timestamp, payload).unwrap())
    }

    #[test]
    fn test_parse_header() {
        let header = SignatureHeader::parse("t=1700000000,v1=abc,v0=old,v1=def").unwrap();
        assert_eq!(header.timestamp, 1_700_000_000);
        assert_eq!(header.signatures, vec!["abc", "def"]);
    }

    #[test]
    fn test_parse_header_rejects_missing_parts() {
        assert!(SignatureHeader::parse("v1=abc").is_err());
        assert!(SignatureHeader::parse("t=1700000000").is_err());
        assert!(SignatureHeader::parse("t=soon,v1=abc").is_err());
        assert!(SignatureHeader::parse("").is_err());
    }

    #[test]
    fn test_verify_valid_signature() {
        let header = header_for(1_700_000_000, PAYLOAD);
        assert!(verify(&header, PAYLOAD, SECRET, None).is_ok());
    }

    #[test]
    fn test_verify_accepts_any_matching_v1() {
        let valid = compute_signature(SECRET, 1_700_000_000, PAYLOAD).unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v1={}", valid);
        assert!(verify(&header, PAYLOAD, SECRET, None).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let header = header_for(1_700_000_000, PAYLOAD);
        let result = verify(&header, r#"{"event":"invitee.canceled"}"#, SECRET, None);
        assert!(matches!(result, Err(Error::Signature(_))));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let header = header_for(1_700_000_000, PAYLOAD);
        assert!(verify(&header, PAYLOAD, "other", None).is_err());
    }

    #[test]
    fn test_verify_rejects_non_hex_signature() {
        assert!(verify("t=1700000000,v1=zz", PAYLOAD, SECRET, None).is_err());
    }

    #[test]
    fn test_tolerance() {
        let header = header_for(1_700_000_000, PAYLOAD);
        let signed_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let fresh = Tolerance {
            now: signed_at + Duration::seconds(299),
            max_age: Duration::seconds(300),
        };
        assert!(verify(&header, PAYLOAD, SECRET, Some(fresh)).is_ok());

        let stale = Tolerance {
            now: signed_at + Duration::seconds(301),
            max_age: Duration::seconds(300),
        };
        assert!(verify(&header, PAYLOAD, SECRET, Some(stale)).is_err());
    }
}
