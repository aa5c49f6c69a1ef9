use crate::error::ApiError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

/// Creates the hex-encoded HMAC-SHA256 signature Binance expects on every
/// private endpoint.
///
/// # Arguments
///
/// * `secret` - The user's API secret key.
/// * `query_string` - The full query string of the request, including the timestamp.
pub fn sign_request(secret: &str, query_string: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(query_string.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_exchange_reference_signature() {
        // Worked example from the Binance spot API documentation.
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_request(secret, query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn different_payloads_produce_different_signatures() {
        let a = sign_request("secret", "timestamp=1").unwrap();
        let b = sign_request("secret", "timestamp=2").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
