use anyhow::anyhow;
use base64::Engine;
use chrono::{DateTime, Utc};
use image::Luma;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// The signed token content embedded in a QR code. The signature covers every
/// other field, so altering any of them invalidates the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPayload {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub inscription_id: String,
    pub timestamp: String,
    pub signature: String,
}

/// Deterministic composite identifier for an inscription.
pub fn inscription_ref(user_id: Uuid, event_id: Uuid) -> String {
    format!("{}_{}", user_id, event_id)
}

/// Keyed digest over the payload fields in fixed order. The server-side
/// secret makes the signature forgeable only by the issuer; without it the
/// digest would merely be tamper-evident.
fn signature(
    secret: &str,
    event_id: Uuid,
    user_id: Uuid,
    inscription_id: &str,
    timestamp: &str,
) -> String {
    let data = format!(
        "{}:{}:{}:{}:{}",
        secret, event_id, user_id, inscription_id, timestamp
    );
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Compose and sign a payload binding a user to an event inscription.
pub fn issue(secret: &str, event_id: Uuid, user_id: Uuid, issued_at: DateTime<Utc>) -> QrPayload {
    let inscription_id = inscription_ref(user_id, event_id);
    let timestamp = issued_at.to_rfc3339();
    let signature = signature(secret, event_id, user_id, &inscription_id, &timestamp);
    QrPayload {
        event_id,
        user_id,
        inscription_id,
        timestamp,
        signature,
    }
}

pub fn encode(payload: &QrPayload) -> AppResult<String> {
    serde_json::to_string(payload)
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to serialize QR payload: {}", e)))
}

/// Parse a raw scanned payload and check its signature against a fresh
/// computation over the received fields. Parse failures and signature
/// mismatches are both client errors; neither mutates any state.
pub fn decode_and_verify(secret: &str, raw: &str) -> AppResult<QrPayload> {
    let payload: QrPayload = serde_json::from_str(raw)
        .map_err(|_| AppError::BadRequest(anyhow!("QR payload is not valid JSON")))?;

    let expected = signature(
        secret,
        payload.event_id,
        payload.user_id,
        &payload.inscription_id,
        &payload.timestamp,
    );
    if payload.signature != expected {
        return Err(AppError::BadRequest(anyhow!(
            "QR signature does not match payload"
        )));
    }

    Ok(payload)
}

/// Render the serialized payload as a PNG QR image, base64-encoded for
/// embedding in a JSON response.
pub fn render_png_base64(data: &str) -> AppResult<String> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to build QR code: {}", e)))?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(240, 240)
        .build();

    let mut png = Vec::new();
    img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut png))
        .map_err(|e| AppError::InternalServerError(anyhow!("Failed to encode QR image: {}", e)))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn issued() -> QrPayload {
        issue(SECRET, Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn issued_payload_verifies() {
        let payload = issued();
        let raw = encode(&payload).unwrap();
        let verified = decode_and_verify(SECRET, &raw).unwrap();
        assert_eq!(verified.event_id, payload.event_id);
        assert_eq!(verified.user_id, payload.user_id);
        assert_eq!(verified.signature, payload.signature);
    }

    #[test]
    fn inscription_ref_is_deterministic() {
        let user = Uuid::new_v4();
        let event = Uuid::new_v4();
        assert_eq!(inscription_ref(user, event), inscription_ref(user, event));
        assert_eq!(inscription_ref(user, event), format!("{}_{}", user, event));
    }

    #[test]
    fn tampered_event_id_fails_verification() {
        let mut payload = issued();
        payload.event_id = Uuid::new_v4();
        let raw = encode(&payload).unwrap();
        let err = decode_and_verify(SECRET, &raw).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn tampered_user_id_fails_verification() {
        let mut payload = issued();
        payload.user_id = Uuid::new_v4();
        let raw = encode(&payload).unwrap();
        assert!(decode_and_verify(SECRET, &raw).is_err());
    }

    #[test]
    fn tampered_timestamp_fails_verification() {
        let mut payload = issued();
        payload.timestamp = "2001-01-01T00:00:00+00:00".to_string();
        let raw = encode(&payload).unwrap();
        assert!(decode_and_verify(SECRET, &raw).is_err());
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let payload = issued();
        let raw = encode(&payload).unwrap();
        assert!(decode_and_verify("other-secret", &raw).is_err());
    }

    #[test]
    fn garbage_payload_is_a_format_error() {
        let err = decode_and_verify(SECRET, "not json at all").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn payload_serializes_with_expected_field_names() {
        let payload = issued();
        let json: serde_json::Value = serde_json::from_str(&encode(&payload).unwrap()).unwrap();
        for field in [
            "event_id",
            "user_id",
            "inscription_id",
            "timestamp",
            "signature",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn rendered_image_is_valid_base64_png() {
        let payload = issued();
        let raw = encode(&payload).unwrap();
        let b64 = render_png_base64(&raw).unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .unwrap();
        // PNG magic bytes
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
