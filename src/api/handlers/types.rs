//! Request/response types for the step-up auth endpoints.

use crate::mfa::{
    challenge::ChallengeId,
    factor::{Factor, FactorId},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct EnrollStartRequest {
    /// Cosmetic label for the new factor.
    pub label: Option<String>,
}

/// Enrollment material, relayed to the user exactly once.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EnrollStartResponse {
    pub factor_id: FactorId,
    /// Base32 seed for manual entry.
    pub secret: String,
    pub otpauth_uri: String,
    /// PNG data URL of the scannable QR.
    pub qr_image: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EnrollFinishRequest {
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EnrollFinishResponse {
    pub factor_id: FactorId,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FactorsResponse {
    pub pending: Vec<Factor>,
    pub verified: Vec<Factor>,
    pub enabled: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct ChallengeStartRequest {
    /// Factor to challenge; defaults to the account's first verified
    /// factor.
    pub factor_id: Option<FactorId>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChallengeStartResponse {
    pub challenge_id: ChallengeId,
    pub factor_id: FactorId,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyRequest {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn enroll_start_response_round_trips() -> Result<()> {
        let response = EnrollStartResponse {
            factor_id: FactorId::new("factor-1"),
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            otpauth_uri: "otpauth://totp/Bear%20Love:teddy?secret=JBSWY3DPEHPK3PXP".to_string(),
            qr_image: "data:image/png;base64,AAAA".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        let secret = value
            .get("secret")
            .and_then(serde_json::Value::as_str)
            .context("missing secret")?;
        assert_eq!(secret, "JBSWY3DPEHPK3PXP");
        let decoded: EnrollStartResponse = serde_json::from_value(value)?;
        assert_eq!(decoded.factor_id, FactorId::new("factor-1"));
        Ok(())
    }

    #[test]
    fn challenge_start_request_accepts_missing_factor() -> Result<()> {
        let decoded: ChallengeStartRequest = serde_json::from_str("{}")?;
        assert!(decoded.factor_id.is_none());

        let decoded: ChallengeStartRequest =
            serde_json::from_str(r#"{"factor_id":"factor-9"}"#)?;
        assert_eq!(decoded.factor_id, Some(FactorId::new("factor-9")));
        Ok(())
    }

    #[test]
    fn verify_request_keeps_leading_zeros() -> Result<()> {
        let decoded: VerifyRequest = serde_json::from_str(r#"{"code":"000042"}"#)?;
        assert_eq!(decoded.code, "000042");
        Ok(())
    }
}
