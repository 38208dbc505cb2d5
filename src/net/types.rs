//! Wire DTOs mirroring the backend's JSON payloads.
//!
//! DESIGN
//! ======
//! Response types are lenient: the backend serializers grew fields over time
//! and older rows miss some, so almost everything defaults. The analysis body
//! itself stays an opaque `serde_json::Value`; `report` interprets it.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// AUTH / PROFILE
// =============================================================================

/// The signed-in user as returned by `GET /api/profile/`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub credits: Option<i64>,
    #[serde(default)]
    pub date_joined: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

/// Access-token payload of `/api/token/` and `/api/token/refresh/`.
///
/// The refresh token never appears here; it lives in an HttpOnly cookie.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Generic `{ message?, error? }` acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// BILLING
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditPack {
    Single,
    #[default]
    #[serde(rename = "pack_5")]
    Pack5,
    #[serde(rename = "pack_20")]
    Pack20,
}

impl CreditPack {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Pack5 => "pack_5",
            Self::Pack20 => "pack_20",
        }
    }

    /// Credits granted by the pack.
    #[must_use]
    pub fn credits(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Pack5 => 5,
            Self::Pack20 => 20,
        }
    }
}

impl fmt::Display for CreditPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditPack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "pack_5" => Ok(Self::Pack5),
            "pack_20" => Ok(Self::Pack20),
            other => Err(format!("unknown credit pack: {other} (expected single, pack_5 or pack_20)")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub credits: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub checkout_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct BillingStatus {
    #[serde(default)]
    pub stripe_configured: bool,
    #[serde(default)]
    pub webhook_configured: bool,
    #[serde(default)]
    pub user_credits: i64,
    #[serde(default)]
    pub stripe_key_prefix: Option<String>,
}

/// Result of a free-credit claim or a simulated manual payment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreditGrant {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub new_credits: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PaymentCheck {
    #[serde(default)]
    pub processed_orders: Value,
    #[serde(default)]
    pub credits_added: i64,
    #[serde(default)]
    pub new_credit_total: i64,
}

// =============================================================================
// PAYSLIPS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { limit: 10, offset: 0 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PayslipPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<PayslipSummary>,
}

/// One row of `GET /api/payslips/` (dashboard serializer).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PayslipSummary {
    pub id: i64,
    #[serde(default)]
    pub uploaded_file: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub net_salary: Option<f64>,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub analysis_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub conformity_score: Option<f64>,
    #[serde(default)]
    pub anomalies_count: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayslipStats {
    #[serde(default)]
    pub total_analyses: u64,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub avg_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub avg_conformity_score: Option<f64>,
    #[serde(default)]
    pub total_errors: u64,
    #[serde(default)]
    pub last_analysis: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convention {
    pub value: String,
    pub label: String,
}

/// Fields of a payslip upload. Optional fields are omitted from the form
/// when absent or blank.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadPayslip {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub convention_collective: Option<String>,
    pub contractual_salary: Option<String>,
    pub additional_details: Option<String>,
    /// Human-readable period, e.g. `mai 2025`.
    pub period: Option<String>,
    /// Payment date `YYYY-MM-DD`, used server-side to pick the SMIC rate.
    pub date_paiement: Option<String>,
    pub employment_status: Option<String>,
    pub expected_smic_percent: Option<String>,
    pub working_time_ratio: Option<String>,
}

/// Response of `POST /api/payslips/upload/`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UploadedPayslip {
    pub id: i64,
    #[serde(default)]
    pub processing_status: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub uploaded_file: Option<String>,
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// Response of `POST /api/analysis/payslip/{id}/analyze/`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AnalyzeOutcome {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payslip_id: Option<i64>,
    #[serde(default)]
    pub analysis_id: Option<i64>,
    #[serde(default)]
    pub analysis_data: Value,
}

/// Response of `GET /api/analysis/payslip/{id}/results/`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub payslip_id: Option<i64>,
    #[serde(default)]
    pub analysis_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Everything the analysis service stored; the report lives under `gpt_analysis`.
    #[serde(default)]
    pub details: Value,
}

// =============================================================================
// LENIENT NUMBERS
// =============================================================================

/// Accept numbers, numeric strings (Django `DecimalField`), or null.
///
/// Scores are copied from the model's analysis as written, so a string is
/// read up to its leading number (`"8/10"` is 8) and any other shape is
/// treated as absent rather than failing the whole page.
fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(&s),
        _ => None,
    })
}

/// Leading decimal number of `raw` (sign and one dot allowed), ignoring
/// leading whitespace.
pub(crate) fn leading_number(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    s[..end].parse::<f64>().ok()
}
