//! Endpoint catalogue: one typed method per backend route.
//!
//! DESIGN
//! ======
//! Every method is a thin `impl ApiClient` wrapper so bearer auth and
//! refresh-and-replay apply uniformly. The only endpoint-specific logic is
//! token bookkeeping on login/logout, the multipart layout of uploads and
//! the client-side period filter.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use reqwest::Url;
use serde_json::{Value, json};

use super::client::{ApiClient, RequestOptions};
use super::error::{ApiError, PAYMENT_REQUIRED_CODE};
use super::transport::MultipartForm;
use super::types::{
    AnalysisResult, AnalyzeOutcome, BillingStatus, CheckoutSession, Convention, CreditGrant, CreditPack, Credits,
    LoginRequest, MessageResponse, PageRequest, PayslipPage, PayslipStats, PayslipSummary, PaymentCheck, ProfileUpdate,
    RegisterRequest, ResetPasswordRequest, TokenResponse, UploadPayslip, UploadedPayslip, User,
};

pub const LOGIN_PATH: &str = "/api/token/";
pub const PROFILE_PATH: &str = "/api/profile/";

const FREE_CREDIT_REASON: &str = "Bonus quotidien";

impl ApiClient {
    // =========================================================================
    // AUTH / PROFILE
    // =========================================================================

    /// Exchange credentials for an access token and store it. The refresh
    /// token arrives as a cookie and stays in the transport's jar.
    ///
    /// Bad credentials answer 401; that is not retried through a refresh.
    ///
    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/token/`.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let tokens: TokenResponse = self
            .post_with(LOGIN_PATH, &LoginRequest { username, password }, &RequestOptions::no_retry())
            .await?;
        match tokens.access {
            Some(access) if !access.is_empty() => {
                self.set_access_token(Some(access));
                tracing::info!(username, "logged in");
            }
            _ => tracing::warn!(username, "login response carried no access token"),
        }
        Ok(())
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/register/` (field errors as
    /// a 400 body).
    pub async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError> {
        self.post("/api/register/", request).await
    }

    /// Tell the backend to drop the refresh cookie. The local token is
    /// cleared whatever the outcome.
    ///
    /// # Errors
    ///
    /// The network or HTTP error of `POST /api/logout/`, reported after the
    /// token has been cleared.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let outcome = self.post_empty::<Value>("/api/logout/").await;
        self.set_access_token(None);
        match outcome {
            Ok(_) => Ok(()),
            Err(error) => {
                tracing::warn!(error = %error, "logout call failed; local token cleared anyway");
                Err(error)
            }
        }
    }

    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/profile/`.
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.get(PROFILE_PATH).await
    }

    /// Profile fetch with explicit options (bootstrap disables the retry).
    ///
    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/profile/`.
    pub async fn profile_with(&self, options: &RequestOptions) -> Result<User, ApiError> {
        self.get_with(PROFILE_PATH, options).await
    }

    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] when `update` sets nothing, otherwise the
    /// normalized error of `PATCH /api/profile/`.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("profile update sets no field".into()));
        }
        self.patch(PROFILE_PATH, update).await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/resend-verification/`.
    pub async fn resend_verification(&self, email: &str) -> Result<MessageResponse, ApiError> {
        self.post("/api/resend-verification/", &json!({ "email": email })).await
    }

    /// Confirm an email address with the token from the verification link.
    ///
    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/verify-email/?token=`.
    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse, ApiError> {
        let url = Url::parse_with_params(&self.build_url("/api/verify-email/"), &[("token", token)])
            .map_err(|e| ApiError::InvalidRequest(format!("invalid verification URL: {e}")))?;
        self.get(url.as_str()).await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/request-password-reset/`.
    pub async fn request_password_reset(&self, email: &str) -> Result<MessageResponse, ApiError> {
        self.post("/api/request-password-reset/", &json!({ "email": email })).await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/reset-password/`.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<MessageResponse, ApiError> {
        self.post("/api/reset-password/", request).await
    }

    // =========================================================================
    // BILLING
    // =========================================================================

    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/billing/me/credits/`.
    pub async fn my_credits(&self) -> Result<Credits, ApiError> {
        self.get("/api/billing/me/credits/").await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/billing/create-checkout-session/`.
    pub async fn create_checkout_session(&self, pack: CreditPack) -> Result<CheckoutSession, ApiError> {
        self.post("/api/billing/create-checkout-session/", &json!({ "pack": pack }))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/billing/status/`.
    pub async fn billing_status(&self) -> Result<BillingStatus, ApiError> {
        self.get("/api/billing/status/").await
    }

    /// Claim the daily free credit.
    ///
    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/billing/free-credits/`.
    pub async fn claim_free_credits(&self) -> Result<CreditGrant, ApiError> {
        self.post("/api/billing/free-credits/", &json!({ "credits": 1, "reason": FREE_CREDIT_REASON }))
            .await
    }

    /// Credit a pack without a payment provider (development backends).
    ///
    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/billing/manual/`.
    pub async fn simulate_payment(&self, pack: CreditPack) -> Result<CreditGrant, ApiError> {
        self.post("/api/billing/manual/", &json!({ "pack": pack, "simulate_success": true }))
            .await
    }

    /// Ask the backend to reconcile pending checkout sessions.
    ///
    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/billing/check-payment-status/`.
    pub async fn check_payment_status(&self) -> Result<PaymentCheck, ApiError> {
        self.post("/api/billing/check-payment-status/", &json!({})).await
    }

    // =========================================================================
    // PAYSLIPS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/payslips/`.
    pub async fn list_payslips(&self, page: PageRequest) -> Result<PayslipPage, ApiError> {
        self.get(&format!("/api/payslips/?limit={}&offset={}", page.limit, page.offset))
            .await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/payslips/stats/`.
    pub async fn payslip_stats(&self) -> Result<PayslipStats, ApiError> {
        self.get("/api/payslips/stats/").await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/payslips/conventions/`.
    pub async fn conventions(&self) -> Result<Vec<Convention>, ApiError> {
        self.get("/api/payslips/conventions/").await
    }

    /// Upload a payslip document.
    ///
    /// # Errors
    ///
    /// A 402 becomes [`ApiError::Application`] with code `payment_required`;
    /// anything else is the normalized error of `POST /api/payslips/upload/`.
    pub async fn upload_payslip(&self, upload: UploadPayslip) -> Result<UploadedPayslip, ApiError> {
        let form = upload_form(upload);
        match self.upload("/api/payslips/upload/", form).await {
            Err(error) if error.status() == Some(402) => Err(ApiError::Application {
                status: 402,
                code: PAYMENT_REQUIRED_CODE.to_owned(),
                body: json!({ "code": PAYMENT_REQUIRED_CODE, "message": "Paiement requis" }),
            }),
            other => other,
        }
    }

    /// # Errors
    ///
    /// Returns the normalized error of `DELETE /api/payslips/{id}/delete/`.
    pub async fn delete_payslip(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/api/payslips/{id}/delete/")).await?;
        Ok(())
    }

    /// Payslips on the first page whose period contains `needle`
    /// (case-insensitive). Used to spot duplicates before an upload.
    ///
    /// # Errors
    ///
    /// Returns the normalized error of the underlying list call.
    pub async fn find_payslips_by_period(&self, needle: &str) -> Result<Vec<PayslipSummary>, ApiError> {
        let page = self.list_payslips(PageRequest::default()).await?;
        Ok(filter_by_period(page.results, needle))
    }

    // =========================================================================
    // ANALYSIS
    // =========================================================================

    /// # Errors
    ///
    /// Returns the normalized error of `POST /api/analysis/payslip/{id}/analyze/`.
    pub async fn analyze_payslip(&self, id: i64) -> Result<AnalyzeOutcome, ApiError> {
        self.post_empty(&format!("/api/analysis/payslip/{id}/analyze/")).await
    }

    /// # Errors
    ///
    /// Returns the normalized error of `GET /api/analysis/payslip/{id}/results/`.
    pub async fn analysis_results(&self, id: i64) -> Result<AnalysisResult, ApiError> {
        self.get(&format!("/api/analysis/payslip/{id}/results/")).await
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn upload_form(upload: UploadPayslip) -> MultipartForm {
    let content_type = content_type_for(&upload.file_name);
    let mut form = MultipartForm::new().file("uploaded_file", &upload.file_name, content_type, upload.bytes);

    let optional = [
        ("convention_collective", upload.convention_collective),
        ("contractual_salary", upload.contractual_salary),
        ("additional_details", upload.additional_details),
        ("period", upload.period),
        ("date_paiement", upload.date_paiement),
        ("employment_status", upload.employment_status),
        ("expected_smic_percent", upload.expected_smic_percent),
        ("working_time_ratio", upload.working_time_ratio),
    ];
    for (name, value) in optional {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            form = form.text(name, value);
        }
    }
    form
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn filter_by_period(rows: Vec<PayslipSummary>, needle: &str) -> Vec<PayslipSummary> {
    let needle = needle.to_lowercase();
    rows.into_iter()
        .filter(|row| {
            row.period
                .as_deref()
                .unwrap_or_default()
                .to_lowercase()
                .contains(&needle)
        })
        .collect()
}
