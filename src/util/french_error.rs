//! French user-facing messages for API failures.
//!
//! DESIGN
//! ======
//! [`get_french_error`] is total: it accepts an [`ApiError`] or any loose
//! JSON value (string, array, object, number, null) and always returns a
//! title plus a non-empty description. Loose values are normalized the way
//! front-end code historically threw them:
//!
//! - `{ status, error }` from the fetch wrapper;
//! - `{ response: { status, data }, error }` from the older axios-style client;
//! - anything else is taken as the error data itself.

#[cfg(test)]
#[path = "french_error_test.rs"]
mod french_error_test;

use serde_json::Value;

use crate::net::error::{ApiError, PAYMENT_REQUIRED_CODE};

const DEFAULT_DESCRIPTION: &str = "Une erreur est survenue. Veuillez réessayer.";
const NOT_FOUND_DESCRIPTION: &str = "La ressource demandée est introuvable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedError {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
    pub status: Option<u16>,
    pub code: Option<String>,
}

// =============================================================================
// SHAPE NORMALIZATION
// =============================================================================

/// Status, payload and application code extracted from an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorShape {
    pub status: Option<u16>,
    pub data: Value,
    pub code: Option<String>,
}

impl From<&ApiError> for ErrorShape {
    fn from(error: &ApiError) -> Self {
        match error {
            ApiError::Network(message) => Self {
                status: Some(0),
                data: Value::String(message.clone()),
                code: None,
            },
            ApiError::Http { status, body } | ApiError::Application { status, body, .. } => Self {
                status: Some(*status),
                data: body.clone(),
                code: error.code().map(ToOwned::to_owned),
            },
            ApiError::Decode(_) | ApiError::Storage(_) | ApiError::InvalidRequest(_) => Self {
                status: None,
                data: Value::String(error.to_string()),
                code: None,
            },
        }
    }
}

impl From<&Value> for ErrorShape {
    fn from(raw: &Value) -> Self {
        let Value::Object(map) = raw else {
            return Self { status: None, data: raw.clone(), code: None };
        };

        let status = map.get("status").and_then(status_of);
        let error = map.get("error").filter(|e| !e.is_null());
        if status.is_some() || error.is_some_and(is_truthy) {
            return Self::with_code(status, error.unwrap_or(raw).clone());
        }

        let response = map.get("response");
        let status = response.and_then(|r| r.get("status")).and_then(status_of);
        let data = response
            .and_then(|r| r.get("data"))
            .filter(|d| !d.is_null())
            .or(error)
            .unwrap_or(raw)
            .clone();
        Self::with_code(status, data)
    }
}

impl From<Value> for ErrorShape {
    fn from(raw: Value) -> Self {
        Self::from(&raw)
    }
}

impl From<ApiError> for ErrorShape {
    fn from(error: ApiError) -> Self {
        Self::from(&error)
    }
}

impl ErrorShape {
    fn with_code(status: Option<u16>, data: Value) -> Self {
        let code = data.get("code").and_then(Value::as_str).map(ToOwned::to_owned);
        Self { status, data, code }
    }
}

fn status_of(value: &Value) -> Option<u16> {
    value.as_u64().and_then(|n| u16::try_from(n).ok())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// =============================================================================
// TRANSLATION
// =============================================================================

/// Translate any error into a French title/description pair.
pub fn get_french_error(error: impl Into<ErrorShape>) -> TranslatedError {
    let ErrorShape { status, data, code } = error.into();
    let fail = |title: &str, description: String, code: Option<String>| TranslatedError {
        title: title.to_owned(),
        description,
        variant: ToastVariant::Destructive,
        status,
        code,
    };

    match status {
        Some(0) => {
            return fail(
                "Connexion impossible",
                "Impossible de contacter le serveur. Vérifiez votre connexion.".to_owned(),
                code,
            );
        }
        Some(401) => {
            return if is_login_error(&data) {
                fail("Erreur de connexion", "Aucun compte n'existe avec ces informations.".to_owned(), code)
            } else {
                fail("Session expirée", "Veuillez vous reconnecter pour continuer.".to_owned(), code)
            };
        }
        Some(403) => {
            return fail(
                "Accès refusé",
                "Vous n'avez pas les permissions nécessaires pour effectuer cette action.".to_owned(),
                code,
            );
        }
        Some(404) => return fail("Introuvable", describe(&data, NOT_FOUND_DESCRIPTION), code),
        _ => {}
    }

    if status == Some(402) || code.as_deref() == Some(PAYMENT_REQUIRED_CODE) {
        return fail(
            "Crédits insuffisants",
            "Veuillez acheter des crédits pour lancer l'analyse.".to_owned(),
            Some(code.unwrap_or_else(|| PAYMENT_REQUIRED_CODE.to_owned())),
        );
    }

    let title = if is_validation(status, &data) { "Erreurs de validation" } else { "Erreur" };
    fail(title, describe(&data, DEFAULT_DESCRIPTION), code)
}

/// True iff the status is exactly 402 or the code is `payment_required`.
pub fn is_payment_required(error: impl Into<ErrorShape>) -> bool {
    let shape = error.into();
    shape.status == Some(402) || shape.code.as_deref() == Some(PAYMENT_REQUIRED_CODE)
}

fn is_login_error(data: &Value) -> bool {
    let text = match data {
        Value::String(s) => s.clone(),
        other if is_truthy(other) => other.to_string(),
        _ => "\"\"".to_owned(),
    };
    ["credentials", "login", "authentication", "Invalid", "Unable to log in"]
        .iter()
        .any(|needle| text.contains(needle))
}

fn is_validation(status: Option<u16>, data: &Value) -> bool {
    if matches!(status, Some(400 | 422)) {
        return true;
    }
    data.as_object().is_some_and(|map| {
        map.keys()
            .any(|k| k == "non_field_errors" || k == "email" || k.contains("password"))
    })
}

fn describe(data: &Value, fallback: &str) -> String {
    let lines: Vec<String> = messages_from(data)
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() { fallback.to_owned() } else { lines.join("\n") }
}

fn messages_from(data: &Value) -> Vec<String> {
    match data {
        Value::String(s) => return vec![s.clone()],
        Value::Array(items) => return items.iter().map(display).collect(),
        Value::Object(map) => {
            let mut messages = Vec::new();
            for key in ["detail", "message", "error"] {
                if let Some(Value::String(s)) = map.get(key) {
                    messages.push(s.clone());
                }
            }
            for (key, value) in map {
                if matches!(key.as_str(), "detail" | "message" | "error") {
                    continue;
                }
                let label = field_label(key).unwrap_or(key.as_str());
                match value {
                    Value::Array(items) => {
                        let joined: Vec<String> = items.iter().map(display).collect();
                        messages.push(format!("{label}: {}", joined.join(", ")));
                    }
                    Value::String(s) => messages.push(format!("{label}: {s}")),
                    _ => {}
                }
            }
            if !messages.is_empty() {
                return messages;
            }
        }
        _ => {}
    }
    let text = display(data);
    if text.is_empty() { Vec::new() } else { vec![text] }
}

/// Strings are translated; other values are shown as JSON; null is empty.
fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => translate_message(s),
        other => other.to_string(),
    }
}

fn field_label(key: &str) -> Option<&'static str> {
    Some(match key {
        "email" => "Adresse email",
        "username" => "Nom d'utilisateur",
        "password" | "password1" => "Mot de passe",
        "password2" | "password_confirm" | "confirm_password" => "Confirmation du mot de passe",
        "new_password" => "Nouveau mot de passe",
        "non_field_errors" => "Erreur",
        "detail" => "Détail",
        _ => return None,
    })
}

const WRONG_CREDENTIALS: &str = "Nom d'utilisateur ou mot de passe incorrect.";

/// Translate common Django/DRF messages; unknown messages pass through.
fn translate_message(message: &str) -> String {
    let exact = match message {
        "A user with that username already exists." => Some("Un utilisateur avec ce nom existe déjà."),
        "User with this email already exists." | "A user with that email already exists." => {
            Some("Un utilisateur avec cet email existe déjà.")
        }
        "This field is required." => Some("Ce champ est obligatoire."),
        "Enter a valid email address." => Some("Entrez une adresse email valide."),
        "This password is too short. It must contain at least 8 characters." => {
            Some("Ce mot de passe est trop court. Il doit contenir au moins 8 caractères.")
        }
        "This password is too common." => Some("Ce mot de passe est trop courant."),
        "This password is entirely numeric." => Some("Ce mot de passe ne contient que des chiffres."),
        "The two password fields didn't match." => Some("Les deux mots de passe ne correspondent pas."),
        "Invalid token." => Some("Token invalide."),
        "Token has expired." => Some("Le token a expiré."),
        "User is not active." => Some("L'utilisateur n'est pas actif."),
        "Unable to log in with provided credentials."
        | "No active account found with the given credentials"
        | "Invalid credentials"
        | "Authentication failed"
        | "Invalid username or password" => Some(WRONG_CREDENTIALS),
        _ => None,
    };
    if let Some(translated) = exact {
        return translated.to_owned();
    }

    if message.contains("already exists") {
        if message.contains("username") {
            return "Un utilisateur avec ce nom existe déjà.".to_owned();
        }
        if message.contains("email") {
            return "Un utilisateur avec cet email existe déjà.".to_owned();
        }
    }
    if message.contains("password") {
        if message.contains("short") {
            return "Ce mot de passe est trop court.".to_owned();
        }
        if message.contains("common") {
            return "Ce mot de passe est trop courant.".to_owned();
        }
        if message.contains("numeric") {
            return "Ce mot de passe ne contient que des chiffres.".to_owned();
        }
    }
    message.to_owned()
}
