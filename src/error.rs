use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use thiserror::Error;

/// Stable, caller-facing classification of engine failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    ProviderNotSupported,
    ModelNotFound,
    PricingVersionNotFound,
    UnsupportedDimension,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::ProviderNotSupported => "PROVIDER_NOT_SUPPORTED",
            ErrorKind::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorKind::PricingVersionNotFound => "PRICING_VERSION_NOT_FOUND",
            ErrorKind::UnsupportedDimension => "UNSUPPORTED_DIMENSION",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Failure of a single estimate or catalog query.
///
/// Every variant is a pure function of the request and the registry snapshot.
/// `Internal` keeps its cause for logs; `Display` and `details()` never show it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{message}")]
    InvalidRequest { message: String, details: Value },

    #[error("Provider not supported: {provider}")]
    ProviderNotSupported { provider: String },

    #[error("Model not found: {provider}/{model}")]
    ModelNotFound { provider: String, model: String },

    #[error("Pricing version not found: {requested}")]
    PricingVersionNotFound { requested: String, available: String },

    #[error("Unsupported dimension for {provider}/{model}: {}", .dimensions.join(", "))]
    UnsupportedDimension {
        provider: String,
        model: String,
        dimensions: Vec<String>,
    },

    #[error("Internal error")]
    Internal { cause: String },
}

impl EngineError {
    pub fn invalid(message: impl Into<String>, details: Value) -> Self {
        EngineError::InvalidRequest {
            message: message.into(),
            details,
        }
    }

    pub fn internal(cause: impl fmt::Display) -> Self {
        EngineError::Internal {
            cause: cause.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            EngineError::ProviderNotSupported { .. } => ErrorKind::ProviderNotSupported,
            EngineError::ModelNotFound { .. } => ErrorKind::ModelNotFound,
            EngineError::PricingVersionNotFound { .. } => ErrorKind::PricingVersionNotFound,
            EngineError::UnsupportedDimension { .. } => ErrorKind::UnsupportedDimension,
            EngineError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Structured details for the error envelope
    pub fn details(&self) -> Value {
        match self {
            EngineError::InvalidRequest { details, .. } => details.clone(),
            EngineError::ProviderNotSupported { provider } => json!({ "provider": provider }),
            EngineError::ModelNotFound { provider, model } => {
                json!({ "provider": provider, "model": model })
            }
            EngineError::PricingVersionNotFound {
                requested,
                available,
            } => json!({ "pricing_version": requested, "available": [available] }),
            EngineError::UnsupportedDimension {
                provider,
                model,
                dimensions,
            } => json!({ "provider": provider, "model": model, "dimensions": dimensions }),
            EngineError::Internal { .. } => json!({}),
        }
    }

    /// `{"code", "message", "details"}` body used by every rendered error
    pub fn to_body(&self) -> Value {
        json!({
            "code": self.kind(),
            "message": self.to_string(),
            "details": self.details(),
        })
    }
}

/// Alias table inconsistencies, detected while building an index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("'{alias}' resolves to both '{first}' and '{second}'")]
    Ambiguous {
        alias: String,
        first: String,
        second: String,
    },

    #[error("alias '{alias}' targets '{target}', which is not a canonical key")]
    UnknownTarget { alias: String, target: String },

    #[error("key {0:?} is empty after normalization")]
    Empty(String),
}

/// Failures while opening a registry or loading one provider document
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid document {path}: {reason}")]
    Invalid { path: String, reason: String },

    #[error("alias table in {path}: {source}")]
    Alias { path: String, source: AliasError },

    #[error("bad provider glob: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl RegistryError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidRequest.code(), "INVALID_REQUEST");
        assert_eq!(ErrorKind::ProviderNotSupported.code(), "PROVIDER_NOT_SUPPORTED");
        assert_eq!(ErrorKind::ModelNotFound.code(), "MODEL_NOT_FOUND");
        assert_eq!(
            ErrorKind::PricingVersionNotFound.code(),
            "PRICING_VERSION_NOT_FOUND"
        );
        assert_eq!(ErrorKind::UnsupportedDimension.code(), "UNSUPPORTED_DIMENSION");
        assert_eq!(ErrorKind::Internal.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn unsupported_dimension_display_lists_all() {
        let e = EngineError::UnsupportedDimension {
            provider: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
            dimensions: vec![
                "audio_input_seconds".to_string(),
                "reasoning_tokens".to_string(),
            ],
        };
        assert_eq!(
            e.to_string(),
            "Unsupported dimension for openai/gpt-4.1-mini: audio_input_seconds, reasoning_tokens"
        );
        assert_eq!(e.kind(), ErrorKind::UnsupportedDimension);
    }

    #[test]
    fn internal_error_hides_cause() {
        let e = EngineError::internal("disk on fire at /srv/registry/openai.json");
        assert_eq!(e.to_string(), "Internal error");
        let body = e.to_body();
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["details"], json!({}));
        assert!(!body.to_string().contains("/srv/registry"));
    }

    #[test]
    fn body_carries_details() {
        let e = EngineError::ModelNotFound {
            provider: "openai".to_string(),
            model: "gpt-99".to_string(),
        };
        let body = e.to_body();
        assert_eq!(body["code"], "MODEL_NOT_FOUND");
        assert_eq!(body["details"]["model"], "gpt-99");
    }

    #[test]
    fn alias_error_display() {
        let e = AliasError::Ambiguous {
            alias: "gpt-5".to_string(),
            first: "gpt-5.1".to_string(),
            second: "gpt-5.2".to_string(),
        };
        assert_eq!(e.to_string(), "'gpt-5' resolves to both 'gpt-5.1' and 'gpt-5.2'");
    }
}
