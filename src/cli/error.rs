use ratecard::{EngineError, RegistryError};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to open pricing registry at {path}: {source}")]
    Registry {
        path: String,
        source: RegistryError,
    },

    #[error("{0}")]
    Engine(#[from] EngineError),
}

impl AppError {
    /// `{"error": {...}}` envelope for JSON output
    pub(crate) fn to_envelope(&self) -> Value {
        let body = match self {
            AppError::Engine(e) => e.to_body(),
            AppError::Read { path, .. } => json!({
                "code": "INVALID_REQUEST",
                "message": self.to_string(),
                "details": { "path": path },
            }),
            AppError::Registry { .. } => EngineError::internal(self).to_body(),
        };
        json!({ "error": body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_display_read() {
        let e = AppError::Read {
            path: "req.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(e.to_string(), "Failed to read req.json: no such file");
        assert_eq!(e.to_envelope()["error"]["code"], "INVALID_REQUEST");
    }

    #[test]
    fn engine_error_passes_through() {
        let e: AppError = EngineError::ProviderNotSupported {
            provider: "mistral".to_string(),
        }
        .into();
        assert_eq!(e.to_string(), "Provider not supported: mistral");
        let envelope = e.to_envelope();
        assert_eq!(envelope["error"]["code"], "PROVIDER_NOT_SUPPORTED");
        assert_eq!(envelope["error"]["details"]["provider"], "mistral");
    }

    #[test]
    fn registry_error_is_internal_without_cause() {
        let e = AppError::Registry {
            path: "/srv/registry".to_string(),
            source: RegistryError::Invalid {
                path: "registry_meta.json".to_string(),
                reason: "schema_version 7 is not supported".to_string(),
            },
        };
        let envelope = e.to_envelope();
        assert_eq!(envelope["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(envelope["error"]["message"], "Internal error");
        assert!(!envelope.to_string().contains("schema_version"));
    }
}
