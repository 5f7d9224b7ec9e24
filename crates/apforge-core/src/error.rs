use thiserror::Error;

/// Errors raised while provisioning access-point networks.
///
/// Only conditions without a safe fallback surface here; missing flag files,
/// unparseable capability reports and failed hardware probes are resolved
/// where they occur.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("No free subnet after {base}: candidates exhausted at {last}")]
    AddressSpaceExhausted { base: String, last: String },

    #[error("No free interface name after '{base}': candidates exhausted at '{last}'")]
    InterfaceSpaceExhausted { base: String, last: String },

    #[error("BSSID counter exhausted for base {base}: more than 255 secondary networks")]
    BssidSpaceExhausted { base: String },

    #[error("Invalid interface name '{name}': {reason}")]
    InvalidInterface { name: String, reason: String },

    #[error("Invalid MAC address '{value}': {reason}")]
    InvalidMac { value: String, reason: String },

    #[error("Network '{network}' has no {what} assigned")]
    Unassigned { network: String, what: String },

    #[error("Capability report not understood: {reason}")]
    CapabilityParse { reason: String },

    #[error("Invalid configuration: {field} = '{value}': {reason}")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Probe '{command}' failed: {reason}")]
    Probe { command: String, reason: String },

    #[error("Permission denied: {operation}. Root privileges required.")]
    PermissionDenied { operation: String },

    #[error("IO error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create an IO error with context
    pub fn io_error(operation: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied {
                operation: operation.into(),
            };
        }
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn probe(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Probe {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_maps_permission_denied() {
        let err = ProvisionError::io_error(
            "writing /etc/hostapd/hostapd.conf",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, ProvisionError::PermissionDenied { .. }));

        let err = ProvisionError::io_error(
            "reading channel",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, ProvisionError::Io { .. }));
    }

    #[test]
    fn test_exhaustion_message_names_the_range() {
        let err = ProvisionError::AddressSpaceExhausted {
            base: "10.42.0.0/16".to_string(),
            last: "255.255.0.0/16".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No free subnet after 10.42.0.0/16: candidates exhausted at 255.255.0.0/16"
        );
    }
}
