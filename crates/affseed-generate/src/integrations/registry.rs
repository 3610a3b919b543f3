use tracing::debug;

use affseed_core::{ErrorRecord, ErrorSet, Host, Result};

use super::{Integration, IntegrationKind};

/// Either a backend name still to resolve or an adapter resolved earlier.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationRef {
    Name(String),
    Resolved(Integration),
}

impl From<&str> for IntegrationRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for IntegrationRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Integration> for IntegrationRef {
    fn from(integration: Integration) -> Self {
        Self::Resolved(integration)
    }
}

impl From<&Integration> for IntegrationRef {
    fn from(integration: &Integration) -> Self {
        Self::Resolved(integration.clone())
    }
}

pub fn is_supported(name: &str) -> bool {
    IntegrationKind::parse(name).is_some()
}

/// Resolve an integration against the host.
///
/// Already resolved adapters are returned unchanged. Host lookup failures
/// are returned as-is; inactive and disabled backends are reported together.
pub fn get(host: &dyn Host, integration: impl Into<IntegrationRef>) -> Result<Integration> {
    let name = match integration.into() {
        IntegrationRef::Resolved(integration) => return Ok(integration),
        IntegrationRef::Name(name) => name,
    };

    let Some(kind) = IntegrationKind::parse(&name) else {
        return Err(ErrorSet::from(
            ErrorRecord::new(
                "invalid_integration",
                "The specified integration was not set because the integration is not supported.",
            )
            .with_context("integration", &name)
            .with_context("supported_integrations", IntegrationKind::supported_keys()),
        ));
    };

    let backend = host.lookup_integration(kind.key())?;

    let mut errors = ErrorSet::new();
    if !backend.plugin_active {
        errors.push(
            ErrorRecord::new(
                "inactive_integration_plugin",
                "The specified integration cannot be used because the integration's plugin is inactive.",
            )
            .with_context("integration", &name),
        );
    }
    if !backend.enabled {
        errors.push(
            ErrorRecord::new(
                "disabled_integration",
                "The specified integration cannot be used because the integration is not enabled.",
            )
            .with_context("integration", &name),
        );
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    debug!(event = "integration_resolved", integration = %kind);
    Ok(Integration::new(kind, backend))
}
