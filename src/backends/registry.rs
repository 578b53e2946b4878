use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{BackendType, BrokerError, Result};

use super::Connector;

/// Immutable map of backend type to connector, built once at startup.
pub struct ConnectorRegistry {
    connectors: HashMap<BackendType, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn builder() -> ConnectorRegistryBuilder {
        ConnectorRegistryBuilder::default()
    }

    pub fn connector(&self, backend_type: &BackendType) -> Result<Arc<dyn Connector>> {
        self.connectors
            .get(backend_type)
            .cloned()
            .ok_or_else(|| BrokerError::ConnectorNotFound(backend_type.clone()))
    }

    pub fn backend_types(&self) -> impl Iterator<Item = &BackendType> {
        self.connectors.keys()
    }
}

#[derive(Default)]
pub struct ConnectorRegistryBuilder {
    connectors: HashMap<BackendType, Arc<dyn Connector>>,
}

impl ConnectorRegistryBuilder {
    /// Register `connector` for `backend_type`, replacing any earlier one.
    pub fn register_connector(
        mut self,
        backend_type: impl Into<BackendType>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let backend_type = backend_type.into();
        tracing::debug!(backend = %backend_type, "Registered connector");
        self.connectors.insert(backend_type, connector);
        self
    }

    pub fn build(self) -> ConnectorRegistry {
        ConnectorRegistry {
            connectors: self.connectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryConnector;

    #[test]
    fn test_lookup() {
        let registry = ConnectorRegistry::builder()
            .register_connector(BackendType::MEMORY, Arc::new(MemoryConnector::new()))
            .build();

        assert!(registry.connector(&BackendType::new(BackendType::MEMORY)).is_ok());
        assert!(matches!(
            registry.connector(&BackendType::new("mysql")),
            Err(BrokerError::ConnectorNotFound(_))
        ));
        assert_eq!(registry.backend_types().count(), 1);
    }
}
