//! Picks the backend adapter for the configured service.

use crate::config::{Config, ConfigStore};
use crate::hosted_provider::HostedProvider;
use crate::http_client::HttpClient;
use crate::llm_provider::ChatProvider;
use crate::local_provider::LocalProvider;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// The recognized `service` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Local,
    Hosted,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown service: {0}. Valid services are \"local\" and \"hosted\".")]
pub struct UnknownService(pub String);

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Local => "local",
            Service::Hosted => "hosted",
        }
    }

    /// Service named by the configuration; an unset service means local.
    pub fn from_config(config: &Config) -> Result<Self, UnknownService> {
        match config.service.as_deref() {
            None => Ok(Service::Local),
            Some(name) => name.parse(),
        }
    }
}

impl FromStr for Service {
    type Err = UnknownService;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "local" => Ok(Service::Local),
            "hosted" => Ok(Service::Hosted),
            other => Err(UnknownService(other.to_string())),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the adapter for `service`.
pub fn select(
    service: Service,
    store: ConfigStore,
    http: Arc<dyn HttpClient>,
) -> Box<dyn ChatProvider> {
    info!("Using {} provider", service);
    match service {
        Service::Local => Box::new(LocalProvider::new(store, http)),
        Service::Hosted => Box::new(HostedProvider::new(store, http)),
    }
}

/// Reads the configured service and builds its adapter.
///
/// # Errors
///
/// Fails when the configuration cannot be read or names an unknown service;
/// there is no provider to fall back to.
pub fn select_configured(
    store: &ConfigStore,
    http: Arc<dyn HttpClient>,
) -> anyhow::Result<Box<dyn ChatProvider>> {
    let config = store.read()?;
    let service = Service::from_config(&config)?;
    Ok(select(service, store.clone(), http))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ReqwestHttpClient;
    use tempfile::TempDir;

    #[test]
    fn test_parse_known_services() {
        assert_eq!("local".parse::<Service>().unwrap(), Service::Local);
        assert_eq!("hosted".parse::<Service>().unwrap(), Service::Hosted);
    }

    #[test]
    fn test_parse_rejects_other_names() {
        for name in ["ollama", "openai", "Local", ""] {
            let err = name.parse::<Service>().unwrap_err();
            assert_eq!(err.0, name);
        }
    }

    #[test]
    fn test_unset_service_means_local() {
        assert_eq!(Service::from_config(&Config::default()).unwrap(), Service::Local);
    }

    #[test]
    fn test_select_builds_matching_adapter() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::with_dir(dir.path());
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

        assert_eq!(select(Service::Local, store.clone(), http.clone()).name(), "local");
        assert_eq!(select(Service::Hosted, store, http).name(), "hosted");
    }

    #[test]
    fn test_select_configured_fails_on_unknown_service() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::with_dir(dir.path());
        store.set_service("bard").unwrap();

        let result = select_configured(&store, Arc::new(ReqwestHttpClient::new()));

        let err = result.err().unwrap();
        assert!(err.to_string().contains("Unknown service: bard"));
    }
}
