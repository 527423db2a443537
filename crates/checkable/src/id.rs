//! Checkable Identity

use flapping::ObjectKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A host, or a service attached to a host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckableId {
    Host(String),
    Service(String, String),
}

impl CheckableId {
    pub fn host(name: impl Into<String>) -> Self {
        CheckableId::Host(name.into())
    }

    pub fn service(host: impl Into<String>, service: impl Into<String>) -> Self {
        CheckableId::Service(host.into(), service.into())
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            CheckableId::Host(_) => ObjectKind::Host,
            CheckableId::Service(..) => ObjectKind::Service,
        }
    }

    pub fn host_name(&self) -> &str {
        match self {
            CheckableId::Host(host) | CheckableId::Service(host, _) => host,
        }
    }

    pub fn service_name(&self) -> Option<&str> {
        match self {
            CheckableId::Host(_) => None,
            CheckableId::Service(_, service) => Some(service),
        }
    }
}

impl fmt::Display for CheckableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckableId::Host(host) => write!(f, "{}", host),
            CheckableId::Service(host, service) => write!(f, "{}/{}", host, service),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_accessors() {
        let host = CheckableId::host("web1");
        let service = CheckableId::service("web1", "http");

        assert_eq!(host.kind(), ObjectKind::Host);
        assert_eq!(service.kind(), ObjectKind::Service);
        assert_eq!(service.host_name(), "web1");
        assert_eq!(service.service_name(), Some("http"));
        assert_eq!(host.service_name(), None);
        assert_eq!(service.to_string(), "web1/http");
    }

    #[test]
    fn test_serde_form() {
        let id = CheckableId::service("db", "replication");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"service":["db","replication"]}"#);
        assert_eq!(serde_json::from_str::<CheckableId>(&json).unwrap(), id);
    }
}
