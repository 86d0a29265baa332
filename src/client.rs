use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A label attached to a client, together with the principal that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClientLabel {
    pub name: String,
    #[serde(default)]
    pub owner: String,
}

impl ClientLabel {
    pub fn new(name: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
        }
    }
}

/// Snapshot of one managed endpoint's searchable attributes.
///
/// Only `client_id` is required when deserializing; every other field
/// defaults to empty.
///
/// # Examples
///
/// ```
/// use fleetseek::client::ClientRecord;
///
/// let record: ClientRecord = serde_json::from_str(
///     r#"{"client_id": "C.1000000000000001", "hostname": "Host-1"}"#,
/// )
/// .unwrap();
/// assert_eq!(record.hostname, "Host-1");
/// assert!(record.labels.is_empty());
/// ```
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
pub struct ClientRecord {
    pub client_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub fqdn: String,
    #[serde(default)]
    pub labels: Vec<ClientLabel>,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub mac_addresses: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl ClientRecord {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, hostname: &str, fqdn: &str) -> Self {
        self.hostname = hostname.to_string();
        self.fqdn = fqdn.to_string();
        self
    }

    pub fn with_label(mut self, name: &str, owner: &str) -> Self {
        self.labels.push(ClientLabel::new(name, owner));
        self
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip_addresses.push(ip.to_string());
        self
    }

    pub fn with_mac(mut self, mac: &str) -> Self {
        self.mac_addresses.push(mac.to_string());
        self
    }

    pub fn with_user(mut self, username: &str) -> Self {
        self.users.push(username.to_string());
        self
    }

    /// Reject records that could never be found by id.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidClient("client_id is blank".to_string()));
        }
        Ok(())
    }

    /// Add a label unless one with the same name is already present.
    pub fn add_label(&mut self, name: &str, owner: &str) -> bool {
        if self.labels.iter().any(|l| l.name == name) {
            return false;
        }
        self.labels.push(ClientLabel::new(name, owner));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_fields() {
        let record = ClientRecord::new("C.1")
            .with_host("Host-1", "Host-1.example.com")
            .with_label("prod", "admin")
            .with_ip("192.168.0.1")
            .with_mac("aabbccddee01")
            .with_user("alice");

        assert_eq!(record.client_id, "C.1");
        assert_eq!(record.fqdn, "Host-1.example.com");
        assert_eq!(record.labels, vec![ClientLabel::new("prod", "admin")]);
        assert_eq!(record.ip_addresses, vec!["192.168.0.1"]);
        assert_eq!(record.mac_addresses, vec!["aabbccddee01"]);
        assert_eq!(record.users, vec!["alice"]);
    }

    #[test]
    fn add_label_skips_duplicates() {
        let mut record = ClientRecord::new("C.1");
        assert!(record.add_label("prod", "admin"));
        assert!(!record.add_label("prod", "someone-else"));
        assert_eq!(record.labels.len(), 1);
    }

    #[test]
    fn blank_client_id_fails_validation() {
        assert!(ClientRecord::new("C.1").validate().is_ok());
        for id in ["", "   ", "\t"] {
            assert!(matches!(
                ClientRecord::new(id).validate(),
                Err(Error::InvalidClient(_))
            ));
        }
    }

    #[test]
    fn deserialize_label_without_owner() {
        let record: ClientRecord = serde_json::from_str(
            r#"{"client_id": "C.2", "labels": [{"name": "web"}]}"#,
        )
        .unwrap();
        assert_eq!(record.labels[0].name, "web");
        assert_eq!(record.labels[0].owner, "");
    }

    #[test]
    fn missing_client_id_is_rejected() {
        let parsed: serde_json::Result<ClientRecord> =
            serde_json::from_str(r#"{"hostname": "Host-1"}"#);
        assert!(parsed.is_err());
    }
}
