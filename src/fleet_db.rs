use std::path::Path;

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};

use crate::{
    client::ClientRecord,
    error::{Error, Result},
    registry::{JobLookup, JobRegistry},
    snapshot::ClientSource,
};

const CLIENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("clients");
const HUNTS: TableDefinition<&str, &str> = TableDefinition::new("hunts");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// On-disk store for client records, hunts and settings.
pub struct FleetDb {
    db: Database,
}

impl FleetDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(redb::Error::from)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(CLIENTS)?;
        txn.open_table(HUNTS)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Clients --

    pub fn put_client(&self, record: &ClientRecord) -> Result<()> {
        record.validate()?;
        let bytes = serde_json::to_vec(record)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CLIENTS)?;
            table.insert(record.client_id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Store multiple client records in a single transaction.
    pub fn batch_put_clients(&self, records: &[ClientRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut encoded = Vec::with_capacity(records.len());
        for record in records {
            record.validate()?;
            encoded.push((record.client_id.as_str(), serde_json::to_vec(record)?));
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(CLIENTS)?;
            for (client_id, bytes) in &encoded {
                table.insert(*client_id, bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_client(&self, client_id: &str) -> Result<Option<ClientRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CLIENTS)?;
        match table.get(client_id)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_client(&self, client_id: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(CLIENTS)?;
            table.remove(client_id)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Return every stored client record in a single read transaction.
    pub fn list_clients(&self) -> Result<Vec<ClientRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CLIENTS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (_k, v) = entry?;
            result.push(serde_json::from_slice(v.value())?);
        }
        Ok(result)
    }

    pub fn client_count(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CLIENTS)?;
        Ok(table.len()?)
    }

    // -- Hunts --

    pub fn set_hunt(&self, hunt_id: &str, description: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(HUNTS)?;
            table.insert(hunt_id, description)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_hunt(&self, hunt_id: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(HUNTS)?;
        Ok(table.get(hunt_id)?.map(|v| v.value().to_string()))
    }

    pub fn remove_hunt(&self, hunt_id: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(HUNTS)?;
            table.remove(hunt_id)?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    pub fn list_hunts(&self) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(HUNTS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }

    // -- Settings --

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    /// Get a setting, returning the default if not set.
    pub fn get_setting_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .get_setting(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

impl std::fmt::Debug for FleetDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetDb").finish_non_exhaustive()
    }
}

impl ClientSource for FleetDb {
    fn clients(&self) -> Result<Vec<ClientRecord>> {
        self.list_clients()
    }
}

impl JobRegistry for FleetDb {
    fn resolve_job(&self, job_id: &str) -> Result<JobLookup> {
        match self.get_hunt(job_id) {
            Ok(Some(_)) => Ok(JobLookup::Found(job_id.to_string())),
            Ok(None) => Ok(JobLookup::NotFound),
            Err(e) => Err(Error::Registry(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, FleetDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = FleetDb::open(&tmp.path().join("fleet.redb")).unwrap();
        (tmp, db)
    }

    #[test]
    fn clients_crud() {
        let (_tmp, db) = test_db();
        assert!(db.list_clients().unwrap().is_empty());

        let record = ClientRecord::new("C.1")
            .with_host("Host-1", "Host-1.example.com")
            .with_label("prod", "admin");
        db.put_client(&record).unwrap();

        assert_eq!(db.get_client("C.1").unwrap(), Some(record.clone()));
        assert_eq!(db.list_clients().unwrap(), vec![record]);
        assert_eq!(db.client_count().unwrap(), 1);

        assert!(db.remove_client("C.1").unwrap());
        assert!(!db.remove_client("C.1").unwrap());
        assert_eq!(db.get_client("C.1").unwrap(), None);
    }

    #[test]
    fn batch_put_overwrites_by_id() {
        let (_tmp, db) = test_db();
        db.batch_put_clients(&[ClientRecord::new("C.1"), ClientRecord::new("C.2")])
            .unwrap();
        db.batch_put_clients(&[ClientRecord::new("C.1").with_user("alice")])
            .unwrap();

        assert_eq!(db.client_count().unwrap(), 2);
        assert_eq!(db.get_client("C.1").unwrap().unwrap().users, vec!["alice"]);
    }

    #[test]
    fn blank_client_ids_are_not_stored() {
        let (_tmp, db) = test_db();
        assert!(matches!(
            db.put_client(&ClientRecord::new("  ")),
            Err(Error::InvalidClient(_))
        ));
        assert!(matches!(
            db.batch_put_clients(&[ClientRecord::new("C.1"), ClientRecord::new("")]),
            Err(Error::InvalidClient(_))
        ));
        assert_eq!(db.client_count().unwrap(), 0);
    }

    #[test]
    fn hunts_crud_and_registry() {
        let (_tmp, db) = test_db();
        db.set_hunt("H:1A2B3C4D", "demo hunt").unwrap();

        assert_eq!(
            db.get_hunt("H:1A2B3C4D").unwrap(),
            Some("demo hunt".to_string())
        );
        assert_eq!(
            db.resolve_job("H:1A2B3C4D").unwrap(),
            JobLookup::Found("H:1A2B3C4D".to_string())
        );
        assert_eq!(db.resolve_job("H:12345678").unwrap(), JobLookup::NotFound);

        assert_eq!(db.list_hunts().unwrap().len(), 1);
        assert!(db.remove_hunt("H:1A2B3C4D").unwrap());
        assert!(db.list_hunts().unwrap().is_empty());
    }

    #[test]
    fn settings_crud() {
        let (_tmp, db) = test_db();

        assert_eq!(db.get_setting("registry_policy").unwrap(), None);
        assert_eq!(
            db.get_setting_or("registry_policy", "fail-closed").unwrap(),
            "fail-closed"
        );

        db.set_setting("registry_policy", "propagate").unwrap();
        assert_eq!(
            db.get_setting_or("registry_policy", "fail-closed").unwrap(),
            "propagate"
        );
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fleet.redb");

        {
            let db = FleetDb::open(&path).unwrap();
            db.put_client(&ClientRecord::new("C.1")).unwrap();
            db.set_hunt("H:ABCDEF12", "").unwrap();
        }

        {
            let db = FleetDb::open(&path).unwrap();
            assert_eq!(db.clients().unwrap(), vec![ClientRecord::new("C.1")]);
            assert!(db.get_hunt("H:ABCDEF12").unwrap().is_some());
        }
    }
}
