//! SQLite-backed device and contact store using `SeaORM`.
//!
//! Holds the paired device identity (so later runs resume without pairing)
//! and the contact list synced from the account, which is the only chat
//! universe WhatsApp exposes to this process. The protocol client's own key
//! material lives in the same file, see [`KeyStore`].

pub(crate) mod entity;
mod keys;
mod migration;

use std::path::Path;

use sea_orm::{
    ActiveValue::Set, Database, DatabaseConnection, EntityTrait, QueryOrder,
    sea_query::OnConflict,
};
use sea_orm_migration::MigratorTrait;

use crate::error::{MessengerError, Result};
use crate::types::Contact;

use super::{DeviceIdentity, Jid};
use entity::{contact, device};
use migration::Migrator;

pub use keys::KeyStore;

/// Local device/contact store, opened or created at a filesystem path.
pub struct DeviceStore {
    db: DatabaseConnection,
}

impl DeviceStore {
    /// Open the store, creating the file, its directory, and the schema as needed.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MessengerError::Storage(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url)
            .await
            .map_err(|e| MessengerError::Storage(format!("Failed to connect to SQLite: {e}")))?;

        Migrator::up(&db, None)
            .await
            .map_err(|e| MessengerError::Storage(format!("Failed to run migrations: {e}")))?;

        log::info!("Device store opened at {}", db_path.display());
        Ok(Self { db })
    }

    /// Protocol key storage on the same database.
    pub fn keys(&self) -> KeyStore {
        KeyStore::new(self.db.clone())
    }

    /// The first paired device, if any.
    pub async fn device(&self) -> Result<Option<DeviceIdentity>> {
        let row = device::Entity::find()
            .order_by_asc(device::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(|e| MessengerError::Storage(format!("Failed to query device: {e}")))?;

        row.map(device::Model::into_identity).transpose()
    }

    pub async fn save_device(&self, identity: &DeviceIdentity) -> Result<()> {
        let active_model = device::ActiveModel {
            jid: Set(identity.jid.to_string()),
            push_name: Set(identity.push_name.clone()),
            credentials: Set(identity.credentials.clone()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        device::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(device::Column::Jid)
                    .update_columns([device::Column::PushName, device::Column::Credentials])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| MessengerError::Storage(format!("Failed to save device: {e}")))?;

        Ok(())
    }

    /// All contacts, ordered by JID.
    pub async fn contacts(&self) -> Result<Vec<Contact>> {
        let rows = contact::Entity::find()
            .order_by_asc(contact::Column::Jid)
            .all(&self.db)
            .await
            .map_err(|e| MessengerError::Storage(format!("Failed to query contacts: {e}")))?;

        Ok(rows.into_iter().map(contact::Model::into_contact).collect())
    }

    pub async fn contact(&self, jid: &Jid) -> Result<Option<Contact>> {
        let row = contact::Entity::find_by_id(jid.to_non_device().to_string())
            .one(&self.db)
            .await
            .map_err(|e| MessengerError::Storage(format!("Failed to query contact: {e}")))?;

        Ok(row.map(contact::Model::into_contact))
    }

    /// Insert or update a contact keyed by its JID. An empty name clears it.
    pub async fn upsert_contact(&self, jid: &Jid, name: Option<&str>) -> Result<()> {
        let active_model = contact::ActiveModel {
            jid: Set(jid.to_non_device().to_string()),
            name: Set(name.filter(|n| !n.is_empty()).map(String::from)),
            updated_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        contact::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(contact::Column::Jid)
                    .update_columns([contact::Column::Name, contact::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(|e| MessengerError::Storage(format!("Failed to save contact: {e}")))?;

        Ok(())
    }
}

impl device::Model {
    fn into_identity(self) -> Result<DeviceIdentity> {
        let jid = Jid::parse(&self.jid)
            .map_err(|e| MessengerError::Storage(format!("Invalid device JID in store: {e}")))?;
        Ok(DeviceIdentity {
            jid,
            push_name: self.push_name,
            credentials: self.credentials,
        })
    }
}

impl contact::Model {
    /// Names fall back to the phone number when the account has none on file.
    fn into_contact(self) -> Contact {
        let phone_number = self
            .jid
            .split_once('@')
            .map_or(self.jid.as_str(), |(user, _)| user)
            .to_string();
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| phone_number.clone());
        Contact {
            jid: self.jid,
            phone_number,
            name,
        }
    }
}
