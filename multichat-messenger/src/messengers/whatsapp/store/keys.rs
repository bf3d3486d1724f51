//! Protocol key store for the `whatsapp-rust` client.
//!
//! Implements `wacore::store::Backend` on the same SQLite file as
//! [`DeviceStore`](super::DeviceStore). Almost everything the client keeps is an
//! opaque blob addressed by a string, so records share one `key_records` table
//! partitioned by [`Bucket`]; only the LID/phone mappings need their own table
//! because they are looked up from both sides.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::OnConflict,
};
use wacore::appstate::hash::HashState;
use wacore::appstate::processor::AppStateMutationMAC;
use wacore::store::Device;
use wacore::store::error::{Result, StoreError, db_err};
use wacore::store::traits::{
    AppStateSyncKey, AppSyncStore, DeviceListRecord, DeviceStore, LidPnMappingEntry, ProtocolStore,
    SignalStore,
};

use super::entity::{key_record, lid_mapping};

/// 单设备进程, 设备 ID 固定
const DEVICE_ID: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Identity,
    Session,
    PreKey,
    SignedPreKey,
    SenderKey,
    SyncKey,
    SyncVersion,
    MutationMac,
    SkdmRecipient,
    BaseKey,
    DeviceList,
    ForgetMark,
    Device,
}

impl Bucket {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Session => "session",
            Self::PreKey => "prekey",
            Self::SignedPreKey => "signed_prekey",
            Self::SenderKey => "sender_key",
            Self::SyncKey => "sync_key",
            Self::SyncVersion => "sync_version",
            Self::MutationMac => "mutation_mac",
            Self::SkdmRecipient => "skdm_recipient",
            Self::BaseKey => "base_key",
            Self::DeviceList => "device_list",
            Self::ForgetMark => "forget_mark",
            Self::Device => "device",
        }
    }
}

fn encode_key(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// `SeaORM` backed storage for the WhatsApp protocol client.
#[derive(Clone)]
pub struct KeyStore {
    db: DatabaseConnection,
}

impl KeyStore {
    pub(crate) const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn get(&self, bucket: Bucket, scope: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let row = key_record::Entity::find_by_id((
            bucket.as_str().to_string(),
            scope.to_string(),
            key.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(db_err)?;
        Ok(row.map(|r| r.value))
    }

    async fn put(&self, bucket: Bucket, scope: &str, key: &str, value: Vec<u8>) -> Result<()> {
        let active_model = key_record::ActiveModel {
            bucket: Set(bucket.as_str().to_string()),
            scope: Set(scope.to_string()),
            key: Set(key.to_string()),
            value: Set(value),
        };

        key_record::Entity::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    key_record::Column::Bucket,
                    key_record::Column::Scope,
                    key_record::Column::Key,
                ])
                .update_column(key_record::Column::Value)
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn remove(&self, bucket: Bucket, scope: &str, key: &str) -> Result<()> {
        key_record::Entity::delete_by_id((
            bucket.as_str().to_string(),
            scope.to_string(),
            key.to_string(),
        ))
        .exec(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn scoped(&self, bucket: Bucket, scope: &str) -> Result<Vec<key_record::Model>> {
        key_record::Entity::find()
            .filter(key_record::Column::Bucket.eq(bucket.as_str()))
            .filter(key_record::Column::Scope.eq(scope))
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    async fn clear(&self, bucket: Bucket, scope: &str) -> Result<()> {
        key_record::Entity::delete_many()
            .filter(key_record::Column::Bucket.eq(bucket.as_str()))
            .filter(key_record::Column::Scope.eq(scope))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Raw device blob, for carrying the pairing in [`DeviceIdentity`](super::super::DeviceIdentity).
    pub(crate) async fn device_blob(&self) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::Device, "", &DEVICE_ID.to_string()).await
    }

    pub(crate) async fn restore_device_blob(&self, blob: Vec<u8>) -> Result<()> {
        self.put(Bucket::Device, "", &DEVICE_ID.to_string(), blob).await
    }
}

impl From<lid_mapping::Model> for LidPnMappingEntry {
    fn from(row: lid_mapping::Model) -> Self {
        Self {
            lid: row.lid,
            phone_number: row.phone_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
            learning_source: row.learning_source,
        }
    }
}

// ============ SignalStore ============

#[async_trait]
impl SignalStore for KeyStore {
    async fn put_identity(&self, address: &str, key: [u8; 32]) -> Result<()> {
        self.put(Bucket::Identity, "", address, key.to_vec()).await
    }

    async fn load_identity(&self, address: &str) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::Identity, "", address).await
    }

    async fn delete_identity(&self, address: &str) -> Result<()> {
        self.remove(Bucket::Identity, "", address).await
    }

    async fn get_session(&self, address: &str) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::Session, "", address).await
    }

    async fn put_session(&self, address: &str, session: &[u8]) -> Result<()> {
        self.put(Bucket::Session, "", address, session.to_vec()).await
    }

    async fn delete_session(&self, address: &str) -> Result<()> {
        self.remove(Bucket::Session, "", address).await
    }

    /// 上传标记不参与读取, 只保存记录
    async fn store_prekey(&self, id: u32, record: &[u8], _uploaded: bool) -> Result<()> {
        self.put(Bucket::PreKey, "", &id.to_string(), record.to_vec()).await
    }

    async fn load_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::PreKey, "", &id.to_string()).await
    }

    async fn remove_prekey(&self, id: u32) -> Result<()> {
        self.remove(Bucket::PreKey, "", &id.to_string()).await
    }

    async fn store_signed_prekey(&self, id: u32, record: &[u8]) -> Result<()> {
        self.put(Bucket::SignedPreKey, "", &id.to_string(), record.to_vec())
            .await
    }

    async fn load_signed_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::SignedPreKey, "", &id.to_string()).await
    }

    async fn load_all_signed_prekeys(&self) -> Result<Vec<(u32, Vec<u8>)>> {
        let mut records: Vec<(u32, Vec<u8>)> = self
            .scoped(Bucket::SignedPreKey, "")
            .await?
            .into_iter()
            .filter_map(|r| r.key.parse().ok().map(|id| (id, r.value)))
            .collect();
        records.sort_by_key(|(id, _)| *id);
        Ok(records)
    }

    async fn remove_signed_prekey(&self, id: u32) -> Result<()> {
        self.remove(Bucket::SignedPreKey, "", &id.to_string()).await
    }

    async fn put_sender_key(&self, address: &str, record: &[u8]) -> Result<()> {
        self.put(Bucket::SenderKey, "", address, record.to_vec()).await
    }

    async fn get_sender_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::SenderKey, "", address).await
    }

    async fn delete_sender_key(&self, address: &str) -> Result<()> {
        self.remove(Bucket::SenderKey, "", address).await
    }
}

// ============ AppSyncStore ============

#[async_trait]
impl AppSyncStore for KeyStore {
    async fn get_sync_key(&self, key_id: &[u8]) -> Result<Option<AppStateSyncKey>> {
        self.get(Bucket::SyncKey, "", &encode_key(key_id))
            .await?
            .map(|bytes| from_json(&bytes))
            .transpose()
    }

    async fn set_sync_key(&self, key_id: &[u8], key: AppStateSyncKey) -> Result<()> {
        self.put(Bucket::SyncKey, "", &encode_key(key_id), to_json(&key)?)
            .await
    }

    /// Unknown collections start from the default hash state.
    async fn get_version(&self, name: &str) -> Result<HashState> {
        match self.get(Bucket::SyncVersion, "", name).await? {
            Some(bytes) => from_json(&bytes),
            None => Ok(HashState::default()),
        }
    }

    async fn set_version(&self, name: &str, state: HashState) -> Result<()> {
        self.put(Bucket::SyncVersion, "", name, to_json(&state)?).await
    }

    async fn put_mutation_macs(
        &self,
        name: &str,
        _version: u64,
        mutations: &[AppStateMutationMAC],
    ) -> Result<()> {
        for mutation in mutations {
            self.put(
                Bucket::MutationMac,
                name,
                &encode_key(&mutation.index_mac),
                mutation.value_mac.clone(),
            )
            .await?;
        }
        Ok(())
    }

    async fn get_mutation_mac(&self, name: &str, index_mac: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get(Bucket::MutationMac, name, &encode_key(index_mac))
            .await
    }

    async fn delete_mutation_macs(&self, name: &str, index_macs: &[Vec<u8>]) -> Result<()> {
        for index_mac in index_macs {
            self.remove(Bucket::MutationMac, name, &encode_key(index_mac))
                .await?;
        }
        Ok(())
    }
}

// ============ ProtocolStore ============

#[async_trait]
impl ProtocolStore for KeyStore {
    async fn get_skdm_recipients(&self, group_jid: &str) -> Result<Vec<String>> {
        Ok(self
            .scoped(Bucket::SkdmRecipient, group_jid)
            .await?
            .into_iter()
            .map(|r| r.key)
            .collect())
    }

    async fn add_skdm_recipients(&self, group_jid: &str, device_jids: &[String]) -> Result<()> {
        for device_jid in device_jids {
            self.put(Bucket::SkdmRecipient, group_jid, device_jid, Vec::new())
                .await?;
        }
        Ok(())
    }

    async fn clear_skdm_recipients(&self, group_jid: &str) -> Result<()> {
        self.clear(Bucket::SkdmRecipient, group_jid).await
    }

    async fn get_lid_mapping(&self, lid: &str) -> Result<Option<LidPnMappingEntry>> {
        let row = lid_mapping::Entity::find_by_id(lid.to_string())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn get_pn_mapping(&self, phone: &str) -> Result<Option<LidPnMappingEntry>> {
        let row = lid_mapping::Entity::find()
            .filter(lid_mapping::Column::PhoneNumber.eq(phone))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn put_lid_mapping(&self, entry: &LidPnMappingEntry) -> Result<()> {
        let active_model = lid_mapping::ActiveModel {
            lid: Set(entry.lid.clone()),
            phone_number: Set(entry.phone_number.clone()),
            created_at: Set(entry.created_at),
            updated_at: Set(entry.updated_at),
            learning_source: Set(entry.learning_source.clone()),
        };

        lid_mapping::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(lid_mapping::Column::Lid)
                    .update_columns([
                        lid_mapping::Column::PhoneNumber,
                        lid_mapping::Column::UpdatedAt,
                        lid_mapping::Column::LearningSource,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_all_lid_mappings(&self) -> Result<Vec<LidPnMappingEntry>> {
        let rows = lid_mapping::Entity::find()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_base_key(&self, address: &str, message_id: &str, base_key: &[u8]) -> Result<()> {
        self.put(Bucket::BaseKey, address, message_id, base_key.to_vec())
            .await
    }

    async fn has_same_base_key(
        &self,
        address: &str,
        message_id: &str,
        current_base_key: &[u8],
    ) -> Result<bool> {
        let stored = self.get(Bucket::BaseKey, address, message_id).await?;
        Ok(stored.as_deref() == Some(current_base_key))
    }

    async fn delete_base_key(&self, address: &str, message_id: &str) -> Result<()> {
        self.remove(Bucket::BaseKey, address, message_id).await
    }

    async fn update_device_list(&self, record: DeviceListRecord) -> Result<()> {
        self.put(Bucket::DeviceList, "", &record.user, to_json(&record)?)
            .await
    }

    async fn get_devices(&self, user: &str) -> Result<Option<DeviceListRecord>> {
        self.get(Bucket::DeviceList, "", user)
            .await?
            .map(|bytes| from_json(&bytes))
            .transpose()
    }

    async fn mark_forget_sender_key(&self, group_jid: &str, participant: &str) -> Result<()> {
        self.put(Bucket::ForgetMark, group_jid, participant, Vec::new())
            .await
    }

    /// Returns the marked participants and clears them.
    async fn consume_forget_marks(&self, group_jid: &str) -> Result<Vec<String>> {
        let marks = self
            .scoped(Bucket::ForgetMark, group_jid)
            .await?
            .into_iter()
            .map(|r| r.key)
            .collect();
        self.clear(Bucket::ForgetMark, group_jid).await?;
        Ok(marks)
    }
}

// ============ DeviceStore ============

#[async_trait]
impl DeviceStore for KeyStore {
    async fn save(&self, device: &Device) -> Result<()> {
        let bytes =
            rmp_serde::to_vec(device).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.restore_device_blob(bytes).await
    }

    /// 无法解码的设备记录会被删除, 客户端重新配对
    async fn load(&self) -> Result<Option<Device>> {
        let Some(bytes) = self.device_blob().await? else {
            return Ok(None);
        };
        match rmp_serde::from_slice(&bytes) {
            Ok(device) => Ok(Some(device)),
            Err(e) => {
                log::warn!("Discarding unreadable WhatsApp device record: {e}");
                self.remove(Bucket::Device, "", &DEVICE_ID.to_string())
                    .await?;
                Ok(None)
            }
        }
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.device_blob().await?.is_some())
    }

    async fn create(&self) -> Result<i32> {
        Ok(DEVICE_ID)
    }
}
