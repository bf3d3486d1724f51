//! `SeaORM` entities for the device store.

pub mod contact;
pub mod device;
pub mod key_record;
pub mod lid_mapping;
