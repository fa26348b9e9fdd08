//! Record identifiers.
//!
//! Ids are 24 lowercase hex characters: a 4-byte big-endian creation second
//! followed by 8 random bytes. The shape matches a BSON ObjectId so every
//! backend can store them natively.

use crate::error::{CoreError, Result};
use time::OffsetDateTime;

pub const ID_LEN: usize = 24;

pub fn generate_id() -> String {
    let secs = OffsetDateTime::now_utc().unix_timestamp() as u32;
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{secs:08x}{}", &random[..16])
}

pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn validate_id(id: &str) -> Result<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(CoreError::invalid_id(id))
    }
}
