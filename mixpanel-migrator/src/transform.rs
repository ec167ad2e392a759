use serde_json::Value;
use uuid::Uuid;

use crate::{emit::MappedRecord, mapping::map_event_name, parse::NormalizedRecord};

pub const GEOIP_DISABLE: &str = "$geoip_disable";
pub const IMPORT_FLAG: &str = "$import_flag";

// Namespace for event UUIDs derived from Mixpanel insert ids
const INSERT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5c1a_83e4_9f0d_4b6e_a2c7_31d8_e04f_9b62);

/// Stable UUID for an insert id, so re-importing the same chunk hands the destination the same
/// event ids it has already seen.
pub fn event_uuid(insert_id: Option<&str>) -> Uuid {
    match insert_id {
        Some(id) => Uuid::new_v5(&INSERT_ID_NAMESPACE, id.as_bytes()),
        None => Uuid::now_v7(),
    }
}

pub fn to_mapped(record: NormalizedRecord, import_tag: &str) -> MappedRecord {
    let NormalizedRecord {
        event,
        distinct_id,
        timestamp,
        insert_id,
        mut properties,
    } = record;

    let event = map_event_name(&event, &properties);
    // Imported events carry the exporter's IP, not the user's
    properties.insert(GEOIP_DISABLE.to_string(), Value::Bool(true));
    properties.insert(IMPORT_FLAG.to_string(), Value::String(import_tag.to_string()));

    MappedRecord {
        uuid: event_uuid(insert_id.as_deref()),
        distinct_id,
        event,
        timestamp,
        properties,
    }
}
