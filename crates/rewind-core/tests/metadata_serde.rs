//! JSON shape of metadata and values, as loaded from catalog files.

use pretty_assertions::assert_eq;
use rewind_core::metadata::{AssociationKind, EntityMetadata};
use rewind_core::revision::RevisionKind;
use rewind_core::storage::StorageType;
use rewind_core::value::Value;
use serde_json::json;

#[test]
fn metadata_survives_json() {
    let meta = EntityMetadata::builder("Post", "posts")
        .id("id", StorageType::BigInt)
        .field_column("title", "post_title", StorageType::String)
        .to_one("author", "User", &[("author_id", "id")])
        .one_to_many("comments", "Comment", "post")
        .build()
        .unwrap();

    let text = serde_json::to_string(&meta).unwrap();
    let recovered: EntityMetadata = serde_json::from_str(&text).unwrap();
    assert_eq!(recovered, meta);
}

#[test]
fn metadata_from_handwritten_json() {
    let meta: EntityMetadata = serde_json::from_value(json!({
        "name": "Car",
        "table_name": "vehicles",
        "parent": "Vehicle",
        "is_abstract": false,
        "identifier": ["id"],
        "fields": [
            {"name": "id", "column": "id", "storage_type": "integer"},
            {"name": "seats", "column": "seat_count", "storage_type": "small_int"}
        ],
        "associations": [
            {
                "name": "owner",
                "kind": "to_one_owning",
                "target_type": "Person",
                "join_columns": [{"name": "owner_id", "referenced_column": "id"}],
                "mapped_by": null
            }
        ],
        "discriminator": null,
        "discriminator_value": "car"
    }))
    .unwrap();

    assert_eq!(meta.field("seats").unwrap().column, "seat_count");
    assert_eq!(meta.field("seats").unwrap().storage_type, StorageType::SmallInt);
    assert_eq!(meta.association("owner").unwrap().kind, AssociationKind::ToOneOwning);
    assert_eq!(meta.discriminator_value.as_deref(), Some("car"));
}

#[test]
fn revision_kind_uses_stored_markers() {
    assert_eq!(serde_json::to_value(RevisionKind::Delete).unwrap(), json!("DEL"));
    let kind: RevisionKind = serde_json::from_value(json!("INS")).unwrap();
    assert_eq!(kind, RevisionKind::Create);
}

#[test]
fn values_are_tagged() {
    assert_eq!(
        serde_json::to_value(Value::Integer(5)).unwrap(),
        json!({"type": "integer", "value": 5})
    );
    assert_eq!(serde_json::to_value(Value::Null).unwrap(), json!({"type": "null"}));
}
