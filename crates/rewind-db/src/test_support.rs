//! Shared test fixtures for rewind-db unit tests.

#[cfg(test)]
pub(crate) mod fixtures {
    use std::cell::RefCell;

    use rewind_config::AuditConfig;
    use rewind_core::entity::{Entity, EntityRef};
    use rewind_core::identifier::Identifier;
    use rewind_core::metadata::{AssociationMapping, EntityMetadata, EntityMetadataBuilder};
    use rewind_core::storage::StorageType;
    use rewind_core::value::Value;

    use crate::RewindDb;
    use crate::catalog::StaticCatalog;
    use crate::error::AuditError;
    use crate::ports::RelationResolver;
    use crate::settings::AuditSettings;
    use crate::source::RawRow;

    fn post() -> EntityMetadata {
        EntityMetadata::builder("Post", "posts")
            .id("id", StorageType::Integer)
            .field("title", StorageType::String)
            .field("body", StorageType::Text)
            .field("published", StorageType::Boolean)
            .field("rating", StorageType::Float)
            .field("created_at", StorageType::DateTime)
            .field("deleted_at", StorageType::DateTime)
            .field("deleted_by", StorageType::String)
            .to_one("author", "User", &[("author_id", "id")])
            .one_to_many("comments", "Comment", "post")
            .inverse_to_one("stats", "PostStats", "post")
            .build()
            .unwrap()
    }

    fn vehicle_members(builder: EntityMetadataBuilder) -> EntityMetadataBuilder {
        builder
            .id("id", StorageType::Integer)
            .field("name", StorageType::String)
    }

    /// Post/User/Comment/PostStats, a single-table Vehicle hierarchy
    /// (Car, Truck, abstract Bus without a discriminator value of its own)
    /// and a composite-key Membership.
    pub fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with(post())
            .with(
                EntityMetadata::builder("User", "users")
                    .id("id", StorageType::Integer)
                    .field("name", StorageType::String)
                    .build()
                    .unwrap(),
            )
            .with(
                EntityMetadata::builder("Comment", "comments")
                    .id("id", StorageType::Integer)
                    .field("body", StorageType::Text)
                    .to_one("post", "Post", &[("post_id", "id")])
                    .build()
                    .unwrap(),
            )
            .with(
                EntityMetadata::builder("PostStats", "post_stats")
                    .id("id", StorageType::Integer)
                    .field("views", StorageType::Integer)
                    .to_one("post", "Post", &[("post_id", "id")])
                    .build()
                    .unwrap(),
            )
            .with(
                vehicle_members(EntityMetadata::builder("Vehicle", "vehicles"))
                    .discriminator("kind", &[("car", "Car"), ("truck", "Truck"), ("bus", "Bus")])
                    .abstract_type()
                    .build()
                    .unwrap(),
            )
            .with(
                vehicle_members(EntityMetadata::builder("Car", "vehicles"))
                    .field("seats", StorageType::Integer)
                    .parent("Vehicle")
                    .discriminator_value("car")
                    .build()
                    .unwrap(),
            )
            .with(
                vehicle_members(EntityMetadata::builder("Truck", "vehicles"))
                    .field("payload", StorageType::Float)
                    .parent("Vehicle")
                    .discriminator_value("truck")
                    .build()
                    .unwrap(),
            )
            .with(
                vehicle_members(EntityMetadata::builder("Bus", "vehicles"))
                    .parent("Vehicle")
                    .abstract_type()
                    .build()
                    .unwrap(),
            )
            .with(
                EntityMetadata::builder("Membership", "memberships")
                    .id("team_id", StorageType::Integer)
                    .id("user_id", StorageType::Integer)
                    .field("role", StorageType::String)
                    .build()
                    .unwrap(),
            )
    }

    pub fn audit_config() -> AuditConfig {
        AuditConfig {
            audited_entities: ["Post", "Comment", "Vehicle", "Car", "Truck", "Bus", "Membership"]
                .into_iter()
                .map(String::from)
                .collect(),
            deleted_at_field: Some("deleted_at".into()),
            deleted_by_field: Some("deleted_by".into()),
            ..Default::default()
        }
    }

    pub fn settings() -> AuditSettings {
        AuditSettings::from(audit_config())
    }

    /// A posts_audit row with every column populated.
    pub fn post_row(id: i64, title: &str, rev: i64, kind: &str) -> RawRow {
        RawRow::new()
            .with("id", id)
            .with("title", title)
            .with("body", "text")
            .with("published", 1_i64)
            .with("rating", 4.5)
            .with("created_at", "2026-01-02T03:04:05Z")
            .with("deleted_at", None::<String>)
            .with("deleted_by", None::<String>)
            .with("author_id", 10_i64)
            .with("rev", rev)
            .with("revtype", kind)
    }

    pub fn vehicle_row(id: i64, kind: &str, rev: i64) -> RawRow {
        RawRow::new()
            .with("id", id)
            .with("name", format!("vehicle-{id}"))
            .with("kind", kind)
            .with("seats", 4_i64)
            .with("payload", 12.5)
            .with("rev", rev)
            .with("revtype", "INS")
    }

    /// In-memory database holding the audit tables of the fixture catalog.
    pub async fn audit_db() -> RewindDb {
        let db = RewindDb::open_local(":memory:").await.unwrap();
        for ddl in [
            "CREATE TABLE posts_audit (
                id INTEGER NOT NULL, title TEXT, body TEXT, published INTEGER,
                rating REAL, created_at TEXT, deleted_at TEXT, deleted_by TEXT,
                author_id INTEGER, rev INTEGER NOT NULL, revtype TEXT NOT NULL
            )",
            "CREATE TABLE vehicles_audit (
                id INTEGER NOT NULL, name TEXT, kind TEXT, seats INTEGER,
                payload REAL, rev INTEGER NOT NULL, revtype TEXT NOT NULL
            )",
            "CREATE TABLE memberships_audit (
                team_id INTEGER NOT NULL, user_id INTEGER NOT NULL, role TEXT,
                rev INTEGER NOT NULL, revtype TEXT NOT NULL
            )",
        ] {
            db.conn().execute(ddl, ()).await.unwrap();
        }
        db
    }

    /// Resolver standing in for a live session: records clears and
    /// inverse lookups, and answers inverse to-ones with `live_stats`.
    #[derive(Default)]
    pub struct LiveResolver {
        pub cleared: RefCell<Vec<String>>,
        pub inverse_owners: RefCell<Vec<EntityRef>>,
        pub live_stats: Option<EntityRef>,
    }

    impl LiveResolver {
        pub fn with_stats(views: i64) -> Self {
            Self {
                live_stats: Some(
                    Entity::new("PostStats", Identifier::from(99))
                        .with("views", Value::from(views))
                        .into_ref(),
                ),
                ..Self::default()
            }
        }
    }

    impl RelationResolver for LiveResolver {
        fn load_inverse_to_one(
            &self,
            _association: &AssociationMapping,
            owner: &EntityRef,
        ) -> Result<Option<EntityRef>, AuditError> {
            self.inverse_owners.borrow_mut().push(owner.clone());
            Ok(self.live_stats.clone())
        }

        fn clear(&self, entity_type: &str) {
            self.cleared.borrow_mut().push(entity_type.to_string());
        }
    }
}
