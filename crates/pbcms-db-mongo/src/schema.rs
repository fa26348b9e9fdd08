//! Index management for the MongoDB storage backend.
//!
//! Unique indexes back the uniqueness rules on admin emails, usernames and
//! service slugs. A partial unique index on `role` admits a single
//! super admin. The weighted text index drives admin search relevance.

use mongodb::bson::{Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};
use pbcms_core::Role;
use pbcms_storage::collections;
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Name of the weighted text index over service copy.
pub const SERVICE_SEARCH_INDEX: &str = "service_search_index";

fn index(keys: Document, options: IndexOptions) -> IndexModel {
    IndexModel::builder().keys(keys).options(options).build()
}

fn unique(field: &str) -> IndexModel {
    index(
        doc! { field: 1 },
        IndexOptions::builder().unique(true).build(),
    )
}

fn admin_indexes() -> Vec<IndexModel> {
    vec![
        unique("email"),
        unique("username"),
        index(
            doc! { "role": 1 },
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! { "role": Role::SuperAdmin.as_str() })
                .build(),
        ),
    ]
}

fn service_indexes() -> Vec<IndexModel> {
    vec![
        unique("slug"),
        index(
            doc! { "isPublished": 1, "showOnHomepage": 1, "displayOrder": 1 },
            IndexOptions::default(),
        ),
        index(
            doc! { "title": "text", "shortDescription": "text", "description": "text" },
            IndexOptions::builder()
                .name(SERVICE_SEARCH_INDEX.to_string())
                .weights(doc! { "title": 10, "shortDescription": 5, "description": 1 })
                .build(),
        ),
    ]
}

fn banner_indexes() -> Vec<IndexModel> {
    vec![index(
        doc! { "isActive": 1, "createdAt": -1 },
        IndexOptions::default(),
    )]
}

/// Creates every index the storage layer relies on. Idempotent.
#[instrument(skip(db))]
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let plan = [
        (collections::ADMINS, admin_indexes()),
        (collections::SERVICES, service_indexes()),
        (collections::BANNERS, banner_indexes()),
    ];
    for (name, models) in plan {
        let count = models.len();
        db.collection::<Document>(name).create_indexes(models).await?;
        debug!(collection = name, count, "Indexes ensured");
    }
    info!("MongoDB indexes ready");
    Ok(())
}
