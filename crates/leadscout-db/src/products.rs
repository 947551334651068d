//! Read-only access to the `product_profiles` table.
//!
//! Profiles are created and edited by the product-management surface, which
//! is outside this workspace. The pipeline only ever reads them.

use chrono::{DateTime, Utc};
use leadscout_core::ProductProfile;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `product_profiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductProfileRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub features: Vec<String>,
    pub benefits: Vec<String>,
    pub pain_points: Vec<String>,
    pub ideal_customer_profile: String,
    pub target_communities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductProfileRow> for ProductProfile {
    fn from(row: ProductProfileRow) -> Self {
        ProductProfile {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            features: row.features,
            benefits: row.benefits,
            pain_points: row.pain_points,
            ideal_customer_profile: row.ideal_customer_profile,
            target_communities: row.target_communities,
        }
    }
}

/// Fetches a product profile by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no profile exists with the given id, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_product_profile(pool: &PgPool, id: Uuid) -> Result<ProductProfile, DbError> {
    let row = sqlx::query_as::<_, ProductProfileRow>(
        "SELECT id, owner_id, name, features, benefits, pain_points, \
                ideal_customer_profile, target_communities, created_at, updated_at \
         FROM product_profiles \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row.into())
}
