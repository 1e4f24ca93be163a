use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use craftquote_core::domain::template::{
    Dimensions, MaterialId, ProductTemplate, ProductType, TemplateId,
};
use craftquote_core::repository::{RepositoryError, TemplateRepository};

use super::{db_error, decode_error, parse_tag};
use crate::DbPool;

/// Base dimensions are stored as a JSON object column; the table layout stays
/// flat while dimensions remain an open set.
pub struct SqlTemplateRepository {
    pool: DbPool,
}

impl SqlTemplateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, template: &ProductTemplate) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let dimensions_json = serde_json::to_string(&template.base_dimensions).map_err(|error| {
            decode_error(format!(
                "template {}: failed to encode base dimensions: {error}",
                template.id.0
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO product_template (
                id, name, product_type, base_price, base_dimensions_json,
                default_material_id, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                product_type = excluded.product_type,
                base_price = excluded.base_price,
                base_dimensions_json = excluded.base_dimensions_json,
                default_material_id = excluded.default_material_id,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&template.id.0)
        .bind(&template.name)
        .bind(template.product_type.as_str())
        .bind(template.base_price)
        .bind(dimensions_json)
        .bind(&template.default_material_id.0)
        .bind(template.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    pub async fn list_active(&self) -> Result<Vec<ProductTemplate>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, product_type, base_price, base_dimensions_json,
                   default_material_id, is_active
            FROM product_template
            WHERE is_active = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::template_from_row).collect()
    }

    fn template_from_row(row: &SqliteRow) -> Result<ProductTemplate, RepositoryError> {
        let id: String = row.try_get("id").map_err(db_error)?;
        let product_type: String = row.try_get("product_type").map_err(db_error)?;
        let dimensions_json: String = row.try_get("base_dimensions_json").map_err(db_error)?;

        let base_dimensions: Dimensions =
            serde_json::from_str(&dimensions_json).map_err(|error| {
                decode_error(format!("template {id}: invalid base dimensions: {error}"))
            })?;

        Ok(ProductTemplate {
            id: TemplateId(id),
            name: row.try_get("name").map_err(db_error)?,
            product_type: parse_tag::<ProductType>(&product_type)?,
            base_price: row.try_get("base_price").map_err(db_error)?,
            base_dimensions,
            default_material_id: MaterialId(
                row.try_get::<String, _>("default_material_id").map_err(db_error)?,
            ),
            is_active: row.try_get("is_active").map_err(db_error)?,
        })
    }
}

#[async_trait]
impl TemplateRepository for SqlTemplateRepository {
    async fn find_by_id(
        &self,
        id: &TemplateId,
    ) -> Result<Option<ProductTemplate>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, product_type, base_price, base_dimensions_json,
                   default_material_id, is_active
            FROM product_template
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(Self::template_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use craftquote_core::domain::template::{
        DimensionKind, MaterialId, ProductTemplate, ProductType, TemplateId,
    };
    use craftquote_core::repository::TemplateRepository;

    use crate::{connect_with_settings, migrations};

    use super::SqlTemplateRepository;

    fn template(id: &str) -> ProductTemplate {
        ProductTemplate {
            id: TemplateId(id.to_string()),
            name: "Dining table".to_string(),
            product_type: ProductType::Table,
            base_price: 4_500_000,
            base_dimensions: BTreeMap::from([
                (DimensionKind::Width, Decimal::from(100)),
                (DimensionKind::Length, Decimal::from(200)),
                (DimensionKind::Height, Decimal::from(75)),
            ]),
            default_material_id: MaterialId("oak".to_string()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn template_round_trips_with_dimensions() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        let repo = SqlTemplateRepository::new(pool.clone());

        let template = template("tpl-dining");
        repo.save(&template).await.expect("save template");

        let found = repo
            .find_by_id(&template.id)
            .await
            .expect("find template")
            .expect("template exists");
        assert_eq!(found, template);

        let missing = repo
            .find_by_id(&TemplateId("tpl-ghost".to_string()))
            .await
            .expect("lookup");
        assert!(missing.is_none());
        pool.close().await;
    }

    #[tokio::test]
    async fn list_active_skips_retired_templates() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        let repo = SqlTemplateRepository::new(pool.clone());

        repo.save(&template("tpl-active")).await.expect("save active");
        let mut retired = template("tpl-retired");
        retired.is_active = false;
        repo.save(&retired).await.expect("save retired");

        let active = repo.list_active().await.expect("list active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.0, "tpl-active");
        pool.close().await;
    }
}
