use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use craftquote_core::domain::rules::{
    MaterialGroup, MaterialSurcharge, PricingRule, QuantityTier, RuleId, RuleSet, SizeThreshold,
};
use craftquote_core::domain::template::{MaterialId, ProductType, TemplateId};
use craftquote_core::pricing::scope::ScopeKey;
use craftquote_core::repository::{RepositoryError, RuleRepository};

use super::{db_error, decode_error, parse_optional_tag, parse_tag};
use crate::DbPool;

/// SQLite-backed rule store.
///
/// `get_applicable_rules` is the engine-facing read path: active rules whose
/// scope columns are NULL or equal to the requested scope. The `save_*`
/// methods are upserts used by seeding and tests.
pub struct SqlRuleRepository {
    pool: DbPool,
}

impl SqlRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save_pricing_rule(&self, rule: &PricingRule) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO pricing_rule (
                id, template_id, product_type, rule_condition, dimension,
                increment_unit_cm, surcharge_amount, material_modifier, priority,
                is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                template_id = excluded.template_id,
                product_type = excluded.product_type,
                rule_condition = excluded.rule_condition,
                dimension = excluded.dimension,
                increment_unit_cm = excluded.increment_unit_cm,
                surcharge_amount = excluded.surcharge_amount,
                material_modifier = excluded.material_modifier,
                priority = excluded.priority,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&rule.id.0)
        .bind(rule.template_id.as_ref().map(|id| id.0.as_str()))
        .bind(rule.product_type.map(|product_type| product_type.as_str()))
        .bind(rule.condition.as_str())
        .bind(rule.dimension.as_str())
        .bind(i64::from(rule.increment_unit_cm))
        .bind(rule.surcharge_amount)
        .bind(rule.material_modifier.as_ref().map(|group| group.0.as_str()))
        .bind(i64::from(rule.priority))
        .bind(rule.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    pub async fn save_material_surcharge(
        &self,
        surcharge: &MaterialSurcharge,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO material_surcharge (
                id, source_material_id, target_material_id, scope, surcharge_amount,
                template_id, product_type, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                source_material_id = excluded.source_material_id,
                target_material_id = excluded.target_material_id,
                scope = excluded.scope,
                surcharge_amount = excluded.surcharge_amount,
                template_id = excluded.template_id,
                product_type = excluded.product_type,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&surcharge.id.0)
        .bind(&surcharge.source_material_id.0)
        .bind(&surcharge.target_material_id.0)
        .bind(surcharge.scope.as_str())
        .bind(surcharge.surcharge_amount)
        .bind(surcharge.template_id.as_ref().map(|id| id.0.as_str()))
        .bind(surcharge.product_type.map(|product_type| product_type.as_str()))
        .bind(surcharge.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    pub async fn save_quantity_tier(&self, tier: &QuantityTier) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO quantity_tier (
                id, template_id, product_type, min_quantity, max_quantity,
                discount_percent, price_level, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                template_id = excluded.template_id,
                product_type = excluded.product_type,
                min_quantity = excluded.min_quantity,
                max_quantity = excluded.max_quantity,
                discount_percent = excluded.discount_percent,
                price_level = excluded.price_level,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&tier.id.0)
        .bind(tier.template_id.as_ref().map(|id| id.0.as_str()))
        .bind(tier.product_type.map(|product_type| product_type.as_str()))
        .bind(i64::from(tier.min_quantity))
        .bind(tier.max_quantity.map(i64::from))
        .bind(tier.discount_percent.to_string())
        .bind(tier.price_level.as_str())
        .bind(tier.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    pub async fn save_size_threshold(
        &self,
        threshold: &SizeThreshold,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO size_threshold (
                id, product_type, dimension, threshold_cm, action,
                surcharge_amount, message, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                product_type = excluded.product_type,
                dimension = excluded.dimension,
                threshold_cm = excluded.threshold_cm,
                action = excluded.action,
                surcharge_amount = excluded.surcharge_amount,
                message = excluded.message,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&threshold.id.0)
        .bind(threshold.product_type.map(|product_type| product_type.as_str()))
        .bind(threshold.dimension.as_str())
        .bind(threshold.threshold_cm.to_string())
        .bind(threshold.action.as_str())
        .bind(threshold.surcharge_amount)
        .bind(threshold.message.as_deref())
        .bind(threshold.is_active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    pub async fn list_pricing_rules(
        &self,
        scope: &ScopeKey,
    ) -> Result<Vec<PricingRule>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, template_id, product_type, rule_condition, dimension,
                   increment_unit_cm, surcharge_amount, material_modifier, priority, is_active
            FROM pricing_rule
            WHERE is_active = 1
              AND (template_id IS NULL OR template_id = ?)
              AND (product_type IS NULL OR product_type = ?)
            ORDER BY priority DESC, id ASC
            "#,
        )
        .bind(scope.template_id.as_ref().map(|id| id.0.as_str()))
        .bind(scope.product_type.map(|product_type| product_type.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::pricing_rule_from_row).collect()
    }

    pub async fn list_material_surcharges(
        &self,
        scope: &ScopeKey,
    ) -> Result<Vec<MaterialSurcharge>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, source_material_id, target_material_id, scope, surcharge_amount,
                   template_id, product_type, is_active
            FROM material_surcharge
            WHERE is_active = 1
              AND (template_id IS NULL OR template_id = ?)
              AND (product_type IS NULL OR product_type = ?)
            ORDER BY id ASC
            "#,
        )
        .bind(scope.template_id.as_ref().map(|id| id.0.as_str()))
        .bind(scope.product_type.map(|product_type| product_type.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::material_surcharge_from_row).collect()
    }

    pub async fn list_quantity_tiers(
        &self,
        scope: &ScopeKey,
    ) -> Result<Vec<QuantityTier>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, template_id, product_type, min_quantity, max_quantity,
                   discount_percent, price_level, is_active
            FROM quantity_tier
            WHERE is_active = 1
              AND (template_id IS NULL OR template_id = ?)
              AND (product_type IS NULL OR product_type = ?)
            ORDER BY min_quantity ASC, id ASC
            "#,
        )
        .bind(scope.template_id.as_ref().map(|id| id.0.as_str()))
        .bind(scope.product_type.map(|product_type| product_type.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::quantity_tier_from_row).collect()
    }

    pub async fn list_size_thresholds(
        &self,
        scope: &ScopeKey,
    ) -> Result<Vec<SizeThreshold>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_type, dimension, threshold_cm, action,
                   surcharge_amount, message, is_active
            FROM size_threshold
            WHERE is_active = 1
              AND (product_type IS NULL OR product_type = ?)
            ORDER BY dimension ASC, id ASC
            "#,
        )
        .bind(scope.product_type.map(|product_type| product_type.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::size_threshold_from_row).collect()
    }

    fn pricing_rule_from_row(row: &SqliteRow) -> Result<PricingRule, RepositoryError> {
        let id: String = row.try_get("id").map_err(db_error)?;
        let template_id: Option<String> = row.try_get("template_id").map_err(db_error)?;
        let product_type: Option<String> = row.try_get("product_type").map_err(db_error)?;
        let condition: String = row.try_get("rule_condition").map_err(db_error)?;
        let dimension: String = row.try_get("dimension").map_err(db_error)?;
        let increment_unit_cm: i64 = row.try_get("increment_unit_cm").map_err(db_error)?;
        let material_modifier: Option<String> =
            row.try_get("material_modifier").map_err(db_error)?;
        let priority: i64 = row.try_get("priority").map_err(db_error)?;

        Ok(PricingRule {
            id: RuleId(id.clone()),
            template_id: template_id.map(TemplateId),
            product_type: parse_optional_tag::<ProductType>(product_type)?,
            condition: parse_tag(&condition)?,
            dimension: parse_tag(&dimension)?,
            increment_unit_cm: u32::try_from(increment_unit_cm).map_err(|_| {
                decode_error(format!("rule {id}: increment_unit_cm out of range"))
            })?,
            surcharge_amount: row.try_get("surcharge_amount").map_err(db_error)?,
            material_modifier: material_modifier.map(MaterialGroup),
            priority: u32::try_from(priority)
                .map_err(|_| decode_error(format!("rule {id}: priority out of range")))?,
            is_active: row.try_get("is_active").map_err(db_error)?,
        })
    }

    fn material_surcharge_from_row(row: &SqliteRow) -> Result<MaterialSurcharge, RepositoryError> {
        let id: String = row.try_get("id").map_err(db_error)?;
        let scope: String = row.try_get("scope").map_err(db_error)?;
        let template_id: Option<String> = row.try_get("template_id").map_err(db_error)?;
        let product_type: Option<String> = row.try_get("product_type").map_err(db_error)?;
        let source: String = row.try_get("source_material_id").map_err(db_error)?;
        let target: String = row.try_get("target_material_id").map_err(db_error)?;

        Ok(MaterialSurcharge {
            id: RuleId(id),
            source_material_id: MaterialId(source),
            target_material_id: MaterialId(target),
            scope: parse_tag(&scope)?,
            surcharge_amount: row.try_get("surcharge_amount").map_err(db_error)?,
            template_id: template_id.map(TemplateId),
            product_type: parse_optional_tag::<ProductType>(product_type)?,
            is_active: row.try_get("is_active").map_err(db_error)?,
        })
    }

    fn quantity_tier_from_row(row: &SqliteRow) -> Result<QuantityTier, RepositoryError> {
        let id: String = row.try_get("id").map_err(db_error)?;
        let template_id: Option<String> = row.try_get("template_id").map_err(db_error)?;
        let product_type: Option<String> = row.try_get("product_type").map_err(db_error)?;
        let min_quantity: i64 = row.try_get("min_quantity").map_err(db_error)?;
        let max_quantity: Option<i64> = row.try_get("max_quantity").map_err(db_error)?;
        let discount_percent: String = row.try_get("discount_percent").map_err(db_error)?;
        let price_level: String = row.try_get("price_level").map_err(db_error)?;

        Ok(QuantityTier {
            id: RuleId(id.clone()),
            template_id: template_id.map(TemplateId),
            product_type: parse_optional_tag::<ProductType>(product_type)?,
            min_quantity: u32::try_from(min_quantity)
                .map_err(|_| decode_error(format!("tier {id}: min_quantity out of range")))?,
            max_quantity: max_quantity
                .map(|max| {
                    u32::try_from(max).map_err(|_| {
                        decode_error(format!("tier {id}: max_quantity out of range"))
                    })
                })
                .transpose()?,
            discount_percent: Decimal::from_str(&discount_percent).map_err(|error| {
                decode_error(format!("tier {id}: invalid discount_percent: {error}"))
            })?,
            price_level: parse_tag(&price_level)?,
            is_active: row.try_get("is_active").map_err(db_error)?,
        })
    }

    fn size_threshold_from_row(row: &SqliteRow) -> Result<SizeThreshold, RepositoryError> {
        let id: String = row.try_get("id").map_err(db_error)?;
        let product_type: Option<String> = row.try_get("product_type").map_err(db_error)?;
        let dimension: String = row.try_get("dimension").map_err(db_error)?;
        let threshold_cm: String = row.try_get("threshold_cm").map_err(db_error)?;
        let action: String = row.try_get("action").map_err(db_error)?;

        Ok(SizeThreshold {
            id: RuleId(id.clone()),
            product_type: parse_optional_tag::<ProductType>(product_type)?,
            dimension: parse_tag(&dimension)?,
            threshold_cm: Decimal::from_str(&threshold_cm).map_err(|error| {
                decode_error(format!("threshold {id}: invalid threshold_cm: {error}"))
            })?,
            action: parse_tag(&action)?,
            surcharge_amount: row.try_get("surcharge_amount").map_err(db_error)?,
            message: row.try_get("message").map_err(db_error)?,
            is_active: row.try_get("is_active").map_err(db_error)?,
        })
    }
}

#[async_trait]
impl RuleRepository for SqlRuleRepository {
    async fn get_applicable_rules(&self, scope: &ScopeKey) -> Result<RuleSet, RepositoryError> {
        Ok(RuleSet {
            pricing_rules: self.list_pricing_rules(scope).await?,
            material_surcharges: self.list_material_surcharges(scope).await?,
            quantity_tiers: self.list_quantity_tiers(scope).await?,
            size_thresholds: self.list_size_thresholds(scope).await?,
        })
    }
}
