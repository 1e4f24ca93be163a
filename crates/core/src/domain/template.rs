use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EnumParseError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Table,
    Chair,
    Cabinet,
    Desk,
    Bed,
    Wardrobe,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Chair => "chair",
            Self::Cabinet => "cabinet",
            Self::Desk => "desk",
            Self::Bed => "bed",
            Self::Wardrobe => "wardrobe",
        }
    }
}

impl std::str::FromStr for ProductType {
    type Err = EnumParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "chair" => Ok(Self::Chair),
            "cabinet" => Ok(Self::Cabinet),
            "desk" => Ok(Self::Desk),
            "bed" => Ok(Self::Bed),
            "wardrobe" => Ok(Self::Wardrobe),
            other => Err(EnumParseError { kind: "product type", value: other.to_string() }),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering drives deterministic threshold evaluation, so the variant order is
/// part of the contract.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Width,
    Height,
    Length,
    Depth,
}

impl DimensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Length => "length",
            Self::Depth => "depth",
        }
    }
}

impl std::str::FromStr for DimensionKind {
    type Err = EnumParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "width" => Ok(Self::Width),
            "height" => Ok(Self::Height),
            "length" => Ok(Self::Length),
            "depth" => Ok(Self::Depth),
            other => Err(EnumParseError { kind: "dimension", value: other.to_string() }),
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Centimeter measurements keyed by dimension. BTreeMap keeps iteration order
/// stable across evaluations.
pub type Dimensions = BTreeMap<DimensionKind, Decimal>;

/// Reusable product definition that quote lines are derived from: base price,
/// base dimensions, and the material the base price assumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductTemplate {
    pub id: TemplateId,
    pub name: String,
    pub product_type: ProductType,
    pub base_price: i64,
    pub base_dimensions: Dimensions,
    pub default_material_id: MaterialId,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{DimensionKind, ProductType};

    #[test]
    fn product_type_round_trips_through_str() {
        for tag in ["table", "chair", "cabinet", "desk", "bed", "wardrobe"] {
            let parsed = ProductType::from_str(tag).expect("known product type");
            assert_eq!(parsed.as_str(), tag);
        }
    }

    #[test]
    fn unknown_product_type_is_rejected() {
        let error = ProductType::from_str("spaceship").expect_err("unknown tag");
        assert_eq!(error.value, "spaceship");
    }

    #[test]
    fn dimension_ordering_is_stable() {
        let mut kinds =
            vec![DimensionKind::Depth, DimensionKind::Width, DimensionKind::Length];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![DimensionKind::Width, DimensionKind::Length, DimensionKind::Depth]
        );
    }
}
