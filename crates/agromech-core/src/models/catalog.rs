use serde::{Deserialize, Serialize};

use super::wire::{de_amount, de_id, de_opt_id};

/// A mechanization service offered to farmers (ploughing, harrowing, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(
        rename = "categoryId",
        alias = "serviceCategoryId",
        alias = "category_id",
        deserialize_with = "de_id"
    )]
    pub category_id: String,
    #[serde(
        rename = "unitCost",
        alias = "cost",
        alias = "price",
        default,
        deserialize_with = "de_amount"
    )]
    pub unit_cost: f64,
    #[serde(rename = "measuringUnit", alias = "measuring_unit", default)]
    pub measuring_unit: String,
}

/// An equipment unit registered to a hub and able to perform one service category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(
        rename = "serviceCategoryId",
        alias = "categoryId",
        alias = "service_category_id",
        deserialize_with = "de_id"
    )]
    pub category_id: String,
    #[serde(rename = "hubId", alias = "hub", default, deserialize_with = "de_opt_id")]
    pub hub_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A crop or produce type attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service() {
        let json = r#"{"id": 5, "name": "Ploughing", "serviceCategoryId": 2, "cost": "5000", "measuring_unit": "hectare"}"#;
        let service: Service = serde_json::from_str(json).unwrap();
        assert_eq!(service.id, "5");
        assert_eq!(service.category_id, "2");
        assert_eq!(service.unit_cost, 5000.0);
        assert_eq!(service.measuring_unit, "hectare");
    }

    #[test]
    fn test_parse_equipment() {
        let json = r#"{"id": "EQ-1", "name": "Tractor 75HP", "serviceCategoryId": 2, "hubId": 12}"#;
        let equipment: Equipment = serde_json::from_str(json).unwrap();
        assert_eq!(equipment.category_id, "2");
        assert_eq!(equipment.hub_id.as_deref(), Some("12"));
        assert_eq!(equipment.status, None);
    }
}
