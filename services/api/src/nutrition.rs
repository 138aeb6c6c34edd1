//! Nutrition lookup against USDA FoodData Central with an offline fallback
//!
//! This sits outside the authorization and data core. A remote failure of
//! any kind, including a timeout, degrades to substring matching over a
//! small built-in table.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Queries shorter than this return nothing
pub const MIN_QUERY_LEN: usize = 2;

/// Results kept from the remote source
pub const MAX_RESULTS: usize = 10;

/// A food with macros per serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub brand: String,
    pub serving: String,
    pub calories: i64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub verified: bool,
}

#[derive(Error, Debug)]
pub enum NutritionError {
    #[error("Nutrition request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Nutrition service returned status {0}")]
    Status(u16),
}

/// Anything that can answer a food search
#[async_trait]
pub trait FoodSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<FoodItem>, NutritionError>;
}

/// FoodData Central search client
pub struct UsdaFoodSource {
    client: Client,
    url: String,
    api_key: String,
}

impl UsdaFoodSource {
    /// Create a client whose every request is bounded by `timeout`
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NutritionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl FoodSource for UsdaFoodSource {
    async fn search(&self, query: &str) -> Result<Vec<FoodItem>, NutritionError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", query),
                ("pageSize", "20"),
                ("dataType", "Foundation"),
                ("dataType", "SR Legacy"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NutritionError::Status(response.status().as_u16()));
        }

        let body: UsdaSearchResponse = response.json().await?;
        Ok(body.into_items())
    }
}

#[derive(Debug, Default, Deserialize)]
struct UsdaSearchResponse {
    #[serde(default)]
    foods: Vec<UsdaFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaFood {
    fdc_id: Option<i64>,
    #[serde(default)]
    description: String,
    brand_owner: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<UsdaNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaNutrient {
    #[serde(default)]
    nutrient_name: String,
    unit_name: Option<String>,
    #[serde(default)]
    value: f64,
}

#[derive(Default)]
struct Macros {
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fats: Option<f64>,
}

impl UsdaSearchResponse {
    /// Keep foods that report all four macros
    fn into_items(self) -> Vec<FoodItem> {
        self.foods
            .into_iter()
            .filter_map(UsdaFood::into_item)
            .take(MAX_RESULTS)
            .collect()
    }
}

impl UsdaFood {
    fn into_item(self) -> Option<FoodItem> {
        let mut macros = Macros::default();

        for nutrient in &self.food_nutrients {
            let name = nutrient.nutrient_name.to_lowercase();
            if name.contains("energy") || name.contains("calor") {
                // Energy is reported in both kcal and kJ
                if nutrient
                    .unit_name
                    .as_deref()
                    .is_some_and(|unit| unit.eq_ignore_ascii_case("kj"))
                {
                    continue;
                }
                macros.calories = Some(nutrient.value);
            } else if name.contains("protein") {
                macros.protein = Some(nutrient.value);
            } else if name.contains("carbohydrate") {
                macros.carbs = Some(nutrient.value);
            } else if name.contains("total lipid") || name.contains("fat") {
                macros.fats = Some(nutrient.value);
            }
        }

        Some(FoodItem {
            id: self.fdc_id,
            name: self.description,
            brand: self.brand_owner.unwrap_or_else(|| "USDA".to_string()),
            serving: "100g".to_string(),
            calories: macros.calories?.round() as i64,
            protein: round_tenth(macros.protein?),
            carbs: round_tenth(macros.carbs?),
            fats: round_tenth(macros.fats?),
            verified: true,
        })
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Built-in demo foods used when the remote source is unavailable
#[derive(Debug, Clone, Default)]
pub struct FallbackTable;

impl FallbackTable {
    /// Case-insensitive substring match on the food name
    pub fn lookup(&self, query: &str) -> Vec<FoodItem> {
        let query = query.to_lowercase();
        DEMO_FOODS
            .iter()
            .filter(|food| food.0.to_lowercase().contains(&query))
            .map(|&(name, brand, calories, protein, carbs, fats, serving)| FoodItem {
                id: None,
                name: name.to_string(),
                brand: brand.to_string(),
                serving: serving.to_string(),
                calories,
                protein,
                carbs,
                fats,
                verified: true,
            })
            .collect()
    }
}

#[async_trait]
impl FoodSource for FallbackTable {
    async fn search(&self, query: &str) -> Result<Vec<FoodItem>, NutritionError> {
        Ok(self.lookup(query))
    }
}

type DemoFood = (&'static str, &'static str, i64, f64, f64, f64, &'static str);

const DEMO_FOODS: [DemoFood; 12] = [
    ("Chicken Breast, Grilled", "Generic", 165, 31.0, 0.0, 3.6, "100g"),
    ("Chicken Breast, Raw", "USDA", 120, 22.5, 0.0, 2.6, "100g"),
    ("Banana, Medium", "Fresh", 105, 1.3, 27.0, 0.4, "1 medium"),
    ("Greek Yogurt, Plain", "Generic", 100, 17.0, 6.0, 0.7, "170g"),
    ("Oatmeal, Cooked", "Generic", 71, 2.5, 12.0, 1.5, "100g"),
    ("Salmon, Grilled", "Atlantic", 206, 22.0, 0.0, 13.0, "100g"),
    ("Brown Rice, Cooked", "Generic", 111, 2.6, 23.0, 0.9, "100g"),
    ("Eggs, Large", "Generic", 72, 6.0, 0.4, 5.0, "1 large egg"),
    ("Almonds, Raw", "Generic", 579, 21.0, 22.0, 50.0, "100g"),
    ("Avocado", "Fresh", 160, 2.0, 8.5, 15.0, "100g"),
    ("Sweet Potato, Baked", "Fresh", 90, 2.0, 21.0, 0.2, "100g"),
    ("Broccoli, Steamed", "Fresh", 35, 2.4, 7.0, 0.4, "100g"),
];

/// Try the remote source, fall back to the built-in table on any failure
#[derive(Clone)]
pub struct NutritionSearch {
    primary: Option<Arc<dyn FoodSource>>,
    fallback: FallbackTable,
}

impl NutritionSearch {
    pub fn new(primary: Arc<dyn FoodSource>) -> Self {
        Self {
            primary: Some(primary),
            fallback: FallbackTable,
        }
    }

    /// Search that only consults the built-in table
    pub fn offline() -> Self {
        Self {
            primary: None,
            fallback: FallbackTable,
        }
    }

    pub async fn search(&self, query: &str) -> Vec<FoodItem> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        if let Some(primary) = &self.primary {
            match primary.search(query).await {
                Ok(items) => {
                    debug!("Remote nutrition search returned {} items", items.len());
                    return items;
                }
                Err(e) => warn!("Remote nutrition search failed, using fallback: {}", e),
            }
        }

        self.fallback.lookup(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FoodSource for Failing {
        async fn search(&self, _query: &str) -> Result<Vec<FoodItem>, NutritionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(NutritionError::Status(503))
        }
    }

    struct Fixed(Vec<FoodItem>);

    #[async_trait]
    impl FoodSource for Fixed {
        async fn search(&self, _query: &str) -> Result<Vec<FoodItem>, NutritionError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_fallback_lookup_is_case_insensitive() {
        let names: Vec<_> = FallbackTable
            .lookup("CHICKEN")
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Chicken Breast, Grilled", "Chicken Breast, Raw"]);
        assert!(FallbackTable.lookup("pizza").is_empty());
    }

    #[tokio::test]
    async fn test_short_query_skips_every_source() {
        let failing = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let search = NutritionSearch::new(failing.clone());

        assert!(search.search("a").await.is_empty());
        assert!(search.search("  ").await.is_empty());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let failing = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let search = NutritionSearch::new(failing.clone());

        let results = search.search("avocado").await;
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].calories, 160);
    }

    #[tokio::test]
    async fn test_remote_results_win_when_available() {
        let remote = FoodItem {
            id: Some(1),
            name: "Remote Avocado".into(),
            brand: "USDA".into(),
            serving: "100g".into(),
            calories: 160,
            protein: 2.0,
            carbs: 8.5,
            fats: 14.7,
            verified: true,
        };
        let search = NutritionSearch::new(Arc::new(Fixed(vec![remote.clone()])));
        assert_eq!(search.search("avocado").await, vec![remote]);
    }

    #[tokio::test]
    async fn test_unreachable_remote_falls_back_within_timeout() {
        let source = UsdaFoodSource::new(
            "http://127.0.0.1:9/fdc/v1/foods/search",
            "DEMO_KEY",
            Duration::from_millis(500),
        )
        .unwrap();
        let search = NutritionSearch::new(Arc::new(source));

        let results = search.search("salmon").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Salmon, Grilled");
    }

    #[test]
    fn test_usda_payload_parsing() {
        let body = serde_json::json!({
            "foods": [
                {
                    "fdcId": 171705,
                    "description": "Avocados, raw, all commercial varieties",
                    "foodNutrients": [
                        {"nutrientName": "Protein", "unitName": "G", "value": 2.0},
                        {"nutrientName": "Total lipid (fat)", "unitName": "G", "value": 14.66},
                        {"nutrientName": "Carbohydrate, by difference", "unitName": "G", "value": 8.53},
                        {"nutrientName": "Energy", "unitName": "KCAL", "value": 160.4},
                        {"nutrientName": "Energy", "unitName": "kJ", "value": 670.0}
                    ]
                },
                {
                    "fdcId": 2,
                    "description": "Missing macros",
                    "foodNutrients": [{"nutrientName": "Energy", "value": 10.0}]
                }
            ]
        });

        let parsed: UsdaSearchResponse = serde_json::from_value(body).unwrap();
        let items = parsed.into_items();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id, Some(171705));
        assert_eq!(item.brand, "USDA");
        assert_eq!(item.calories, 160);
        assert_eq!(item.protein, 2.0);
        assert_eq!(item.carbs, 8.5);
        assert_eq!(item.fats, 14.7);
    }
}
