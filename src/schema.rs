use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A `(category, item)` pair as it appears in the first two ledger columns.
/// "Category" here is the ledger's own grouping, i.e. the subcategory level of
/// the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ItemKey {
    pub category: String,
    pub item: String,
}

impl ItemKey {
    pub fn new(category: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            item: item.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryReassignment {
    #[schemars(description = "Exact item name whose ledger category is wrong.")]
    pub item_name: String,

    #[schemars(description = "Category the item should be filed under.")]
    pub new_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnificationGroup {
    #[schemars(description = "Category of the merged item.")]
    pub category: String,

    #[schemars(description = "Name of the merged item.")]
    pub new_item: String,

    #[schemars(
        description = "Rows summed into the merged item. Every row must exist in the ledger; all of them are removed after merging."
    )]
    pub items_to_unite: Vec<ItemKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MeaningfulOthers {
    #[schemars(description = "The catch-all category (e.g. 'Other expenses').")]
    pub category: String,

    #[schemars(description = "Name of the item that absorbs every non-meaningful row.")]
    pub new_item: String,

    #[schemars(description = "Items of the catch-all category that stay separate.")]
    pub meaningful_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuantityScale {
    pub item: String,

    #[schemars(description = "Multiplier applied to every quantity of the item (e.g. 10 for egg packs of ten).")]
    pub factor: f64,
}

/// Hand-maintained corrections applied by the normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LedgerOverrides {
    #[serde(default)]
    pub reassignments: Vec<CategoryReassignment>,

    #[schemars(description = "Applied in order, after reassignments.")]
    #[serde(default)]
    pub unifications: Vec<UnificationGroup>,

    #[schemars(description = "Applied after every named unification.")]
    #[serde(default)]
    pub others: Option<MeaningfulOthers>,

    #[serde(default)]
    pub quantity_scales: Vec<QuantityScale>,
}

/// Maps ledger categories onto the two top-level categories.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryScheme {
    pub food_category: String,
    pub non_food_category: String,

    #[schemars(description = "Ledger categories that belong to the non-food top-level category. Everything else is food.")]
    pub non_food_subcategories: Vec<String>,
}

impl Default for CategoryScheme {
    fn default() -> Self {
        Self {
            food_category: "Foodstuff".to_string(),
            non_food_category: "Household".to_string(),
            non_food_subcategories: vec![
                "Cat supplies".to_string(),
                "Household items".to_string(),
                "Other expenses".to_string(),
            ],
        }
    }
}

impl CategoryScheme {
    pub fn category_for(&self, subcategory: &str) -> &str {
        if self.non_food_subcategories.iter().any(|s| s == subcategory) {
            &self.non_food_category
        } else {
            &self.food_category
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UnitOverrides {
    #[schemars(description = "Items measured by weight or volume even though every recorded quantity is a whole number.")]
    #[serde(default)]
    pub weight_volume_items: Vec<String>,
}

fn default_root_label() -> String {
    "Total".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LedgerConfig {
    #[serde(default)]
    pub overrides: LedgerOverrides,

    #[serde(default)]
    pub scheme: CategoryScheme,

    #[serde(default)]
    pub units: UnitOverrides,

    #[schemars(description = "Label of the synthetic root node of every hierarchy.")]
    #[serde(default = "default_root_label")]
    pub root_label: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            overrides: LedgerOverrides::default(),
            scheme: CategoryScheme::default(),
            units: UnitOverrides::default(),
            root_label: default_root_label(),
        }
    }
}

impl LedgerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LedgerConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
