//! Row types shared by every stage of the pipeline.
//!
//! Product categories are a closed enumeration: the profit-margin table, the
//! product catalogue and the price bands are all keyed by [`Category`], so a
//! label outside the ten known ones is rejected while the table is parsed
//! instead of leaking through as a missing margin.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Product category with its fixed profit margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Clothing,
    #[serde(rename = "Home & Garden")]
    HomeAndGarden,
    Books,
    #[serde(rename = "Sports & Outdoors")]
    SportsAndOutdoors,
    #[serde(rename = "Toys & Games")]
    ToysAndGames,
    #[serde(rename = "Health & Beauty")]
    HealthAndBeauty,
    Automotive,
    #[serde(rename = "Food & Beverages")]
    FoodAndBeverages,
    #[serde(rename = "Office Supplies")]
    OfficeSupplies,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Electronics,
        Category::Clothing,
        Category::HomeAndGarden,
        Category::Books,
        Category::SportsAndOutdoors,
        Category::ToysAndGames,
        Category::HealthAndBeauty,
        Category::Automotive,
        Category::FoodAndBeverages,
        Category::OfficeSupplies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Clothing => "Clothing",
            Category::HomeAndGarden => "Home & Garden",
            Category::Books => "Books",
            Category::SportsAndOutdoors => "Sports & Outdoors",
            Category::ToysAndGames => "Toys & Games",
            Category::HealthAndBeauty => "Health & Beauty",
            Category::Automotive => "Automotive",
            Category::FoodAndBeverages => "Food & Beverages",
            Category::OfficeSupplies => "Office Supplies",
        }
    }

    pub fn profit_margin(self) -> f64 {
        match self {
            Category::Electronics => 0.25,
            Category::Clothing => 0.35,
            Category::HomeAndGarden => 0.30,
            Category::Books => 0.40,
            Category::SportsAndOutdoors => 0.30,
            Category::ToysAndGames => 0.35,
            Category::HealthAndBeauty => 0.40,
            Category::Automotive => 0.25,
            Category::FoodAndBeverages => 0.20,
            Category::OfficeSupplies => 0.30,
        }
    }

    /// Products sold under this category (used by the synthetic source).
    pub fn products(self) -> &'static [&'static str; 10] {
        match self {
            Category::Electronics => &[
                "Smartphone", "Laptop", "Tablet", "Headphones", "Smart Watch",
                "Camera", "Speaker", "Monitor", "Keyboard", "Mouse",
            ],
            Category::Clothing => &[
                "T-Shirt", "Jeans", "Jacket", "Sneakers", "Dress",
                "Shirt", "Shorts", "Hat", "Socks", "Belt",
            ],
            Category::HomeAndGarden => &[
                "Garden Tool", "Plant Pot", "Lawn Mower", "Furniture", "Lamp",
                "Curtains", "Rug", "Pillow", "Blanket", "Vase",
            ],
            Category::Books => &[
                "Novel", "Textbook", "Cookbook", "Biography", "Mystery",
                "Science Fiction", "History", "Poetry", "Comic", "Dictionary",
            ],
            Category::SportsAndOutdoors => &[
                "Basketball", "Tennis Racket", "Yoga Mat", "Dumbbells", "Bicycle",
                "Running Shoes", "Tent", "Backpack", "Helmet", "Water Bottle",
            ],
            Category::ToysAndGames => &[
                "Board Game", "Action Figure", "Puzzle", "LEGO Set", "Doll",
                "RC Car", "Card Game", "Building Blocks", "Stuffed Animal", "Art Set",
            ],
            Category::HealthAndBeauty => &[
                "Shampoo", "Face Cream", "Toothbrush", "Vitamins", "Perfume",
                "Makeup Kit", "Hair Dryer", "Razor", "Sunscreen", "Moisturizer",
            ],
            Category::Automotive => &[
                "Car Battery", "Tire", "Oil Filter", "Brake Pad", "Car Cover",
                "Floor Mat", "Air Freshener", "Phone Mount", "Dash Cam", "Tool Kit",
            ],
            Category::FoodAndBeverages => &[
                "Coffee", "Tea", "Chocolate", "Snacks", "Juice",
                "Cereal", "Pasta", "Sauce", "Spices", "Honey",
            ],
            Category::OfficeSupplies => &[
                "Notebook", "Pen Set", "Stapler", "Folder", "Binder",
                "Calculator", "Desk Organizer", "Paper Clips", "Tape", "Marker",
            ],
        }
    }

    /// Unit price band `(min, max)` for generated orders.
    pub fn price_band(self) -> (f64, f64) {
        match self {
            Category::Electronics => (50.0, 2000.0),
            Category::Clothing => (10.0, 200.0),
            Category::HomeAndGarden => (15.0, 500.0),
            Category::Books => (5.0, 50.0),
            Category::SportsAndOutdoors => (20.0, 800.0),
            Category::ToysAndGames => (5.0, 150.0),
            Category::HealthAndBeauty => (3.0, 100.0),
            Category::Automotive => (10.0, 300.0),
            Category::FoodAndBeverages => (2.0, 50.0),
            Category::OfficeSupplies => (1.0, 100.0),
        }
    }

    fn index(self) -> usize {
        Category::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default()
    }

    /// Stable product code, unique across the whole catalogue.
    pub fn product_id(self, product: usize) -> String {
        format!("PROD{:05}", 1000 + self.index() * 100 + product)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == label)
            .ok_or_else(|| UnknownCategory(label.to_string()))
    }
}

pub const REGIONS: [&str; 6] = [
    "North America",
    "Europe",
    "Asia Pacific",
    "South America",
    "Middle East",
    "Africa",
];

pub const UNKNOWN_REGION: &str = "Unknown";

/// One line of the raw source table, cells kept as text.
///
/// Blank cells come through as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderLine {
    #[serde(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "ProductID")]
    pub product_id: String,
    #[serde(rename = "ProductName")]
    pub product_name: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Quantity")]
    pub quantity: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Revenue")]
    pub revenue: Option<String>,
    #[serde(rename = "OrderDate")]
    pub order_date: String,
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    #[serde(rename = "Region")]
    pub region: Option<String>,
}

/// Header of the raw table, in file order.
pub const RAW_COLUMNS: [&str; 10] = [
    "OrderID",
    "ProductID",
    "ProductName",
    "Category",
    "Quantity",
    "Price",
    "Revenue",
    "OrderDate",
    "CustomerID",
    "Region",
];

/// A validated order line with its derived columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedOrderLine {
    #[serde(rename = "OrderID")]
    pub order_id: String,
    #[serde(rename = "ProductID")]
    pub product_id: String,
    #[serde(rename = "ProductName")]
    pub product_name: String,
    #[serde(rename = "Category")]
    pub category: Category,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "OrderDate")]
    pub order_date: NaiveDateTime,
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "TotalSales")]
    pub total_sales: f64,
    #[serde(rename = "ProfitMargin")]
    pub profit_margin: f64,
    #[serde(rename = "Profit")]
    pub profit: f64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u32,
    #[serde(rename = "Quarter")]
    pub quarter: u32,
    #[serde(rename = "MonthName")]
    pub month_name: String,
    #[serde(rename = "YearMonth")]
    pub year_month: String,
    #[serde(rename = "DaysSinceOrder")]
    pub days_since_order: i64,
}
