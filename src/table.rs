use crate::types::{Place, NO_INFO};
use anyhow::{Context, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// A column of the places table, named after its header in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "municipio")]
    Municipality,
    #[serde(rename = "corredor")]
    Corridor,
    #[serde(rename = "info_type")]
    InfoType,
    #[serde(rename = "category")]
    Category,
    #[serde(rename = "sub_category")]
    SubCategory,
    #[serde(rename = "average_rating")]
    Rating,
    #[serde(rename = "user_ratings_total")]
    RatingCount,
    #[serde(rename = "latitude")]
    Latitude,
    #[serde(rename = "longitude")]
    Longitude,
    #[serde(rename = "types")]
    Types,
    #[serde(rename = "place_link")]
    Link,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::Name,
        Column::Municipality,
        Column::Corridor,
        Column::InfoType,
        Column::Category,
        Column::SubCategory,
        Column::Rating,
        Column::RatingCount,
        Column::Latitude,
        Column::Longitude,
        Column::Types,
        Column::Link,
    ];

    pub const DEFAULT: [Column; 9] = [
        Column::Name,
        Column::Municipality,
        Column::Corridor,
        Column::InfoType,
        Column::Category,
        Column::SubCategory,
        Column::Rating,
        Column::RatingCount,
        Column::Link,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Municipality => "municipio",
            Column::Corridor => "corredor",
            Column::InfoType => "info_type",
            Column::Category => "category",
            Column::SubCategory => "sub_category",
            Column::Rating => "average_rating",
            Column::RatingCount => "user_ratings_total",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
            Column::Types => "types",
            Column::Link => "place_link",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.header() == header)
    }

    pub fn cell(self, place: &Place) -> String {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let coord = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
        match self {
            Column::Name => place.name.clone(),
            Column::Municipality => place.municipality.clone(),
            Column::Corridor => text(&place.corridor),
            Column::InfoType => text(&place.info_type),
            Column::Category => text(&place.category),
            Column::SubCategory => text(&place.sub_category),
            Column::Rating => place.rating.clone(),
            Column::RatingCount => place.rating_count.to_string(),
            Column::Latitude => coord(place.latitude),
            Column::Longitude => coord(place.longitude),
            Column::Types => text(&place.types),
            Column::Link => text(&place.external_link),
        }
    }
}

// Sort order for the rating column; both are descending and stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingOrder {
    // Legacy ordering: compares the rating text, so "9.0" ranks above "10.0".
    // Places without a rating come last.
    #[default]
    Lexicographic,
    // Compares rating values; places without a rating come last.
    Numeric,
}

impl RatingOrder {
    pub fn compare(self, a: &Place, b: &Place) -> Ordering {
        match self {
            RatingOrder::Lexicographic => {
                let a_missing = a.rating == NO_INFO;
                let b_missing = b.rating == NO_INFO;
                a_missing
                    .cmp(&b_missing)
                    .then_with(|| b.rating.cmp(&a.rating))
            }
            RatingOrder::Numeric => match (a.rating_value, b.rating_value) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProjection {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl TableProjection {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::from_writer(Vec::new());
        writer
            .write_record(self.headers())
            .context("Failed to write CSV header")?;
        for row in &self.rows {
            writer.write_record(row).context("Failed to write CSV row")?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV export: {}", e))
    }
}

pub fn project<'a, I>(places: I, columns: &[Column], order: RatingOrder) -> TableProjection
where
    I: IntoIterator<Item = &'a Place>,
{
    let mut sorted: Vec<&Place> = places.into_iter().collect();
    sorted.sort_by(|a, b| order.compare(a, b));

    TableProjection {
        columns: columns.to_vec(),
        rows: sorted
            .into_iter()
            .map(|place| columns.iter().map(|c| c.cell(place)).collect())
            .collect(),
    }
}
