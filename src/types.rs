use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const NO_INFO: &str = "No Info";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub name: String,
    pub municipality: String,
    pub corridor: Option<String>,
    pub info_type: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub rating: String, // rendered number or NO_INFO
    #[serde(skip)]
    pub rating_value: Option<f64>,
    pub rating_count: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub types: Option<String>,
    pub external_link: Option<String>,
}

impl Place {
    pub fn location(&self) -> Option<Point<f64>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Point::new(lon, lat)),
            _ => None,
        }
    }

    pub fn stage_value(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Corridor => self.corridor.as_deref(),
            Stage::Municipality => Some(self.municipality.as_str()),
            Stage::InfoType => self.info_type.as_deref(),
            Stage::Category => self.category.as_deref(),
            Stage::SubCategory => self.sub_category.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizedSite {
    pub site_name: String,
    pub municipality: String,
    pub priority_flag: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl PrioritizedSite {
    pub fn location(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Corridor,
    Municipality,
    InfoType,
    Category,
    SubCategory,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Corridor,
        Stage::Municipality,
        Stage::InfoType,
        Stage::Category,
        Stage::SubCategory,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn column(self) -> &'static str {
        match self {
            Stage::Corridor => "corredor",
            Stage::Municipality => "municipio",
            Stage::InfoType => "info_type",
            Stage::Category => "category",
            Stage::SubCategory => "sub_category",
        }
    }

    pub fn upstream(self) -> &'static [Stage] {
        let all: &'static [Stage; 5] = &Self::ALL;
        &all[..self.index()]
    }
}

// An empty set means "no restriction" for that stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSelection {
    pub corridor: BTreeSet<String>,
    pub municipality: BTreeSet<String>,
    pub info_type: BTreeSet<String>,
    pub category: BTreeSet<String>,
    pub sub_category: BTreeSet<String>,
}

impl FilterSelection {
    pub fn get(&self, stage: Stage) -> &BTreeSet<String> {
        match stage {
            Stage::Corridor => &self.corridor,
            Stage::Municipality => &self.municipality,
            Stage::InfoType => &self.info_type,
            Stage::Category => &self.category,
            Stage::SubCategory => &self.sub_category,
        }
    }

    pub fn get_mut(&mut self, stage: Stage) -> &mut BTreeSet<String> {
        match stage {
            Stage::Corridor => &mut self.corridor,
            Stage::Municipality => &mut self.municipality,
            Stage::InfoType => &mut self.info_type,
            Stage::Category => &mut self.category,
            Stage::SubCategory => &mut self.sub_category,
        }
    }

    pub fn with<I, S>(mut self, stage: Stage, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_mut(stage).extend(values.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        Stage::ALL.iter().all(|&stage| self.get(stage).is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub icon: String,
    pub color: String,
}
