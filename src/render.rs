use crate::config::{MapConfig, PresentationConfig};
use crate::data::Dataset;
use crate::filter::Cascade;
use crate::types::{MarkerStyle, Place, PrioritizedSite, Stage};
use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerToggles {
    pub markers: bool,
    pub heatmap: bool,
    pub thermal_sites: bool,
}

impl Default for LayerToggles {
    fn default() -> Self {
        Self {
            markers: true,
            heatmap: false,
            thermal_sites: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub sub_category: String,
    #[serde(flatten)]
    pub style: MarkerStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    // [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub legend: Vec<LegendEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<FeatureCollection>,
    // [lat, lon, weight]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heatmap: Option<Vec<[f64; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thermal_sites: Option<FeatureCollection>,
}

pub fn map_center<'a, I>(places: I, default: [f64; 2]) -> [f64; 2]
where
    I: IntoIterator<Item = &'a Place>,
{
    // Any row without a coordinate, or no rows at all, means the default center.
    let mut sum = Point::new(0.0, 0.0);
    let mut count = 0usize;
    for place in places {
        match place.location() {
            Some(location) => sum = sum + location,
            None => return default,
        }
        count += 1;
    }
    if count == 0 {
        return default;
    }
    let mean = sum / count as f64;
    [mean.y(), mean.x()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyles {
    styles: BTreeMap<String, MarkerStyle>,
    fallback: MarkerStyle,
}

impl MarkerStyles {
    pub fn assign(universe: &BTreeSet<String>, config: &PresentationConfig) -> Self {
        let styles = universe
            .iter()
            .enumerate()
            .map(|(position, value)| {
                // Curated entry first, else palette slot by sorted position
                let style = config.icons.get(value).cloned().unwrap_or_else(|| MarkerStyle {
                    icon: config.default_icon.clone(),
                    color: palette_color(&config.palette, position, &config.fallback_color),
                });
                (value.clone(), style)
            })
            .collect();

        Self {
            styles,
            fallback: MarkerStyle {
                icon: config.default_icon.clone(),
                color: config.fallback_color.clone(),
            },
        }
    }

    pub fn style_for(&self, sub_category: Option<&str>) -> &MarkerStyle {
        sub_category
            .and_then(|value| self.styles.get(value))
            .unwrap_or(&self.fallback)
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.styles
            .iter()
            .map(|(sub_category, style)| LegendEntry {
                sub_category: sub_category.clone(),
                style: style.clone(),
            })
            .collect()
    }
}

fn palette_color(palette: &[String], position: usize, fallback: &str) -> String {
    if palette.is_empty() {
        return fallback.to_string();
    }
    palette[position % palette.len()].clone()
}

pub fn render_map(
    dataset: &Dataset,
    cascade: &Cascade,
    map: &MapConfig,
    presentation: &PresentationConfig,
    layers: LayerToggles,
) -> MapView {
    // 1. Styles cover the whole sub-category universe, not just surviving rows
    let styles = MarkerStyles::assign(&cascade.stage(Stage::SubCategory).options, presentation);

    // 2. Center
    let center = map_center(cascade.places(&dataset.places), map.default_center);

    // 3. Layers, each only when switched on
    let markers = layers
        .markers
        .then(|| marker_layer(cascade.places(&dataset.places), &styles));
    let heatmap = layers
        .heatmap
        .then(|| heatmap_layer(cascade.places(&dataset.places)));
    let thermal_sites = layers.thermal_sites.then(|| site_layer(&dataset.sites));

    MapView {
        center,
        zoom: map.zoom,
        legend: styles.legend(),
        markers,
        heatmap,
        thermal_sites,
    }
}

pub fn marker_layer<'a, I>(places: I, styles: &MarkerStyles) -> FeatureCollection
where
    I: IntoIterator<Item = &'a Place>,
{
    let features = places
        .into_iter()
        .filter_map(|place| {
            let location = place.location()?;
            let style = styles.style_for(place.sub_category.as_deref());

            let mut properties = JsonObject::new();
            properties.insert("name".into(), json!(place.name));
            properties.insert("municipality".into(), json!(place.municipality));
            properties.insert("sub_category".into(), json!(place.sub_category));
            properties.insert("rating".into(), json!(place.rating));
            properties.insert("icon".into(), json!(style.icon));
            properties.insert("color".into(), json!(style.color));
            properties.insert("popup".into(), json!(popup_html(place)));
            properties.insert("link".into(), json!(place.external_link));

            Some(point_feature(location, properties))
        })
        .collect();

    collection(features)
}

pub fn heatmap_layer<'a, I>(places: I) -> Vec<[f64; 3]>
where
    I: IntoIterator<Item = &'a Place>,
{
    places
        .into_iter()
        .filter_map(|place| place.location())
        .map(|p| [p.y(), p.x(), 1.0])
        .collect()
}

pub fn site_layer(sites: &[PrioritizedSite]) -> FeatureCollection {
    let features = sites
        .iter()
        .map(|site| {
            let mut properties = JsonObject::new();
            properties.insert("name".into(), json!(site.site_name));
            properties.insert("municipality".into(), json!(site.municipality));
            properties.insert("prioritized".into(), json!(site.priority_flag));
            properties.insert(
                "popup".into(),
                json!(format!(
                    "<b>{}</b><br>{}<br>Priorizado: {}",
                    escape_html(&site.site_name),
                    escape_html(&site.municipality),
                    escape_html(&site.priority_flag)
                )),
            );
            point_feature(site.location(), properties)
        })
        .collect();

    collection(features)
}

pub fn popup_html(place: &Place) -> String {
    let mut html = format!(
        "<b>{}</b><br>{}<br>{}",
        escape_html(&place.name),
        escape_html(&place.municipality),
        escape_html(place.sub_category.as_deref().unwrap_or(""))
    );
    if let Some(link) = &place.external_link {
        html.push_str(&format!(
            "<br><a href=\"{}\" target=\"_blank\">Ver en mapa</a>",
            escape_html(link)
        ));
    }
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

// GeoJSON positions are [lon, lat].
fn point_feature(location: Point<f64>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![location.x(), location.y()]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
