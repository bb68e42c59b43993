use crate::config::AppConfig;
use crate::types::{Place, PrioritizedSite, NO_INFO};
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub places: Vec<Place>,
    pub sites: Vec<PrioritizedSite>,
    pub report: LoadReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub places: usize,
    pub sites: usize,
    // Sites whose geo-reference could not be parsed.
    pub dropped_sites: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RawPlace {
    pub name: String,
    pub municipality: Option<String>,
    pub corridor: Option<String>,
    pub info_type: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub average_rating: Option<String>,
    pub user_ratings_total: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub types: Option<String>,
    pub place_link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawSite {
    pub site_name: String,
    pub municipality: String,
    pub priority_flag: String,
    pub georeference: String,
}

pub fn load_data(config: &AppConfig) -> Result<Dataset> {
    info!("Loading data...");

    // 1. Read and normalize both files
    let dataset = load_from_paths(&config.input.places_csv, &config.input.sites_csv)?;
    info!(
        places = dataset.report.places,
        sites = dataset.report.sites,
        "Loaded datasets"
    );

    // 2. Report sites lost to bad coordinates
    if dataset.report.dropped_sites > 0 {
        warn!(
            dropped = dataset.report.dropped_sites,
            "Dropped thermal sites with unparseable coordinates"
        );
    }

    Ok(dataset)
}

pub fn normalize(raw_places: Vec<RawPlace>, raw_sites: Vec<RawSite>) -> Dataset {
    let places: Vec<Place> = raw_places.into_iter().map(normalize_place).collect();

    let site_total = raw_sites.len();
    let sites: Vec<PrioritizedSite> = raw_sites.into_iter().filter_map(normalize_site).collect();

    let report = LoadReport {
        places: places.len(),
        sites: sites.len(),
        dropped_sites: site_total - sites.len(),
    };

    Dataset {
        places,
        sites,
        report,
    }
}

pub fn normalize_place(raw: RawPlace) -> Place {
    let rating_value = raw
        .average_rating
        .as_deref()
        .and_then(parse_float);

    Place {
        name: raw.name,
        municipality: non_blank(raw.municipality).unwrap_or_else(|| NO_INFO.to_string()),
        corridor: non_blank(raw.corridor),
        info_type: non_blank(raw.info_type),
        category: non_blank(raw.category),
        sub_category: non_blank(raw.sub_category),
        rating: rating_value.map_or_else(|| NO_INFO.to_string(), rating_text),
        rating_value,
        rating_count: raw
            .user_ratings_total
            .as_deref()
            .and_then(parse_count)
            .unwrap_or(0),
        latitude: raw.latitude.as_deref().and_then(parse_float),
        longitude: raw.longitude.as_deref().and_then(parse_float),
        types: non_blank(raw.types),
        external_link: non_blank(raw.place_link),
    }
}

// Returns `None` when the geo-reference cannot be parsed; the row is dropped.
pub fn normalize_site(raw: RawSite) -> Option<PrioritizedSite> {
    let (latitude, longitude) = parse_geo_string(&raw.georeference)?;
    Some(PrioritizedSite {
        site_name: raw.site_name,
        municipality: raw.municipality,
        priority_flag: raw.priority_flag,
        latitude,
        longitude,
    })
}

// Parses a combined "lat,lon" string. Anything after the second comma is ignored.
pub fn parse_geo_string(value: &str) -> Option<(f64, f64)> {
    let mut parts = value.split(',');
    let lat = parse_float(parts.next()?)?;
    let lon = parse_float(parts.next()?)?;
    Some((lat, lon))
}

// Integral ratings keep one decimal so "4" reads as "4.0".
pub fn rating_text(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_count(value: &str) -> Option<u32> {
    let value = value.trim();
    value.parse::<u32>().ok().or_else(|| {
        parse_float(value)
            .filter(|v| *v >= 0.0)
            .map(|v| v.min(u32::MAX as f64) as u32)
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn header_indices(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
        .collect()
}

fn required(indices: &HashMap<String, usize>, column: &str) -> Result<usize> {
    indices
        .get(column)
        .copied()
        .ok_or_else(|| anyhow!("Required column '{}' not found", column))
}

pub fn read_places<R: Read>(reader: R) -> Result<Vec<RawPlace>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let indices = header_indices(rdr.headers()?);

    let name_idx = required(&indices, "name")?;
    let optional = |column: &str| indices.get(column).copied();
    let municipality_idx = optional("municipio");
    let corridor_idx = optional("corredor");
    let info_type_idx = optional("info_type");
    let category_idx = optional("category");
    let sub_category_idx = optional("sub_category");
    let rating_idx = optional("average_rating");
    let count_idx = optional("user_ratings_total");
    let lat_idx = optional("latitude");
    let lon_idx = optional("longitude");
    let types_idx = optional("types");
    let link_idx = optional("place_link");

    let mut places = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::to_string);

        places.push(RawPlace {
            name: record.get(name_idx).unwrap_or("").to_string(),
            municipality: cell(municipality_idx),
            corridor: cell(corridor_idx),
            info_type: cell(info_type_idx),
            category: cell(category_idx),
            sub_category: cell(sub_category_idx),
            average_rating: cell(rating_idx),
            user_ratings_total: cell(count_idx),
            latitude: cell(lat_idx),
            longitude: cell(lon_idx),
            types: cell(types_idx),
            place_link: cell(link_idx),
        });
    }

    Ok(places)
}

pub fn read_sites<R: Read>(reader: R) -> Result<Vec<RawSite>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let indices = header_indices(rdr.headers()?);

    let name_idx = required(&indices, "Centro Termal")?;
    let municipality_idx = required(&indices, "Municipio")?;
    let priority_idx = required(&indices, "Priorizado")?;
    let geo_idx = required(&indices, "Georreferenciación")?;

    let mut sites = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();

        sites.push(RawSite {
            site_name: cell(name_idx),
            municipality: cell(municipality_idx),
            priority_flag: cell(priority_idx),
            georeference: cell(geo_idx),
        });
    }

    Ok(sites)
}

pub fn load_from_paths(places: &Path, sites: &Path) -> Result<Dataset> {
    let file = File::open(places)
        .with_context(|| format!("Failed to open places CSV: {:?}", places))?;
    let raw_places =
        read_places(file).with_context(|| format!("Failed to read places CSV: {:?}", places))?;

    let file =
        File::open(sites).with_context(|| format!("Failed to open sites CSV: {:?}", sites))?;
    let raw_sites =
        read_sites(file).with_context(|| format!("Failed to read sites CSV: {:?}", sites))?;

    Ok(normalize(raw_places, raw_sites))
}
