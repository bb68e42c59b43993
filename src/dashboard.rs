use crate::config::AppConfig;
use crate::data::Dataset;
use crate::filter::{evaluate, Cascade, StageView};
use crate::render::{render_map, LayerToggles, MapView};
use crate::table::{project, Column, RatingOrder, TableProjection};
use crate::types::FilterSelection;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const EMPTY_MESSAGE: &str = "No places match the current filters.";

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub dataset: Dataset,
    pub config: AppConfig,
    columns: Vec<Column>,
}

// One user interaction: current selections, layer switches and sort mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardRequest {
    pub selection: FilterSelection,
    pub layers: LayerToggles,
    // Overrides the configured rating order.
    pub sort: Option<RatingOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub stages: Vec<StageView>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub map: MapView,
    pub table: TableProjection,
}

impl Dashboard {
    pub fn new(dataset: Dataset, config: AppConfig) -> Result<Self> {
        let columns = config.table.resolve_columns()?;
        Ok(Self {
            dataset,
            config,
            columns,
        })
    }

    pub fn pass(&self, request: &DashboardRequest) -> DashboardView {
        let cascade = evaluate(&self.dataset.places, &request.selection);
        debug!(rows = cascade.len(), "Filter pass complete");

        let map = render_map(
            &self.dataset,
            &cascade,
            &self.config.map,
            &self.config.presentation,
            request.layers,
        );
        let table = self.table_for(&cascade, request.sort);

        DashboardView {
            count: cascade.len(),
            message: cascade.is_empty().then_some(EMPTY_MESSAGE),
            stages: cascade.stages,
            map,
            table,
        }
    }

    fn table_for(&self, cascade: &Cascade, sort: Option<RatingOrder>) -> TableProjection {
        project(
            cascade.places(&self.dataset.places),
            &self.columns,
            sort.unwrap_or(self.config.table.sort),
        )
    }

    // Fresh CSV of the table for `request`.
    pub fn export_csv(&self, request: &DashboardRequest) -> Result<Vec<u8>> {
        let cascade = evaluate(&self.dataset.places, &request.selection);
        self.table_for(&cascade, request.sort).to_csv()
    }
}
