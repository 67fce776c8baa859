use std::path::Path;

use survey_lens::config::AppConfig;
use survey_lens::data::pipeline::{self, ViewKind, ViewRequest, ViewResponse};
use survey_lens::{classify, Classification, Dataset, FilterSpec, PipelineError, Value};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// View selection
// ---------------------------------------------------------------------------

/// The chart tabs offered by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChoice {
    Means,
    Counts,
    CrossTab,
    Histogram,
    Frequencies,
    Profile,
}

impl ViewChoice {
    pub const ALL: [ViewChoice; 6] = [
        ViewChoice::Means,
        ViewChoice::Counts,
        ViewChoice::CrossTab,
        ViewChoice::Histogram,
        ViewChoice::Frequencies,
        ViewChoice::Profile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ViewChoice::Means => "Promedio por grupo",
            ViewChoice::Counts => "Conteo por grupo",
            ViewChoice::CrossTab => "Tabla cruzada",
            ViewChoice::Histogram => "Histograma",
            ViewChoice::Frequencies => "Frecuencias",
            ViewChoice::Profile => "Perfil (radar)",
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Loaded dataset (None until user loads a file).
    pub dataset: Option<Dataset>,

    /// Column kinds of the loaded dataset.
    pub classification: Classification,

    /// Last filter spec that validated against the dataset.
    pub filters: FilterSpec,

    pub view: ViewChoice,
    /// Grouping column (bars, crosstab rows, radar polygons).
    pub group_column: Option<String>,
    /// Continuous column for means and histograms.
    pub value_column: Option<String>,
    /// Categorical column for counts, crosstab columns and frequencies.
    pub category_column: Option<String>,
    pub histogram_bins: usize,

    /// Result of the last pipeline run.
    pub response: Option<Result<ViewResponse, PipelineError>>,

    /// Colours for the grouping column's values.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let histogram_bins = config.view.histogram_bins;
        Self {
            config,
            dataset: None,
            classification: Classification::default(),
            filters: FilterSpec::default(),
            view: ViewChoice::Means,
            group_column: None,
            value_column: None,
            category_column: None,
            histogram_bins,
            response: None,
            color_map: None,
            status_message: None,
        }
    }

    /// Load a file and make it the current dataset; errors go to the status
    /// line and leave the previous dataset in place.
    pub fn open_path(&mut self, path: &Path, label: &str) {
        match Dataset::open(path, label) {
            Ok(dataset) => self.set_dataset(dataset),
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Ingest a newly loaded dataset, pick default columns and filters.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        let table = dataset.table();
        self.classification = classify(table);

        let preferred = &self.config.view.default_group_column;
        self.group_column = if self.classification.categorical.contains(preferred) {
            Some(preferred.clone())
        } else {
            self.classification.categorical.first().cloned()
        };
        self.value_column = self.classification.continuous.first().cloned();
        self.category_column = self
            .classification
            .categorical
            .iter()
            .find(|c| Some(*c) != self.group_column.as_ref())
            .or(self.classification.categorical.first())
            .cloned();

        // Start with the grouping column fully selected, like a multiselect
        // defaulting to every option.
        self.filters = match &self.group_column {
            Some(col) => FilterSpec::select_all(table, [col.as_str()]).unwrap_or_default(),
            None => FilterSpec::default(),
        };

        self.dataset = Some(dataset);
        self.rebuild_color_map();
        self.status_message = None;
        self.refresh();
    }

    /// Rebuild the colour map from the current `group_column`.
    pub fn rebuild_color_map(&mut self) {
        self.color_map = match (&self.dataset, &self.group_column) {
            (Some(ds), Some(col)) => ds
                .table()
                .unique_values(col)
                .map(|vals| ColorMap::new(&vals)),
            _ => None,
        };
    }

    pub fn set_group_column(&mut self, col: String) {
        self.group_column = Some(col);
        self.rebuild_color_map();
        self.refresh();
    }

    /// Translate the widget selections into a pipeline request.
    pub fn build_request(&self) -> Option<ViewRequest> {
        let group = self.group_column.clone();
        let value = self.value_column.clone();
        let category = self.category_column.clone();
        let view = match self.view {
            ViewChoice::Means => ViewKind::MeanByGroup {
                group: group?,
                value: value?,
            },
            ViewChoice::Counts => ViewKind::CountByGroup {
                group: group?,
                category: category?,
            },
            ViewChoice::CrossTab => ViewKind::CrossTab {
                rows: group?,
                columns: category?,
            },
            ViewChoice::Histogram => ViewKind::Histogram {
                column: value?,
                bins: self.histogram_bins,
            },
            ViewChoice::Frequencies => ViewKind::ValueCounts { column: category? },
            ViewChoice::Profile => ViewKind::Profile {
                group: group?,
                values: self.profile_columns(),
            },
        };
        Some(ViewRequest {
            filters: self.filters.clone(),
            view,
        })
    }

    /// Radar axes: the configured columns that exist and are continuous,
    /// falling back to every continuous column.
    pub fn profile_columns(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .config
            .view
            .profile_columns
            .iter()
            .filter(|c| self.classification.continuous.contains(*c))
            .cloned()
            .collect();
        if configured.is_empty() {
            self.classification.continuous.clone()
        } else {
            configured
        }
    }

    /// Re-run the pipeline for the current selections.
    pub fn refresh(&mut self) {
        let Some(ds) = &self.dataset else {
            self.response = None;
            return;
        };
        self.response = self.build_request().map(|request| {
            let result = pipeline::run(ds, &request);
            if let Err(e) = &result {
                log::warn!("view {:?} failed: {e}", request.view);
            }
            result
        });
    }

    /// Replace the filters if the candidate validates, otherwise keep the
    /// previous spec and report why.
    fn apply_filters(&mut self, candidate: FilterSpec) {
        let Some(ds) = &self.dataset else {
            return;
        };
        match candidate.validate(ds.table()) {
            Ok(()) => {
                self.filters = candidate;
                self.status_message = None;
                self.refresh();
            }
            Err(e) => {
                log::warn!("rejected filter: {e}");
                self.status_message = Some(format!("Filtro inválido: {e}"));
            }
        }
    }

    /// Toggle a single value in a column's filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &Value) {
        let mut candidate = self.filters.clone();
        candidate.toggle(column, value);
        self.apply_filters(candidate);
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let Some(values) = ds.table().unique_values(column) else {
            return;
        };
        let candidate = self.filters.clone().with(column, values);
        self.apply_filters(candidate);
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        let mut candidate = self.filters.clone();
        candidate.clear(column);
        self.apply_filters(candidate);
    }

    /// Stop filtering on a column.
    pub fn clear_filter(&mut self, column: &str) {
        let mut candidate = self.filters.clone();
        candidate.remove(column);
        self.apply_filters(candidate);
    }

    /// Rows left after filtering, if the last run succeeded.
    pub fn rows_matched(&self) -> Option<usize> {
        match &self.response {
            Some(Ok(r)) => Some(r.rows_matched),
            _ => None,
        }
    }
}
