use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::comparer::Comparer;
use crate::domain::VotvError;
use crate::filter::ValueFilter;
use crate::state::{ResultStateSerializer, SortDirection, ViewerOptions};
use crate::votable::{CellValue, Field, Row, Table};

/// A sorted, filtered window onto a table. The table itself is never
/// reordered, the view only keeps indices into its rows.
#[derive(Debug)]
pub struct GridView<'t> {
    table: &'t Table,
    order: Vec<usize>, // All data rows in sort order
    rows: Vec<usize>,  // Mapping of view row index to data row index
    columns: Vec<usize>,
    sort: Option<(String, SortDirection)>,
    filters: BTreeMap<String, ValueFilter>,
    widths: BTreeMap<String, u32>,
    units: BTreeMap<String, String>,
}

impl<'t> GridView<'t> {
    pub fn new(table: &'t Table) -> Self {
        let order: Vec<usize> = (0..table.rows().len()).collect();
        GridView {
            table,
            rows: order.clone(),
            order,
            columns: (0..table.fields().len()).collect(),
            sort: None,
            filters: BTreeMap::new(),
            widths: BTreeMap::new(),
            units: BTreeMap::new(),
        }
    }

    fn field(&self, column: &str) -> Result<&'t Field, VotvError> {
        self.table
            .metadata
            .field(column)
            .ok_or_else(|| VotvError::UnknownColumn(column.to_string()))
    }

    /// Stable sort on one column. Numeric columns use NaN ordering.
    pub fn sort(&mut self, column: &str, direction: SortDirection) -> Result<(), VotvError> {
        let field = self.field(column)?;
        let comparer = Comparer::new(&field.id, field.is_numeric());
        let data = self.table.rows();
        let start_time = Instant::now();

        if direction.is_ascending() {
            self.order
                .sort_by(|&a, &b| comparer.compare(&data[a], &data[b]));
        } else {
            self.order
                .sort_by(|&a, &b| comparer.compare(&data[b], &data[a]));
        }
        trace!(
            "Sorting {} rows on {column} took {}ms",
            self.order.len(),
            start_time.elapsed().as_millis()
        );

        self.sort = Some((field.id.clone(), direction));
        self.apply_filters();
        Ok(())
    }

    /// Filter a column by expression; a blank expression removes the filter.
    pub fn set_filter(&mut self, column: &str, expression: &str) -> Result<(), VotvError> {
        let field = self.field(column)?;
        let filter = ValueFilter::parse(expression);
        if filter.is_blank() {
            self.filters.remove(&field.id);
        } else {
            self.filters.insert(field.id.clone(), filter);
        }
        self.apply_filters();
        Ok(())
    }

    pub fn clear_filter(&mut self, column: &str) {
        if self.filters.remove(column).is_some() {
            self.apply_filters();
        }
    }

    fn apply_filters(&mut self) {
        if self.filters.is_empty() {
            self.rows = self.order.clone();
            return;
        }

        let start_time = Instant::now();
        let data = self.table.rows();
        let filters = &self.filters;
        self.rows = self
            .order
            .par_iter()
            .copied()
            .filter(|&idx| Self::row_matches(&data[idx], filters))
            .collect();

        trace!(
            "Filter kept {} of {} rows in {}ms",
            self.rows.len(),
            self.order.len(),
            start_time.elapsed().as_millis()
        );
    }

    fn row_matches(row: &Row, filters: &BTreeMap<String, ValueFilter>) -> bool {
        filters.iter().all(|(column, filter)| match row.value(column) {
            Some(value) => filter.matches(value),
            None => filter.matches(&CellValue::Text(String::new())),
        })
    }

    /// Set up the view from viewer options. Unknown columns are skipped.
    pub fn apply_options(&mut self, options: &ViewerOptions) {
        if !options.default_column_ids.is_empty() {
            self.columns = options
                .default_column_ids
                .iter()
                .filter_map(|id| {
                    let idx = self.table.metadata.field_index(id);
                    if idx.is_none() {
                        warn!("Ignoring unknown column {id}");
                    }
                    idx
                })
                .collect();
        }

        for (id, column) in &options.column_options {
            if let Some(width) = column.width {
                self.widths.insert(id.clone(), width);
            }
            if let Some(unit) = column.unit() {
                self.units.insert(id.clone(), unit.to_string());
            }
        }

        for (id, expression) in &options.column_filters {
            if let Err(e) = self.set_filter(id, expression) {
                warn!("Ignoring filter on {id}: {e}");
            }
        }

        if let Some(column) = &options.sort_column {
            let direction = options.sort_dir.unwrap_or(SortDirection::Asc);
            if let Err(e) = self.sort(column, direction) {
                warn!("Ignoring sort: {e}");
            }
        }
        debug!(
            "Applied viewer options, {} rows and {} columns visible",
            self.rows.len(),
            self.columns.len()
        );
    }

    pub fn set_width(&mut self, column: &str, width: u32) {
        self.widths.insert(column.to_string(), width);
    }

    pub fn sort_state(&self) -> Option<(&str, SortDirection)> {
        self.sort.as_ref().map(|(c, d)| (c.as_str(), *d))
    }

    pub fn table(&self) -> &'t Table {
        self.table
    }

    pub fn rows(&self) -> impl Iterator<Item = &'t Row> + '_ {
        let data = self.table.rows();
        self.rows.iter().map(move |&idx| &data[idx])
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn columns(&self) -> Vec<&'t Field> {
        let fields = self.table.fields();
        self.columns.iter().map(|&idx| &fields[idx]).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// URL of the current view state on top of `base_url`.
    pub fn result_state_url(&self, base_url: &str) -> String {
        let (sort_column, sort_direction) = match &self.sort {
            Some((column, direction)) => (Some(column.clone()), Some(*direction)),
            None => (None, None),
        };
        ResultStateSerializer::new(
            base_url,
            sort_column,
            sort_direction,
            self.columns().iter().map(|f| f.id.clone()).collect(),
            self.widths.clone(),
            self.filters
                .iter()
                .map(|(id, f)| (id.clone(), f.expression().trim().to_string()))
                .collect(),
            self.units.clone(),
        )
        .result_state_url()
    }
}
