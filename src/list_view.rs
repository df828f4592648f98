use std::collections::HashMap;

use crate::columns::{CellValue, ColumnDescriptor, ColumnOptions, RenderContext, columns_for};
use crate::error::{ApiError, error_message};
use crate::model::{ResourceId, ResourceKind};
use crate::resource::ResourceModel;
use crate::sort::{self, SortDirection};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub id: &'static str,
    pub label: String,
    pub relative_width: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: ResourceId,
    pub cells: Vec<CellValue>,
}

impl TableRow {
    pub fn matches_filter(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }

        let query_lower = query.to_lowercase();
        if self.id.name.to_lowercase().contains(&query_lower) {
            return true;
        }

        if let Some(namespace) = &self.id.namespace
            && namespace.to_lowercase().contains(&query_lower)
        {
            return true;
        }

        self.cells
            .iter()
            .any(|cell| cell.display().to_lowercase().contains(&query_lower))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableView {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<TableRow>,
    pub error: Option<String>,
}

impl TableView {
    pub fn position_of(&self, id: &ResourceId) -> Option<usize> {
        self.rows.iter().position(|row| &row.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct ListView {
    kind: ResourceKind,
    columns: Vec<ColumnDescriptor>,
    sort: Option<SortState>,
    filter: String,
    toggles: HashMap<&'static str, bool>,
    selected: usize,
    selected_id: Option<ResourceId>,
}

impl ListView {
    pub fn new(kind: ResourceKind, options: &ColumnOptions) -> Self {
        Self {
            kind,
            columns: columns_for(kind, options),
            sort: None,
            filter: String::new(),
            toggles: HashMap::new(),
            selected: 0,
            selected_id: None,
        }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.selected = 0;
        self.selected_id = None;
    }

    pub fn set_column_options(&mut self, options: &ColumnOptions) {
        self.columns = columns_for(self.kind, options);
        let columns = &self.columns;
        self.toggles
            .retain(|id, _| columns.iter().any(|column| column.id == *id));
        let stale = self
            .sort
            .as_ref()
            .is_some_and(|sort| self.find_column(&sort.column).is_none());
        if stale {
            self.sort = None;
        }
    }

    pub fn column_visible(&self, column: &ColumnDescriptor) -> bool {
        self.toggles
            .get(column.id)
            .copied()
            .unwrap_or(column.visible_by_default)
    }

    pub fn visible_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|column| self.column_visible(column))
            .collect()
    }

    pub fn toggle_column(&mut self, column_id: &str) -> Option<bool> {
        let column = self.find_column(column_id)?;
        let id = column.id;
        let visible = !self.column_visible(column);
        self.toggles.insert(id, visible);
        Some(visible)
    }

    pub fn set_sort(&mut self, column_id: &str, direction: SortDirection) -> bool {
        let Some(column) = self.find_column(column_id) else {
            return false;
        };
        if !column.sortable() {
            return false;
        }

        self.sort = Some(SortState {
            column: column.id.to_string(),
            direction,
        });
        true
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    pub fn cycle_sort(&mut self, column_id: &str) -> bool {
        let Some(column) = self.find_column(column_id) else {
            return false;
        };
        let id = column.id;

        let current = self
            .sort
            .as_ref()
            .filter(|sort| sort.column == id)
            .map(|sort| sort.direction);
        match current {
            Some(SortDirection::Ascending) => self.set_sort(id, SortDirection::Descending),
            Some(SortDirection::Descending) => {
                self.clear_sort();
                true
            }
            None => self.set_sort(id, SortDirection::Ascending),
        }
    }

    pub fn sort_next_column(&mut self) -> Option<&'static str> {
        let sortable: Vec<&'static str> = self
            .visible_columns()
            .into_iter()
            .filter(|column| column.sortable())
            .map(|column| column.id)
            .collect();
        if sortable.is_empty() {
            return None;
        }

        let next = self
            .sort
            .as_ref()
            .and_then(|sort| sortable.iter().position(|id| *id == sort.column))
            .map(|index| (index + 1) % sortable.len())
            .unwrap_or(0);
        let id = sortable[next];
        self.set_sort(id, SortDirection::Ascending);
        Some(id)
    }

    pub fn reverse_sort(&mut self) {
        if let Some(sort) = self.sort.as_mut() {
            sort.direction = match sort.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        }
    }

    pub fn render(
        &self,
        snapshot: Option<&[ResourceModel]>,
        error: Option<&ApiError>,
        context: &RenderContext,
    ) -> TableView {
        let visible = self.visible_columns();
        let headers = visible
            .iter()
            .map(|column| HeaderCell {
                id: column.id,
                label: self.header_label(column),
                relative_width: column.relative_width,
            })
            .collect();

        if let Some(message) = error_message(self.kind, error) {
            return TableView {
                headers,
                rows: Vec::new(),
                error: Some(message),
            };
        }

        let models = snapshot.unwrap_or(&[]);
        let ordered: Vec<&ResourceModel> = match &self.sort {
            Some(state) => sort::sort(models, &self.columns, &state.column, state.direction, context),
            None => models.iter().collect(),
        };

        let rows = ordered
            .into_iter()
            .map(|model| TableRow {
                id: model.id().clone(),
                cells: visible
                    .iter()
                    .map(|column| column.cell(model, context))
                    .collect(),
            })
            .filter(|row| row.matches_filter(&self.filter))
            .collect();

        TableView {
            headers,
            rows,
            error: None,
        }
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_row<'a>(&self, table: &'a TableView) -> Option<&'a TableRow> {
        table.rows.get(self.selected)
    }

    pub fn move_cursor(&mut self, table: &TableView, delta: isize) {
        if table.rows.is_empty() {
            self.selected = 0;
            self.selected_id = None;
            return;
        }

        let max_index = table.rows.len().saturating_sub(1) as isize;
        let current = self.selected.min(max_index as usize) as isize;
        self.place_cursor(table, (current + delta).clamp(0, max_index) as usize);
    }

    pub fn select_first(&mut self, table: &TableView) {
        self.place_cursor(table, 0);
    }

    pub fn select_last(&mut self, table: &TableView) {
        self.place_cursor(table, table.rows.len().saturating_sub(1));
    }

    pub fn select_id(&mut self, table: &TableView, id: &ResourceId) -> bool {
        match table.position_of(id) {
            Some(index) => {
                self.place_cursor(table, index);
                true
            }
            None => false,
        }
    }

    /// Re-anchors the cursor after a snapshot replacement: the same resource
    /// when it is still listed, otherwise the same position clamped to the
    /// new length.
    pub fn sync_cursor(&mut self, table: &TableView) {
        if let Some(id) = self.selected_id.clone()
            && let Some(index) = table.position_of(&id)
        {
            self.selected = index;
            return;
        }

        self.place_cursor(table, self.selected);
    }

    fn place_cursor(&mut self, table: &TableView, index: usize) {
        self.selected = index.min(table.rows.len().saturating_sub(1));
        self.selected_id = table.rows.get(self.selected).map(|row| row.id.clone());
    }

    fn find_column(&self, column_id: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|column| column.id.eq_ignore_ascii_case(column_id))
    }

    fn header_label(&self, column: &ColumnDescriptor) -> String {
        match &self.sort {
            Some(sort) if sort.column == column.id => {
                format!("{} {}", column.label, sort.direction.indicator())
            }
            _ => column.label.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ListView;
    use crate::columns::{ColumnOptions, RenderContext};
    use crate::error::ApiError;
    use crate::model::{ResourceId, ResourceKind};
    use crate::resource::fixtures::{deployment, pod};
    use crate::sort::SortDirection;
    use serde_json::json;

    fn context() -> RenderContext {
        RenderContext::new("prod", true)
    }

    fn names(view: &super::TableView) -> Vec<String> {
        view.rows.iter().map(|row| row.id.name.clone()).collect()
    }

    #[test]
    fn absent_snapshot_renders_empty_table() {
        let list = ListView::new(ResourceKind::Pods, &ColumnOptions::default());
        let view = list.render(None, None, &context());
        assert!(view.rows.is_empty());
        assert!(view.error.is_none());
        assert_eq!(view.headers[0].label, "Name");
        assert!(view.headers.iter().all(|header| header.id != "nominatedNode"));
    }

    #[test]
    fn transport_error_replaces_rows_with_message() {
        let list = ListView::new(ResourceKind::Pods, &ColumnOptions::default());
        let rows = vec![pod("web", json!({ "phase": "Running" }))];
        let error = ApiError::new(Some(403), "forbidden");
        let view = list.render(Some(&rows), Some(&error), &context());
        assert!(view.rows.is_empty());
        assert_eq!(
            view.error.as_deref(),
            Some("Error: No permissions to list pods")
        );
    }

    #[test]
    fn sort_cycles_and_marks_header() {
        let mut list = ListView::new(ResourceKind::Deployments, &ColumnOptions::default());
        let rows = vec![
            deployment("three", Some(3), Some(1)),
            deployment("two", Some(2), Some(1)),
        ];

        assert!(list.cycle_sort("pods"));
        let view = list.render(Some(&rows), None, &context());
        assert_eq!(names(&view), vec!["two", "three"]);
        assert!(view.headers.iter().any(|header| header.label == "Pods ▲"));

        assert!(list.cycle_sort("pods"));
        let view = list.render(Some(&rows), None, &context());
        assert_eq!(names(&view), vec!["three", "two"]);

        assert!(list.cycle_sort("pods"));
        assert!(list.sort_state().is_none());
        assert!(!list.cycle_sort("conditions"));
        assert!(!list.set_sort("nope", SortDirection::Ascending));
    }

    #[test]
    fn toggles_layer_over_default_visibility() {
        let mut list = ListView::new(ResourceKind::Deployments, &ColumnOptions::default());
        assert_eq!(list.toggle_column("Selector"), Some(true));
        assert_eq!(list.toggle_column("images"), Some(false));
        assert_eq!(list.toggle_column("unknown"), None);

        let ids: Vec<&str> = list.visible_columns().iter().map(|column| column.id).collect();
        assert!(ids.contains(&"selector"));
        assert!(!ids.contains(&"images"));
    }

    #[test]
    fn filter_matches_rendered_cells() {
        let mut list = ListView::new(ResourceKind::Deployments, &ColumnOptions::default());
        let rows = vec![deployment("api", Some(1), Some(1)), deployment("web", Some(1), Some(1))];
        list.set_filter("WEB:LATEST");
        let view = list.render(Some(&rows), None, &context());
        assert_eq!(names(&view), vec!["web"]);
    }

    #[test]
    fn cursor_follows_identity_across_snapshots() {
        let mut list = ListView::new(ResourceKind::Deployments, &ColumnOptions::default());
        let first = vec![
            deployment("a", Some(1), Some(1)),
            deployment("b", Some(1), Some(1)),
            deployment("c", Some(1), Some(1)),
        ];
        let view = list.render(Some(&first), None, &context());
        list.move_cursor(&view, 1);
        assert_eq!(list.selected_row(&view).map(|row| row.id.name.as_str()), Some("b"));

        let second = vec![deployment("b", Some(1), Some(1)), deployment("c", Some(1), Some(1))];
        let view = list.render(Some(&second), None, &context());
        list.sync_cursor(&view);
        assert_eq!(list.selected_index(), 0);

        let third = vec![deployment("z", Some(1), Some(1))];
        let view = list.render(Some(&third), None, &context());
        list.sync_cursor(&view);
        assert_eq!(list.selected_index(), 0);
        assert!(list.select_id(
            &view,
            &ResourceId::new(ResourceKind::Deployments, Some("default"), "z")
        ));
    }
}
