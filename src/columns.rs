use std::cmp::Ordering;
use std::collections::HashSet;

use k8s_openapi::jiff::Timestamp;

use crate::model::{Condition, ResourceId, ResourceKind};
use crate::resource::{ResourceModel, age_label};
use crate::route::ListRoute;
use crate::sort::locale_compare;
use crate::status::{
    self, StatusSummary, compare_readiness_gates, compare_replica_availability,
};

/// Capabilities a getter may depend on. Passed in per render, never read from
/// global state.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub cluster: String,
    pub drawer_enabled: bool,
    pub now: Timestamp,
}

impl RenderContext {
    pub fn new(cluster: impl Into<String>, drawer_enabled: bool) -> Self {
        Self {
            cluster: cluster.into(),
            drawer_enabled,
            now: Timestamp::now(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NameLink {
    pub id: ResourceId,
    pub route: String,
    pub opens_drawer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(i64),
    Annotated { value: i64, note: Option<String> },
    Ratio { ready: i64, total: i64 },
    Status(StatusSummary),
    Badges(Vec<Condition>),
    List(Vec<String>),
    Link(NameLink),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Number(value) => value.to_string(),
            Self::Annotated { value, note } => match note {
                Some(note) => format!("{value} ({note})"),
                None => value.to_string(),
            },
            Self::Ratio { ready, total } => format!("{ready}/{total}"),
            Self::Status(summary) => summary.reason.clone(),
            Self::Badges(conditions) => conditions
                .iter()
                .map(|condition| condition.type_.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            Self::List(values) => values.join(", "),
            Self::Link(link) => link.id.name.clone(),
        }
    }

    fn numeric(&self) -> Option<(i64, i64)> {
        match self {
            Self::Empty => Some((0, 0)),
            Self::Number(value) | Self::Annotated { value, .. } => Some((*value, 0)),
            Self::Ratio { ready, total } => Some((*ready, *total)),
            _ => None,
        }
    }

    /// Primitive comparison used when a column sorts by its own value. Numbers
    /// compare numerically with empty cells as zero; everything else compares
    /// its rendered text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(left), Some(right)) => left.cmp(&right),
            _ => locale_compare(&self.display(), &other.display()),
        }
    }
}

pub type Getter = fn(&ResourceModel, &RenderContext) -> CellValue;
pub type Comparator = fn(&ResourceModel, &ResourceModel) -> Ordering;

#[derive(Debug, Clone, Copy)]
pub enum SortSpec {
    None,
    ByValue,
    Comparator(Comparator),
}

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub getter: Getter,
    pub sort: SortSpec,
    pub visible_by_default: bool,
    pub relative_width: Option<f32>,
}

impl ColumnDescriptor {
    fn new(id: &'static str, label: &'static str, getter: Getter) -> Self {
        Self {
            id,
            label,
            getter,
            sort: SortSpec::ByValue,
            visible_by_default: true,
            relative_width: None,
        }
    }

    fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    fn hidden(mut self) -> Self {
        self.visible_by_default = false;
        self
    }

    fn width(mut self, width: f32) -> Self {
        self.relative_width = Some(width);
        self
    }

    pub fn cell(&self, model: &ResourceModel, context: &RenderContext) -> CellValue {
        (self.getter)(model, context)
    }

    pub fn sortable(&self) -> bool {
        !matches!(self.sort, SortSpec::None)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BuiltinColumn {
    Name,
    Namespace,
    Age,
}

#[derive(Debug, Clone)]
pub enum Column {
    Builtin(BuiltinColumn),
    Custom(ColumnDescriptor),
}

impl Column {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Builtin(BuiltinColumn::Name) => "name",
            Self::Builtin(BuiltinColumn::Namespace) => "namespace",
            Self::Builtin(BuiltinColumn::Age) => "age",
            Self::Custom(descriptor) => descriptor.id,
        }
    }

    pub fn resolve(self) -> ColumnDescriptor {
        match self {
            Self::Builtin(BuiltinColumn::Name) => ColumnDescriptor::new("name", "Name", name_cell),
            Self::Builtin(BuiltinColumn::Namespace) => {
                ColumnDescriptor::new("namespace", "Namespace", namespace_cell)
            }
            Self::Builtin(BuiltinColumn::Age) => ColumnDescriptor::new("age", "Age", age_cell)
                .sort(SortSpec::Comparator(compare_age)),
            Self::Custom(descriptor) => descriptor,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnOptions {
    pub hidden: HashSet<String>,
}

impl ColumnOptions {
    fn hides(&self, id: &str) -> bool {
        self.hidden.iter().any(|hidden| hidden.eq_ignore_ascii_case(id))
    }
}

pub fn columns_for(kind: ResourceKind, options: &ColumnOptions) -> Vec<ColumnDescriptor> {
    let columns = match kind {
        ResourceKind::Pods => pod_columns(options),
        ResourceKind::Deployments => deployment_columns(),
        ResourceKind::ReplicaSets => replicaset_columns(),
        ResourceKind::Namespaces => vec![
            Column::Builtin(BuiltinColumn::Name),
            Column::Custom(ColumnDescriptor::new("status", "Status", status_cell)),
            Column::Builtin(BuiltinColumn::Age),
        ],
        ResourceKind::PriorityClasses => priority_class_columns(),
    };

    columns
        .into_iter()
        .filter(|column| !options.hides(column.id()))
        .map(Column::resolve)
        .collect()
}

fn pod_columns(options: &ColumnOptions) -> Vec<Column> {
    let mut columns = vec![
        Column::Builtin(BuiltinColumn::Name),
        Column::Custom(
            ColumnDescriptor::new("ready", "Ready", pod_ready_cell).sort(SortSpec::None),
        ),
        Column::Custom(ColumnDescriptor::new("status", "Status", status_cell)),
        Column::Custom(ColumnDescriptor::new("ip", "IP", |model, _| {
            optional_text(model.pod_ip())
        })),
        Column::Custom(ColumnDescriptor::new("node", "Node", |model, _| {
            optional_text(model.node_name())
        })),
        Column::Custom(
            ColumnDescriptor::new("nominatedNode", "Nominated Node", |model, _| {
                optional_text(model.nominated_node_name())
            })
            .hidden(),
        ),
        Column::Custom(
            ColumnDescriptor::new("readinessGates", "Readiness Gates", readiness_gates_cell)
                .sort(SortSpec::Comparator(compare_readiness_gates))
                .hidden(),
        ),
        Column::Builtin(BuiltinColumn::Age),
    ];

    let mut insert_index = 1;
    if !options.hides("namespace") {
        columns.insert(insert_index, Column::Builtin(BuiltinColumn::Namespace));
        insert_index += 1;
    }
    if !options.hides("restarts") {
        columns.insert(
            insert_index,
            Column::Custom(ColumnDescriptor::new("restarts", "Restarts", restarts_cell)),
        );
    }

    columns
}

fn deployment_columns() -> Vec<Column> {
    vec![
        Column::Builtin(BuiltinColumn::Name),
        Column::Builtin(BuiltinColumn::Namespace),
        Column::Custom(
            ColumnDescriptor::new("pods", "Pods", |model, _| CellValue::Ratio {
                ready: i64::from(model.available_replicas()),
                total: i64::from(model.status_replicas()),
            })
            .sort(SortSpec::Comparator(compare_replica_availability))
            .width(0.5),
        ),
        Column::Custom(
            ColumnDescriptor::new("replicas", "Replicas", |model, _| {
                CellValue::Number(i64::from(model.spec_replicas()))
            })
            .width(0.6),
        ),
        Column::Custom(
            ColumnDescriptor::new("conditions", "Conditions", |model, _| {
                CellValue::Badges(status::condition_badges(model))
            })
            .sort(SortSpec::None),
        ),
        containers_column().unsortable(),
        images_column().unsortable(),
        selector_column().unsortable().hidden_column(),
        Column::Builtin(BuiltinColumn::Age),
    ]
}

fn replicaset_columns() -> Vec<Column> {
    vec![
        Column::Builtin(BuiltinColumn::Name),
        Column::Builtin(BuiltinColumn::Namespace),
        Column::Custom(
            ColumnDescriptor::new("generation", "Generation", |model, _| {
                model
                    .observed_generation()
                    .map(CellValue::Number)
                    .unwrap_or(CellValue::Empty)
            })
            .hidden(),
        ),
        Column::Custom(
            ColumnDescriptor::new("currentReplicas", "Current", |model, _| {
                CellValue::Number(i64::from(model.status_replicas()))
            })
            .width(0.6),
        ),
        Column::Custom(
            ColumnDescriptor::new("desiredReplicas", "Desired", |model, _| {
                CellValue::Number(i64::from(model.spec_replicas()))
            })
            .width(0.6),
        ),
        Column::Custom(
            ColumnDescriptor::new("readyReplicas", "Ready", |model, _| {
                CellValue::Number(i64::from(model.ready_replicas()))
            })
            .width(0.6),
        ),
        containers_column(),
        images_column(),
        selector_column(),
        Column::Builtin(BuiltinColumn::Age),
    ]
}

fn priority_class_columns() -> Vec<Column> {
    vec![
        Column::Builtin(BuiltinColumn::Name),
        Column::Custom(ColumnDescriptor::new("value", "Value", |model, _| {
            model
                .priority_value()
                .map(|value| CellValue::Number(i64::from(value)))
                .unwrap_or(CellValue::Empty)
        })),
        Column::Custom(ColumnDescriptor::new(
            "globalDefault",
            "Global Default",
            |model, _| {
                let label = if model.global_default().unwrap_or(false) {
                    "True"
                } else {
                    "False"
                };
                CellValue::Text(label.to_string())
            },
        )),
        Column::Custom(
            ColumnDescriptor::new("preemptionPolicy", "Preemption Policy", |model, _| {
                optional_text(model.preemption_policy())
            })
            .hidden(),
        ),
        Column::Builtin(BuiltinColumn::Age),
    ]
}

fn containers_column() -> Column {
    Column::Custom(ColumnDescriptor::new("containers", "Containers", |model, _| {
        CellValue::List(model.container_names())
    }))
}

fn images_column() -> Column {
    Column::Custom(ColumnDescriptor::new("images", "Images", |model, _| {
        CellValue::List(model.container_images())
    }))
}

fn selector_column() -> Column {
    Column::Custom(ColumnDescriptor::new("selector", "Selector", |model, _| {
        CellValue::List(model.match_labels_list())
    }))
}

impl Column {
    fn hidden_column(self) -> Self {
        match self {
            Self::Custom(descriptor) => Self::Custom(descriptor.hidden()),
            builtin => builtin,
        }
    }

    fn unsortable(self) -> Self {
        match self {
            Self::Custom(descriptor) => Self::Custom(descriptor.sort(SortSpec::None)),
            builtin => builtin,
        }
    }
}

fn name_cell(model: &ResourceModel, context: &RenderContext) -> CellValue {
    let route = ListRoute::new(context.cluster.clone(), model.kind());
    CellValue::Link(NameLink {
        id: model.id().clone(),
        route: route.resource_path(model.id()),
        opens_drawer: context.drawer_enabled,
    })
}

fn namespace_cell(model: &ResourceModel, _: &RenderContext) -> CellValue {
    optional_text(model.namespace())
}

fn age_cell(model: &ResourceModel, context: &RenderContext) -> CellValue {
    CellValue::Text(age_label(model.creation_timestamp(), context.now))
}

/// Ascending age means newest first; a missing timestamp counts as the epoch.
fn compare_age(left: &ResourceModel, right: &ResourceModel) -> Ordering {
    let seconds = |model: &ResourceModel| {
        model
            .creation_timestamp()
            .map(|timestamp| timestamp.as_second())
            .unwrap_or(0)
    };
    seconds(right).cmp(&seconds(left))
}

fn status_cell(model: &ResourceModel, _: &RenderContext) -> CellValue {
    CellValue::Status(status::derive(model))
}

fn pod_ready_cell(model: &ResourceModel, _: &RenderContext) -> CellValue {
    let detailed = model.detailed_status();
    CellValue::Ratio {
        ready: detailed.ready_containers as i64,
        total: detailed.total_containers as i64,
    }
}

fn restarts_cell(model: &ResourceModel, context: &RenderContext) -> CellValue {
    let detailed = model.detailed_status();
    CellValue::Annotated {
        value: i64::from(detailed.restarts),
        note: detailed
            .last_restart
            .map(|restarted| format!("{} ago", age_label(Some(restarted), context.now))),
    }
}

fn readiness_gates_cell(model: &ResourceModel, _: &RenderContext) -> CellValue {
    status::readiness_gates(model)
        .map(|ratio| CellValue::Ratio {
            ready: ratio.ready as i64,
            total: ratio.total as i64,
        })
        .unwrap_or(CellValue::Empty)
}

fn optional_text(value: Option<&str>) -> CellValue {
    value
        .filter(|value| !value.is_empty())
        .map(|value| CellValue::Text(value.to_string()))
        .unwrap_or(CellValue::Empty)
}
