use std::cmp::Ordering;

use crate::columns::{CellValue, ColumnDescriptor, RenderContext, SortSpec};
use crate::resource::ResourceModel;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Case-folded comparison with an exact tie-break, so `apple < Banana < cherry`
/// while distinct strings never compare equal.
pub fn locale_compare(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

/// Stable ordering of `rows` by one column. Unknown or unsortable columns keep
/// the input order. Descending reverses the comparator, not the output, so
/// equal rows keep their relative order in both directions.
pub fn sort<'a>(
    rows: &'a [ResourceModel],
    columns: &[ColumnDescriptor],
    column_id: &str,
    direction: SortDirection,
    context: &RenderContext,
) -> Vec<&'a ResourceModel> {
    let mut ordered: Vec<&ResourceModel> = rows.iter().collect();
    let Some(column) = columns
        .iter()
        .find(|column| column.id.eq_ignore_ascii_case(column_id))
    else {
        return ordered;
    };

    match column.sort {
        SortSpec::None => {}
        SortSpec::Comparator(compare) => {
            ordered.sort_by(|left, right| direction.apply(compare(left, right)));
        }
        SortSpec::ByValue => {
            let mut keyed: Vec<(CellValue, &ResourceModel)> = ordered
                .into_iter()
                .map(|model| (column.cell(model, context), model))
                .collect();
            keyed.sort_by(|(left, _), (right, _)| direction.apply(left.compare(right)));
            ordered = keyed.into_iter().map(|(_, model)| model).collect();
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::{SortDirection, locale_compare, sort};
    use crate::columns::{ColumnOptions, RenderContext, columns_for};
    use crate::model::ResourceKind;
    use crate::resource::ResourceModel;
    use crate::resource::fixtures::{deployment, model};
    use k8s_openapi::jiff::Timestamp;
    use proptest::prelude::*;
    use serde_json::json;
    use std::cmp::Ordering;

    fn context() -> RenderContext {
        RenderContext {
            cluster: "prod".to_string(),
            drawer_enabled: true,
            now: "2024-06-01T00:00:00Z".parse::<Timestamp>().unwrap(),
        }
    }

    fn names(rows: &[&ResourceModel]) -> Vec<String> {
        rows.iter().map(|row| row.name().to_string()).collect()
    }

    fn priority_class(name: &str, value: i32, created: &str) -> ResourceModel {
        model(
            ResourceKind::PriorityClasses,
            json!({
                "apiVersion": "scheduling.k8s.io/v1",
                "kind": "PriorityClass",
                "metadata": { "name": name, "creationTimestamp": created },
                "value": value
            }),
        )
    }

    #[test]
    fn pods_column_uses_availability_comparator() {
        let rows = vec![
            deployment("three", Some(3), Some(1)),
            deployment("two", Some(2), Some(1)),
            deployment("zero", None, None),
        ];
        let columns = columns_for(ResourceKind::Deployments, &ColumnOptions::default());

        let ascending = sort(&rows, &columns, "pods", SortDirection::Ascending, &context());
        assert_eq!(names(&ascending), vec!["zero", "two", "three"]);

        let descending = sort(&rows, &columns, "pods", SortDirection::Descending, &context());
        assert_eq!(names(&descending), vec!["three", "two", "zero"]);
    }

    #[test]
    fn value_columns_compare_numbers_and_text() {
        let rows = vec![
            priority_class("beta", 100, "2024-01-01T00:00:00Z"),
            priority_class("Alpha", 2_000, "2024-03-01T00:00:00Z"),
            priority_class("gamma", -5, "2024-02-01T00:00:00Z"),
        ];
        let columns = columns_for(ResourceKind::PriorityClasses, &ColumnOptions::default());

        let by_value = sort(&rows, &columns, "value", SortDirection::Ascending, &context());
        assert_eq!(names(&by_value), vec!["gamma", "beta", "Alpha"]);

        let by_name = sort(&rows, &columns, "name", SortDirection::Ascending, &context());
        assert_eq!(names(&by_name), vec!["Alpha", "beta", "gamma"]);

        let by_age = sort(&rows, &columns, "age", SortDirection::Ascending, &context());
        assert_eq!(names(&by_age), vec!["Alpha", "gamma", "beta"]);
    }

    #[test]
    fn unknown_or_unsortable_columns_keep_input_order() {
        let rows = vec![
            deployment("b", Some(1), Some(1)),
            deployment("a", Some(2), Some(2)),
        ];
        let columns = columns_for(ResourceKind::Deployments, &ColumnOptions::default());
        let unknown = sort(&rows, &columns, "missing", SortDirection::Ascending, &context());
        assert_eq!(names(&unknown), vec!["b", "a"]);
        let conditions = sort(&rows, &columns, "conditions", SortDirection::Descending, &context());
        assert_eq!(names(&conditions), vec!["b", "a"]);
        let images = sort(&rows, &columns, "images", SortDirection::Descending, &context());
        assert_eq!(names(&images), vec!["b", "a"]);
    }

    #[test]
    fn locale_compare_folds_case_first() {
        assert_eq!(locale_compare("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_compare("Apple", "apple"), Ordering::Less);
        assert_eq!(locale_compare("same", "same"), Ordering::Equal);
    }

    fn deployments_strategy() -> impl Strategy<Value = Vec<ResourceModel>> {
        prop::collection::vec((0..4i32, 0..4i32), 0..12).prop_map(|counts| {
            counts
                .into_iter()
                .enumerate()
                .map(|(index, (replicas, available))| {
                    deployment(&format!("d{index}"), Some(replicas), Some(available))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn sorting_is_idempotent(
            rows in deployments_strategy(),
            column in prop::sample::select(vec!["pods", "replicas", "name", "age"]),
            descending in any::<bool>()
        ) {
            let direction = if descending { SortDirection::Descending } else { SortDirection::Ascending };
            let columns = columns_for(ResourceKind::Deployments, &ColumnOptions::default());
            let once: Vec<ResourceModel> = sort(&rows, &columns, column, direction, &context())
                .into_iter()
                .cloned()
                .collect();
            let twice = sort(&once, &columns, column, direction, &context());
            prop_assert_eq!(names(&once.iter().collect::<Vec<_>>()), names(&twice));
        }

        #[test]
        fn equal_keys_keep_input_order(rows in deployments_strategy(), descending in any::<bool>()) {
            let direction = if descending { SortDirection::Descending } else { SortDirection::Ascending };
            let columns = columns_for(ResourceKind::Deployments, &ColumnOptions::default());
            let sorted = sort(&rows, &columns, "pods", direction, &context());
            let position = |name: &str| rows.iter().position(|row| row.name() == name).unwrap();
            for pair in sorted.windows(2) {
                let same_key = pair[0].available_replicas() == pair[1].available_replicas()
                    && pair[0].status_replicas() == pair[1].status_replicas();
                if same_key {
                    prop_assert!(position(pair[0].name()) < position(pair[1].name()));
                }
            }
        }
    }
}
