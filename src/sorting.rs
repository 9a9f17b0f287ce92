use crate::record::{Record, compare_fields};
use serde::{Deserialize, Serialize};

/// The active column and direction governing a list view's ordering.
///
/// Every table view owns one of these and passes it into [`sort_records`];
/// the state itself lives outside the pure function so that the sorting
/// logic stays testable without a rendering environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Field name to sort by; `None` keeps the collection's original order.
    pub column: Option<String>,

    /// `true` for ascending, `false` for descending.
    pub ascending: bool,
}

impl SortState {
    /// State with no active column: the fetched order is kept as-is.
    pub fn unsorted() -> Self {
        SortState {
            column: None,
            ascending: true,
        }
    }

    /// State with a default column already active.
    ///
    /// # Examples
    /// ```
    /// use storage_app::sorting::SortState;
    ///
    /// // Log views start sorted by id, newest first.
    /// let state = SortState::by("id", false);
    /// assert_eq!(state.column.as_deref(), Some("id"));
    /// assert!(!state.ascending);
    /// ```
    pub fn by(column: &str, ascending: bool) -> Self {
        SortState {
            column: Some(column.to_string()),
            ascending,
        }
    }

    /// Apply one header click.
    ///
    /// Clicking the already-active column flips the direction; clicking any
    /// other column makes it active with ascending direction.
    pub fn toggle(&mut self, column: &str) {
        if self.column.as_deref() == Some(column) {
            self.ascending = !self.ascending;
        } else {
            self.column = Some(column.to_string());
            self.ascending = true;
        }
    }

    /// Whether the given column should render a direction indicator.
    pub fn is_active(&self, column: &str) -> bool {
        self.column.as_deref() == Some(column)
    }
}

/// Produce a sorted copy of `records` according to `state`.
///
/// The input is never mutated and the output is always a permutation of the
/// input. The sort is stable: records with equal keys keep their relative
/// fetched order, in both directions. A record missing the sort column
/// compares as minimal rather than erroring, so a column name that matches
/// no record at all simply yields the original order.
///
/// # Arguments
/// * `records` - the fetched collection, in insertion order
/// * `state` - active column and direction
///
/// # Returns
/// * `Vec<Record>` - the derived ordering; same records, never fewer or more
pub fn sort_records(records: &[Record], state: &SortState) -> Vec<Record> {
    let mut sorted: Vec<Record> = records.to_vec();

    let Some(column) = state.column.as_deref() else {
        return sorted;
    };

    sorted.sort_by(|a, b| {
        let ordering = compare_fields(a.get(column), b.get(column));
        if state.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn products() -> Vec<Record> {
        [
            json!({"id": 1, "name": "Bolt", "quantity": 5}),
            json!({"id": 2, "name": "Nut", "quantity": 9}),
            json!({"id": 3, "name": "Washer", "quantity": 5}),
            json!({"id": 4, "name": "Anchor", "quantity": 2}),
        ]
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    fn names(records: &[Record]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r.get("name").and_then(|v| v.as_str()).unwrap_or(""))
            .collect()
    }

    #[test]
    fn ascending_by_name() {
        let sorted = sort_records(&products(), &SortState::by("name", true));
        assert_eq!(names(&sorted), ["Anchor", "Bolt", "Nut", "Washer"]);
    }

    #[test]
    fn descending_reverses_ascending() {
        let records = products();
        let asc = sort_records(&records, &SortState::by("name", true));
        let desc = sort_records(&records, &SortState::by("name", false));
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
    }

    #[test]
    fn sort_is_a_permutation() {
        let records = products();
        let sorted = sort_records(&records, &SortState::by("quantity", true));
        assert_eq!(sorted.len(), records.len());
        for record in &records {
            assert_eq!(
                sorted.iter().filter(|r| *r == record).count(),
                records.iter().filter(|r| *r == record).count(),
            );
        }
    }

    #[test]
    fn equal_keys_keep_fetched_order() {
        // Bolt and Washer both have quantity 5; Bolt was fetched first.
        let records = products();
        let asc = sort_records(&records, &SortState::by("quantity", true));
        assert_eq!(names(&asc), ["Anchor", "Bolt", "Washer", "Nut"]);
        let desc = sort_records(&records, &SortState::by("quantity", false));
        assert_eq!(names(&desc), ["Nut", "Bolt", "Washer", "Anchor"]);
    }

    #[test]
    fn sorting_sorted_input_is_idempotent() {
        let once = sort_records(&products(), &SortState::by("name", true));
        let twice = sort_records(&once, &SortState::by("name", true));
        assert_eq!(once, twice);
    }

    #[test]
    fn no_active_column_keeps_original_order() {
        let records = products();
        assert_eq!(sort_records(&records, &SortState::unsorted()), records);
    }

    #[test]
    fn unknown_column_keeps_original_order() {
        let records = products();
        let sorted = sort_records(&records, &SortState::by("no_such_field", true));
        assert_eq!(sorted, records);
    }

    #[test]
    fn missing_field_sorts_first_ascending() {
        let mut records = products();
        records[1].remove("quantity");
        let sorted = sort_records(&records, &SortState::by("quantity", true));
        assert_eq!(names(&sorted), ["Nut", "Anchor", "Bolt", "Washer"]);
    }

    #[test]
    fn toggle_follows_the_header_protocol() {
        let mut state = SortState::unsorted();

        state.toggle("name");
        assert_eq!(state, SortState::by("name", true));

        state.toggle("name");
        assert_eq!(state, SortState::by("name", false));

        // Switching columns resets the direction to ascending.
        state.toggle("quantity");
        assert_eq!(state, SortState::by("quantity", true));
    }

    #[test]
    fn header_click_scenario() {
        // Click "Name" once, again, then "Quantity" - the end-to-end walk
        // of the header protocol over a two-product collection.
        let records: Vec<Record> = [
            json!({"id": 1, "name": "Bolt", "quantity": 5}),
            json!({"id": 2, "name": "Nut", "quantity": 9}),
        ]
        .iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let mut state = SortState::unsorted();

        state.toggle("name");
        assert_eq!(names(&sort_records(&records, &state)), ["Bolt", "Nut"]);

        state.toggle("name");
        assert_eq!(names(&sort_records(&records, &state)), ["Nut", "Bolt"]);

        state.toggle("quantity");
        assert!(state.ascending);
        let by_quantity = sort_records(&records, &state);
        assert_eq!(names(&by_quantity), ["Bolt", "Nut"]);
    }

    #[test]
    fn indicator_only_on_active_column() {
        let state = SortState::by("name", true);
        assert!(state.is_active("name"));
        assert!(!state.is_active("quantity"));
    }
}
