use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Rendered table: body rows may be reordered, footer rows never are.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub footer: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn push_footer(&mut self, row: Vec<String>) {
        self.footer.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(header))
    }

    pub fn sorted(&self, column: usize, direction: SortDirection) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: sort_rows(&self.rows, column, direction),
            footer: self.footer.clone(),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        if self.rows.is_empty() {
            let _ = writeln!(output, "_No data for the current filters._");
            return output;
        }

        let _ = writeln!(output, "| {} |", self.headers.join(" | "));
        let _ = writeln!(
            output,
            "|{}",
            self.headers.iter().map(|_| "---|").collect::<String>()
        );
        for row in self.rows.iter().chain(self.footer.iter()) {
            let _ = writeln!(output, "| {} |", row.join(" | "));
        }
        output
    }
}

/// Stable reorder of `rows` by one column. Cells missing from a short row sort as empty.
pub fn sort_rows(rows: &[Vec<String>], column: usize, direction: SortDirection) -> Vec<Vec<String>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        let left = a.get(column).map(String::as_str).unwrap_or("");
        let right = b.get(column).map(String::as_str).unwrap_or("");
        match direction {
            SortDirection::Ascending => compare_cells(left, right),
            SortDirection::Descending => compare_cells(right, left),
        }
    });
    sorted
}

/// Numbers compare numerically, text by a Spanish-aware collation. A number
/// sorts before text so the order stays total.
pub fn compare_cells(left: &str, right: &str) -> Ordering {
    match (parse_numeric(left), parse_numeric(right)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => collate(left, right),
    }
}

/// Numeric value of a decorated cell such as `1.234,50€`, `12.5%` or `↓ -3`.
/// A comma marks the decimal separator, in which case dots are grouping.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    let kept: String = cell
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let normalized = if kept.contains(',') {
        kept.replace('.', "").replace(',', ".")
    } else {
        kept
    };
    normalized.parse::<f64>().ok()
}

fn collate(left: &str, right: &str) -> Ordering {
    collation_key(left)
        .cmp(&collation_key(right))
        .then_with(|| left.cmp(right))
}

/// Base letters first, accents only break ties.
fn collation_key(value: &str) -> (Vec<u32>, Vec<u8>) {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            let (base, accent) = match c {
                'á' | 'à' | 'ä' | 'â' => ('a', 1),
                'é' | 'è' | 'ë' | 'ê' => ('e', 1),
                'í' | 'ì' | 'ï' | 'î' => ('i', 1),
                'ó' | 'ò' | 'ö' | 'ô' => ('o', 1),
                'ú' | 'ù' | 'ü' | 'û' => ('u', 1),
                'ç' => ('c', 1),
                // ñ is its own letter, between n and o.
                'ñ' => return (('n' as u32) * 2 + 1, 0),
                other => (other, 0),
            };
            ((base as u32) * 2, accent)
        })
        .unzip()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: usize,
    pub direction: SortDirection,
}

/// Per-table sort selection, keyed by table id.
#[derive(Debug, Clone, Default)]
pub struct TableSorts {
    states: HashMap<String, SortState>,
}

impl TableSorts {
    /// Selecting the active column flips direction; a new column starts ascending.
    pub fn select(&mut self, table: &str, column: usize) -> SortState {
        let next = match self.states.get(table) {
            Some(state) if state.column == column => SortState {
                column,
                direction: state.direction.flipped(),
            },
            _ => SortState {
                column,
                direction: SortDirection::Ascending,
            },
        };
        self.states.insert(table.to_string(), next);
        next
    }

    pub fn current(&self, table: &str) -> Option<SortState> {
        self.states.get(table).copied()
    }

    pub fn apply(&self, table_id: &str, table: &Table) -> Table {
        match self.current(table_id) {
            Some(state) => table.sorted(state.column, state.direction),
            None => table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn column(rows: &[Vec<String>], index: usize) -> Vec<&str> {
        rows.iter().map(|row| row[index].as_str()).collect()
    }

    #[test]
    fn currency_cells_sort_numerically() {
        let input = rows(&[&["a", "10€"], &["b", "2€"], &["c", "100€"]]);
        let sorted = sort_rows(&input, 1, SortDirection::Ascending);
        assert_eq!(column(&sorted, 1), vec!["2€", "10€", "100€"]);

        let sorted = sort_rows(&input, 1, SortDirection::Descending);
        assert_eq!(column(&sorted, 1), vec!["100€", "10€", "2€"]);
    }

    #[test]
    fn sort_is_stable_for_ties() {
        let input = rows(&[&["first", "5"], &["second", "3"], &["third", "5"]]);
        let ascending = sort_rows(&input, 1, SortDirection::Ascending);
        assert_eq!(column(&ascending, 0), vec!["second", "first", "third"]);

        let descending = sort_rows(&input, 1, SortDirection::Descending);
        assert_eq!(column(&descending, 0), vec!["first", "third", "second"]);
    }

    #[test]
    fn text_uses_spanish_collation() {
        let input = rows(&[&["Ñandú"], &["nube"], &["Óscar"], &["oro"], &["zeta"]]);
        let sorted = sort_rows(&input, 0, SortDirection::Ascending);
        assert_eq!(column(&sorted, 0), vec!["nube", "Ñandú", "oro", "Óscar", "zeta"]);
    }

    #[test]
    fn parses_decorated_numbers() {
        assert_eq!(parse_numeric("1.234,50€"), Some(1234.5));
        assert_eq!(parse_numeric("12.5%"), Some(12.5));
        assert_eq!(parse_numeric("↓ -3"), Some(-3.0));
        assert_eq!(parse_numeric("—"), None);
        assert_eq!(parse_numeric("Inscrito"), None);
    }

    #[test]
    fn footer_rows_stay_in_place() {
        let mut table = Table::new(["Course", "Leads"]);
        table.push_row(vec!["B".into(), "7".into()]);
        table.push_row(vec!["A".into(), "3".into()]);
        table.push_footer(vec!["Total".into(), "10".into()]);

        let sorted = table.sorted(1, SortDirection::Ascending);
        assert_eq!(column(&sorted.rows, 0), vec!["A", "B"]);
        assert_eq!(sorted.footer, table.footer);
        assert_eq!(column(&table.rows, 0), vec!["B", "A"]);
    }

    #[test]
    fn repeated_selection_toggles_direction() {
        let mut sorts = TableSorts::default();
        assert_eq!(sorts.select("roi", 2).direction, SortDirection::Ascending);
        assert_eq!(sorts.select("roi", 2).direction, SortDirection::Descending);
        assert_eq!(sorts.select("roi", 2).direction, SortDirection::Ascending);
        assert_eq!(sorts.select("roi", 4).direction, SortDirection::Ascending);
        assert_eq!(sorts.current("pivot"), None);
    }

    #[test]
    fn empty_table_renders_empty_state() {
        let table = Table::new(["Course"]);
        assert!(table.to_markdown().contains("No data"));
    }
}
