//! Filtered value model

use std::cmp::Ordering;
use std::fmt;

use xlasso_core::CellValue;

/// The value a filter pipeline consumes and produces
///
/// A raw capture enters the pipeline as a `List` of row `List`s of `Cell`s.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Cell(CellValue),
    List(Vec<Value>),
    /// Insertion-ordered mapping
    Map(Vec<(String, Value)>),
    Table(Table),
}

impl Value {
    /// Wrap a row-major block of cells
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Value::List(
            rows.into_iter()
                .map(|row| Value::List(row.into_iter().map(Value::Cell).collect()))
                .collect(),
        )
    }

    pub fn empty_list() -> Self {
        Value::List(Vec::new())
    }

    pub fn as_cell(&self) -> Option<&CellValue> {
        match self {
            Value::Cell(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a map entry by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// View as a 2D grid of cells
    ///
    /// A cell is a 1x1 grid, a flat list of cells one row, a list of cell
    /// lists its rows, and a table its data rows. Anything else has no grid
    /// form.
    pub fn to_grid(&self) -> Option<Vec<Vec<CellValue>>> {
        match self {
            Value::Cell(cell) => Some(vec![vec![cell.clone()]]),
            Value::Table(table) => Some(table.rows.clone()),
            Value::List(items) if items.iter().all(|v| matches!(v, Value::Cell(_))) => {
                if items.is_empty() {
                    return Some(Vec::new());
                }
                Some(vec![items.iter().filter_map(Value::as_cell).cloned().collect()])
            }
            Value::List(items) => items
                .iter()
                .map(|row| match row {
                    Value::List(cells) => cells.iter().map(|c| c.as_cell().cloned()).collect(),
                    _ => None,
                })
                .collect(),
            Value::Map(_) => None,
        }
    }

    /// Every cell in the value, depth first
    pub fn cells(&self) -> Vec<&CellValue> {
        let mut out = Vec::new();
        self.collect_cells(&mut out);
        out
    }

    fn collect_cells<'a>(&'a self, out: &mut Vec<&'a CellValue>) {
        match self {
            Value::Cell(cell) => out.push(cell),
            Value::List(items) => items.iter().for_each(|v| v.collect_cells(out)),
            Value::Map(entries) => entries.iter().for_each(|(_, v)| v.collect_cells(out)),
            Value::Table(table) => out.extend(table.rows.iter().flatten()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Cell(_) => "cell",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Table(_) => "table",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Cell(CellValue::Empty)
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        Value::Cell(cell)
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Value::Table(table)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Cell(CellValue::String(s)) => write!(f, "{:?}", s.as_str()),
            Value::Cell(cell) => write!(f, "{}", cell),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Table(table) => write!(f, "{}", table),
        }
    }
}

/// Column-named tabular data, as built by the `df` filter
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table; rows are padded or cut to the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// Values of the named column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[index])
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}

/// Order two cells: numbers, then strings (case-insensitive), then booleans.
///
/// Empty cells compare as zero; errors sort after everything else.
pub fn compare_cells(left: &CellValue, right: &CellValue) -> Ordering {
    let zero = CellValue::Number(0.0);
    let left = if left.is_empty() { &zero } else { left };
    let right = if right.is_empty() { &zero } else { right };

    fn rank(cell: &CellValue) -> u8 {
        match cell {
            CellValue::Empty | CellValue::Number(_) => 0,
            CellValue::String(_) => 1,
            CellValue::Boolean(_) => 2,
            CellValue::Error(_) => 3,
        }
    }

    match (left, right) {
        (CellValue::Number(l), CellValue::Number(r)) => l.total_cmp(r),
        (CellValue::String(l), CellValue::String(r)) => {
            l.as_str().to_lowercase().cmp(&r.as_str().to_lowercase())
        }
        (CellValue::Boolean(l), CellValue::Boolean(r)) => l.cmp(r),
        (CellValue::Error(l), CellValue::Error(r)) => l.as_str().cmp(r.as_str()),
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Order two values; lists compare lexicographically, cells with [`compare_cells`]
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Cell(l), Value::Cell(r)) => compare_cells(l, r),
        (Value::List(l), Value::List(r)) => {
            for (a, b) in l.iter().zip(r) {
                match compare_values(a, b) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            l.len().cmp(&r.len())
        }
        (Value::Cell(_), _) => Ordering::Less,
        (_, Value::Cell(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
