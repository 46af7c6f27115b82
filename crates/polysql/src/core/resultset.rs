//! Result protocols: cursor, buffered and callback.
//!
//! A [`CursorResultSet`] is produced by `Statement::execute`. It already holds
//! the first row (or knows there is none), exposes the current row as a live
//! [`Row`] view and advances one native fetch step at a time.
//!
//! [`BufferedResultSet`] drains a cursor into detached [`GenericRow`]s and
//! offers random access. The callback protocol is [`for_each_detached`]: one
//! call per row with an owned copy, stopped early when the callback returns
//! [`ControlFlow::Break`].

use std::ops::ControlFlow;

use serde::Serialize;

use super::row::{check_index, GenericRow, Row};
use super::value::ValueType;
use crate::error::{Result, SqlError};

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub value_type: ValueType,
    /// Engine type code (sqlite storage class, PostgreSQL OID, MySQL field
    /// type, ODBC SQL type).
    pub native_type: i32,
    pub index: usize,
    pub origin_name: String,
    pub table_origin_name: String,
}

impl ColumnInfo {
    pub fn new(index: usize, name: impl Into<String>, value_type: ValueType, native_type: i32) -> Self {
        Self {
            name: name.into(),
            value_type,
            native_type,
            index,
            origin_name: String::new(),
            table_origin_name: String::new(),
        }
    }

    /// Set the column and table the value was read from.
    pub fn with_origin(mut self, column: impl Into<String>, table: impl Into<String>) -> Self {
        self.origin_name = column.into();
        self.table_origin_name = table.into();
        self
    }
}

/// Column metadata of one executed query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnSet {
    columns: Vec<ColumnInfo>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; its ordinal is assigned from the current length.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        value_type: ValueType,
        native_type: i32,
        origin_name: impl Into<String>,
        table_origin_name: impl Into<String>,
    ) {
        let index = self.columns.len();
        self.columns.push(
            ColumnInfo::new(index, name, value_type, native_type)
                .with_origin(origin_name, table_origin_name),
        );
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&ColumnInfo> {
        check_index(index, self.columns.len())?;
        Ok(&self.columns[index])
    }

    /// First column named exactly `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnInfo> {
        self.columns.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl From<Vec<ColumnInfo>> for ColumnSet {
    fn from(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnInfo;
    type IntoIter = std::slice::Iter<'a, ColumnInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Affected-row count and last generated identity of an execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsResult {
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

impl StatsResult {
    pub fn new(affected_rows: u64, last_insert_id: u64) -> Self {
        Self {
            affected_rows,
            last_insert_id,
        }
    }

    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }
}

/// Iterator position used for cursor equality.
///
/// Two exhausted positions are equal. Otherwise positions are equal when they
/// refer to the same native statement at the same fetch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorPosition {
    End,
    At { statement: usize, token: u64 },
}

impl CursorPosition {
    pub fn is_end(&self) -> bool {
        matches!(self, CursorPosition::End)
    }
}

/// Forward-only result set.
///
/// Column indices are 0-based. Column metadata is fixed when the query is
/// executed.
pub trait CursorResultSet {
    /// Column metadata.
    fn columns(&self) -> &ColumnSet;

    /// Affected rows and last insert id of the execution.
    fn stats(&self) -> StatsResult;

    /// True while a current row is available.
    fn has_row(&self) -> bool;

    /// Live view of the current row.
    ///
    /// Fails with [`SqlError::InvalidIterator`] once the cursor is
    /// exhausted or was invalidated by re-executing its statement.
    fn current(&self) -> Result<&dyn Row>;

    /// One native fetch step. Returns whether a new row is current.
    fn advance(&mut self) -> Result<bool>;

    /// Identity of the current position.
    fn position(&self) -> CursorPosition;

    fn column_count(&self) -> usize {
        self.columns().len()
    }

    fn column_name(&self, index: usize) -> Result<&str> {
        Ok(&self.columns().get(index)?.name)
    }

    /// Linear, case-sensitive lookup; `None` when no column has that name.
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().index_of(name)
    }

    fn column_origin_name(&self, index: usize) -> Result<&str> {
        Ok(&self.columns().get(index)?.origin_name)
    }

    fn table_origin_name(&self, index: usize) -> Result<&str> {
        Ok(&self.columns().get(index)?.table_origin_name)
    }

    fn column_type(&self, index: usize) -> Result<ValueType> {
        Ok(self.columns().get(index)?.value_type)
    }

    fn affected_rows(&self) -> u64 {
        self.stats().affected_rows
    }

    fn last_insert_id(&self) -> u64 {
        self.stats().last_insert_id
    }
}

impl<'c> dyn CursorResultSet + 'c {
    /// Lending iterator over the remaining rows, starting at the current one.
    ///
    /// ```rust
    /// # fn demo(cursor: &mut dyn polysql::core::CursorResultSet) -> polysql::Result<()> {
    /// let mut rows = cursor.rows();
    /// while let Some(row) = rows.next()? {
    ///     println!("{}", row.get_value_string(0)?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn rows(&mut self) -> Rows<'_, 'c> {
        Rows {
            cursor: self,
            started: false,
        }
    }

    /// The sentinel position every exhausted cursor compares equal to.
    pub fn end(&self) -> CursorPosition {
        CursorPosition::End
    }
}

/// Lending iterator returned by [`CursorResultSet::rows`].
///
/// Each row borrows the iterator, so it must be dropped before the next call.
pub struct Rows<'a, 'c> {
    cursor: &'a mut (dyn CursorResultSet + 'c),
    started: bool,
}

impl Rows<'_, '_> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<&dyn Row>> {
        if self.started {
            if !self.cursor.advance()? {
                return Ok(None);
            }
        } else {
            self.started = true;
            if !self.cursor.has_row() {
                return Ok(None);
            }
        }
        self.cursor.current().map(Some)
    }
}

/// Run the callback protocol over a cursor.
///
/// Every row is detached before it is handed to `f`. Returns the number of
/// callback invocations.
pub fn for_each_detached(
    cursor: &mut dyn CursorResultSet,
    f: &mut dyn FnMut(&dyn Row) -> Result<ControlFlow<()>>,
) -> Result<usize> {
    let mut count = 0;
    let mut rows = cursor.rows();
    while let Some(row) = rows.next()? {
        let detached = GenericRow::from_row(row)?;
        count += 1;
        if f(&detached)?.is_break() {
            break;
        }
    }
    Ok(count)
}

/// Eagerly materialized, random-access result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferedResultSet {
    columns: ColumnSet,
    rows: Vec<GenericRow>,
    stats: StatsResult,
    cursor: usize,
}

impl BufferedResultSet {
    pub fn new(columns: ColumnSet) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Drain `cursor` from its current row to the end.
    pub fn from_cursor(cursor: &mut dyn CursorResultSet) -> Result<Self> {
        let mut buffered = Self::new(cursor.columns().clone());
        let mut rows = cursor.rows();
        while let Some(row) = rows.next()? {
            buffered.add_row(GenericRow::from_row(row)?);
        }
        buffered.stats = cursor.stats();
        Ok(buffered)
    }

    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        value_type: ValueType,
        origin_name: impl Into<String>,
        table_origin_name: impl Into<String>,
    ) {
        self.columns
            .add(name, value_type, 0, origin_name, table_origin_name);
    }

    pub fn add_row(&mut self, row: GenericRow) {
        self.rows.push(row);
    }

    pub fn set_stats(&mut self, stats: StatsResult) {
        self.stats = stats;
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Row `index`, or [`SqlError::OutOfRange`].
    pub fn get_row(&self, index: usize) -> Result<&GenericRow> {
        self.rows
            .get(index)
            .ok_or_else(|| SqlError::out_of_range(index, self.rows.len()))
    }

    pub fn rows_slice(&self) -> &[GenericRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<GenericRow> {
        self.rows
    }

    /// Restart cursor-style iteration at the first row.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl CursorResultSet for BufferedResultSet {
    fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn stats(&self) -> StatsResult {
        self.stats
    }

    fn has_row(&self) -> bool {
        self.cursor < self.rows.len()
    }

    fn current(&self) -> Result<&dyn Row> {
        self.rows
            .get(self.cursor)
            .map(|row| row as &dyn Row)
            .ok_or(SqlError::InvalidIterator)
    }

    fn advance(&mut self) -> Result<bool> {
        if self.cursor < self.rows.len() {
            self.cursor += 1;
        }
        Ok(self.has_row())
    }

    fn position(&self) -> CursorPosition {
        if self.has_row() {
            CursorPosition::At {
                statement: self.rows.as_ptr() as usize,
                token: self.cursor as u64,
            }
        } else {
            CursorPosition::End
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    fn people() -> BufferedResultSet {
        let mut rs = BufferedResultSet::new(ColumnSet::new());
        rs.add_column("id", ValueType::Int, "id", "people");
        rs.add_column("name", ValueType::String, "name", "people");
        rs.add_row(GenericRow::from(vec![Value::Int(1), Value::from("Alice")]));
        rs.add_row(GenericRow::from(vec![Value::Int(2), Value::from("Bob")]));
        rs.set_stats(StatsResult::new(0, 0));
        rs
    }

    #[test]
    fn test_buffered_random_access() {
        let rs = people();
        assert_eq!(rs.row_count(), 2);
        assert_eq!(rs.get_row(0).unwrap().get_value_string(1).unwrap(), "Alice");
        assert_eq!(rs.get_row(1).unwrap().get_value_int(0).unwrap(), 2);
        assert!(matches!(
            rs.get_row(2),
            Err(SqlError::OutOfRange { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_column_lookup_symmetry() {
        let rs = people();
        for i in 0..rs.column_count() {
            let name = rs.column_name(i).unwrap();
            assert_eq!(rs.column_index(name), Some(i));
        }
        assert_eq!(rs.column_index("nonexistent-name"), None);
        assert_eq!(rs.column_index("ID"), None);
        assert_eq!(rs.table_origin_name(1).unwrap(), "people");
        assert!(rs.column_type(2).is_err());
    }

    #[test]
    fn test_first_duplicate_column_wins() {
        let mut columns = ColumnSet::new();
        columns.add("a", ValueType::Int, 0, "", "");
        columns.add("a", ValueType::String, 0, "", "");
        assert_eq!(columns.index_of("a"), Some(0));
    }

    #[test]
    fn test_buffered_iterates_as_cursor() {
        let mut rs = people();
        let cursor: &mut dyn CursorResultSet = &mut rs;
        let mut names = Vec::new();
        let mut rows = cursor.rows();
        while let Some(row) = rows.next().unwrap() {
            names.push(row.get_value_string(1).unwrap());
        }
        assert_eq!(names, ["Alice", "Bob"]);
        assert!(!cursor.has_row());
        assert!(matches!(cursor.current(), Err(SqlError::InvalidIterator)));
        assert_eq!(cursor.position(), cursor.end());
    }

    #[test]
    fn test_positions() {
        let mut rs = people();
        let first = rs.position();
        assert_ne!(first, CursorPosition::End);
        rs.advance().unwrap();
        assert_ne!(rs.position(), first);
        rs.rewind();
        assert_eq!(rs.position(), first);

        let empty = BufferedResultSet::new(ColumnSet::new());
        assert_eq!(empty.position(), CursorPosition::End);
    }

    #[test]
    fn test_callback_protocol_visits_every_row() {
        let mut rs = people();
        let mut seen = Vec::new();
        let count = for_each_detached(&mut rs, &mut |row| {
            seen.push(row.get_values()?);
            Ok(ControlFlow::Continue(()))
        })
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen[1], vec![Value::Int(2), Value::from("Bob")]);
    }

    #[test]
    fn test_callback_protocol_stops_early() {
        let mut rs = people();
        let count = for_each_detached(&mut rs, &mut |_| Ok(ControlFlow::Break(()))).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_from_cursor_copies_rows_and_stats() {
        let mut source = people();
        source.set_stats(StatsResult::new(3, 9));
        let copy = BufferedResultSet::from_cursor(&mut source).unwrap();
        assert_eq!(copy.row_count(), 2);
        assert_eq!(copy.stats(), StatsResult::new(3, 9));
        assert_eq!(copy.columns().names(), ["id", "name"]);
    }
}
