use crate::{Error, Result};

/// Values of one column. Missing numeric cells are NaN, missing text cells
/// are empty strings. Integer columns have no missing cells.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<i64>),
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Integer(values) => values.len(),
            Self::Numeric(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
        }
    }

    /// Integer and float columns as floats; `None` for text.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Integer(values) => Some(values.iter().map(|&v| v as f64).collect()),
            Self::Numeric(values) => Some(values.clone()),
            Self::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn integer(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Integer(values),
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }
}

/// Column-oriented table with equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::default();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if !self.columns.is_empty() && column.data.len() != self.n_rows {
            return Err(Error::schema(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.data.len(),
                self.n_rows
            )));
        }
        self.n_rows = column.data.len();
        self.columns.push(column);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns a new table holding `names` in the given order. Fails on the
    /// first name that is not present.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let column = self.column(name).ok_or_else(|| Error::missing_column(*name))?;
            selected.push(column.clone());
        }

        let mut table = Table::new(selected)?;
        // A zero-column selection keeps the source row count.
        if table.columns.is_empty() {
            table.n_rows = self.n_rows;
        }
        Ok(table)
    }
}
