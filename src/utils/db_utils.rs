use sqlx::{MySql, MySqlConnection};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U8(u8),
}

/// ===============================
/// Dynamic UPDATE over a fixed set of columns
/// ===============================
///
/// Column names come from code, never from the request payload.
#[derive(Debug)]
pub struct SqlUpdate {
    table: &'static str,
    assignments: Vec<(&'static str, SqlValue)>,
}

impl SqlUpdate {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
        }
    }

    pub fn set(mut self, column: &'static str, value: SqlValue) -> Self {
        self.assignments.push((column, value));
        self
    }

    /// Adds the assignment only when a value is present.
    pub fn set_some(self, column: &'static str, value: Option<SqlValue>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn to_sql(&self, id_column: &str) -> String {
        let set_clause = self
            .assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table, set_clause, id_column
        )
    }

    /// ===============================
    /// Execute the update, returning rows affected
    /// ===============================
    pub async fn execute(
        self,
        conn: &mut MySqlConnection,
        id_column: &str,
        id_value: u64,
    ) -> Result<u64, sqlx::Error> {
        let sql = self.to_sql(id_column);
        let mut query = sqlx::query::<MySql>(&sql);

        for (_, value) in self.assignments {
            query = match value {
                SqlValue::String(v) => query.bind(v),
                SqlValue::U8(v) => query.bind(v),
            };
        }

        let result = query.bind(id_value).execute(conn).await?;
        Ok(result.rows_affected())
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
