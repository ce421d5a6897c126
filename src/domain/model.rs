use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A flat table of named columns and `serde_json::Value` cells.
///
/// Columns keep their first-appearance order across the source records
/// because the output CSV's column order is part of the contract. Cells for
/// fields a record does not carry are `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table from a sequence of JSON objects, flattening nested
    /// objects into dotted column names. List values are kept as-is; they
    /// carry relation ids until resolved.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut flattened: Vec<Vec<(String, Value)>> = Vec::with_capacity(records.len());

        for record in records {
            let mut fields = Vec::new();
            flatten_into(None, record, &mut fields);
            for (name, _) in &fields {
                if !index.contains_key(name) {
                    index.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
            flattened.push(fields);
        }

        let mut rows = Vec::with_capacity(flattened.len());
        for fields in flattened {
            let mut row = vec![Value::Null; columns.len()];
            for (name, value) in fields {
                row[index[&name]] = value;
            }
            rows.push(row);
        }

        Table { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Restricts the table to the given columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Table> {
        let indices = columns
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| EtlError::ProcessingError {
                        message: format!("column '{}' not found in table", name),
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        let index = self
            .column_index(from)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("column '{}' not found in table", from),
            })?;
        self.columns[index] = to.to_string();
        Ok(())
    }
}

fn flatten_into(prefix: Option<&str>, map: Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in map {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_into(Some(&name), nested, out),
            other => out.push((name, other)),
        }
    }
}

/// The three source tables, exactly as split out of the remote document.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub autoridades: Table,
    pub entidades: Table,
    pub personas: Table,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub consolidated: Table,
    pub csv_output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                other => panic!("expected object, got {}", other),
            })
            .collect()
    }

    #[test]
    fn test_from_records_unions_columns_in_first_appearance_order() {
        let table = Table::from_records(records(vec![
            json!({"a": 1, "b": "x"}),
            json!({"b": "y", "c": true}),
        ]));

        assert_eq!(table.columns, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0], vec![json!(1), json!("x"), Value::Null]);
        assert_eq!(table.rows[1], vec![Value::Null, json!("y"), json!(true)]);
    }

    #[test]
    fn test_from_records_flattens_nested_objects() {
        let table = Table::from_records(records(vec![
            json!({"id": "A", "meta": {"fuente": "web", "nota": null}}),
        ]));

        assert_eq!(table.columns, vec!["id", "meta.fuente", "meta.nota"]);
        assert_eq!(table.rows[0], vec![json!("A"), json!("web"), Value::Null]);
    }

    #[test]
    fn test_from_records_keeps_lists_intact() {
        let table = Table::from_records(records(vec![json!({"entidad": ["E1"]})]));
        assert_eq!(table.rows[0][0], json!(["E1"]));
    }

    #[test]
    fn test_select_reorders_and_restricts() {
        let table = Table::from_records(records(vec![json!({"a": 1, "b": 2, "c": 3})]));
        let selected = table.select(&["c", "a"]).unwrap();

        assert_eq!(selected.columns, vec!["c", "a"]);
        assert_eq!(selected.rows[0], vec![json!(3), json!(1)]);
    }

    #[test]
    fn test_select_missing_column_is_an_error() {
        let table = Table::from_records(records(vec![json!({"a": 1})]));
        assert!(table.select(&["a", "missing"]).is_err());
    }

    #[test]
    fn test_rename_column() {
        let mut table = Table::from_records(records(vec![json!({"airtableId": "E1"})]));
        table.rename_column("airtableId", "entidad").unwrap();
        assert_eq!(table.columns, vec!["entidad"]);
        assert!(table.rename_column("missing", "x").is_err());
    }
}
