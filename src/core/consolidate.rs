use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const INDEX_COLUMN: &str = "airtableId";
pub const NAME_COLUMN: &str = "nombre";
pub const START_COLUMN: &str = "desde";

pub const ENTITY_KEY: &str = "entidad";
pub const PERSON_KEY: &str = "persona";

pub const ENTITY_COLUMNS: &[&str] = &[
    "dependencia",
    "eleccion_mae",
    "nombre",
    "tipo",
    "sigla",
    "twitter",
    "webpage",
    "desde",
    "fuente_inicio",
    "hasta",
    "sucesoras",
];

/// Entity columns holding airtable-id references that get replaced by the
/// referenced entity's readable name.
pub const ENTITY_RELATION_COLUMNS: &[&str] = &["dependencia", "sucesoras"];

pub const PERSON_COLUMNS: &[&str] = &["genero", "nombre", "twitter"];

pub const AUTHORITY_COLUMNS: &[&str] = &[
    "entidad",
    "persona",
    "cargo",
    "desde",
    "fuente_inicio",
    "tweet_inicio",
    "causa_fin",
    "hasta",
    "sucesora",
    "tweet_fin",
    "fuente_fin",
];

/// Prepares a lookup table (entidades or personas) for the join:
/// relation columns are resolved to readable names, `airtableId` becomes
/// `key_name`, and every selected column gets the `{prefix}_` rename so it
/// cannot collide with authority-native columns.
pub fn prepare_table(
    mut table: Table,
    relation_columns: &[&str],
    selected_columns: &[&str],
    prefix: &str,
    key_name: &str,
) -> Result<Table> {
    if !relation_columns.is_empty() {
        let names = name_lookup(&table)?;
        for column in relation_columns {
            resolve_relations(&mut table, column, &names)?;
        }
    }

    table.rename_column(INDEX_COLUMN, key_name)?;

    let mut selected = Vec::with_capacity(1 + selected_columns.len());
    selected.push(key_name);
    selected.extend_from_slice(selected_columns);
    let mut table = table.select(&selected)?;

    for column in table.columns.iter_mut().skip(1) {
        *column = format!("{}_{}", prefix, column);
    }

    Ok(table)
}

/// Consolidates the authority table with the prepared persons and entities
/// tables into the final chronologically sorted table.
pub fn consolidate(autoridades: Table, personas: &Table, entidades: &Table) -> Result<Table> {
    let mut autoridades = autoridades.select(AUTHORITY_COLUMNS)?;
    unwrap_references(&mut autoridades, ENTITY_KEY)?;
    unwrap_references(&mut autoridades, PERSON_KEY)?;

    // Dangling ids abort the run instead of joining into a silently null row.
    check_references(&autoridades, PERSON_KEY, personas, "personas")?;
    check_references(&autoridades, ENTITY_KEY, entidades, "entidades")?;

    let joined = outer_join(&autoridades, personas, PERSON_KEY)?;
    let mut joined = outer_join(&joined, entidades, ENTITY_KEY)?;

    drop_columns(&mut joined, &[ENTITY_KEY, PERSON_KEY]);
    joined.rows.retain(|row| row.iter().any(|v| !v.is_null()));
    sort_by_start_date(&mut joined, START_COLUMN)?;

    Ok(joined)
}

pub fn render_csv(table: &Table) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(render_cell))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| EtlError::ProcessingError {
            message: format!("could not flush CSV buffer: {}", e),
        })?;
    String::from_utf8(bytes).map_err(|e| EtlError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn name_lookup(table: &Table) -> Result<HashMap<String, Value>> {
    let id_index = require_column(table, INDEX_COLUMN)?;
    let name_index = require_column(table, NAME_COLUMN)?;

    let mut names = HashMap::with_capacity(table.len());
    for row in &table.rows {
        if let Some(id) = row[id_index].as_str() {
            names.insert(id.to_string(), row[name_index].clone());
        }
    }
    Ok(names)
}

/// Rewrites a relation column in place: `[id]` becomes the referenced
/// record's name, an empty list or non-list value becomes null.
fn resolve_relations(
    table: &mut Table,
    column: &str,
    names: &HashMap<String, Value>,
) -> Result<()> {
    let index = require_column(table, column)?;

    for row in &mut table.rows {
        let value = row[index].take();
        row[index] = match value {
            Value::Array(items) => match items.as_slice() {
                [] => Value::Null,
                [id] => {
                    let id = id.as_str().ok_or_else(|| EtlError::ResolutionError {
                        column: column.to_string(),
                        message: "reference id is not a string".to_string(),
                    })?;
                    names
                        .get(id)
                        .cloned()
                        .ok_or_else(|| EtlError::ResolutionError {
                            column: column.to_string(),
                            message: format!("id '{}' has no matching record", id),
                        })?
                }
                items => {
                    return Err(EtlError::ResolutionError {
                        column: column.to_string(),
                        message: format!("expected at most one id, found {}", items.len()),
                    })
                }
            },
            _ => Value::Null,
        };
    }
    Ok(())
}

/// Unwraps authority references from one-element-list form to scalar ids.
fn unwrap_references(table: &mut Table, column: &str) -> Result<()> {
    let index = require_column(table, column)?;

    for row in &mut table.rows {
        let value = row[index].take();
        row[index] = match value {
            Value::Array(mut items) => {
                if items.len() != 1 {
                    return Err(EtlError::MalformedReferenceError {
                        column: column.to_string(),
                        message: format!("expected exactly one id, found {}", items.len()),
                    });
                }
                let id = items.remove(0);
                if !id.is_string() {
                    return Err(EtlError::MalformedReferenceError {
                        column: column.to_string(),
                        message: "reference id is not a string".to_string(),
                    });
                }
                id
            }
            other => {
                return Err(EtlError::MalformedReferenceError {
                    column: column.to_string(),
                    message: format!("expected a one-element id list, found {}", other),
                })
            }
        };
    }
    Ok(())
}

fn check_references(
    autoridades: &Table,
    column: &str,
    target: &Table,
    target_name: &str,
) -> Result<()> {
    let index = require_column(autoridades, column)?;
    let key_index = require_column(target, column)?;

    let known: HashSet<&str> = target
        .rows
        .iter()
        .filter_map(|row| row[key_index].as_str())
        .collect();

    for row in &autoridades.rows {
        if let Some(id) = row[index].as_str() {
            if !known.contains(id) {
                return Err(EtlError::ResolutionError {
                    column: column.to_string(),
                    message: format!("id '{}' not present in {}", id, target_name),
                });
            }
        }
    }
    Ok(())
}

/// Full outer join on `key`. Left rows keep their order and get null-filled
/// right columns when the key is null or unmatched; unmatched right rows are
/// appended afterwards with null-filled left columns, carrying their key.
fn outer_join(left: &Table, right: &Table, key: &str) -> Result<Table> {
    let left_key = require_column(left, key)?;
    let right_key = require_column(right, key)?;

    let carried: Vec<usize> = (0..right.columns.len()).filter(|&i| i != right_key).collect();

    let mut columns = left.columns.clone();
    columns.extend(carried.iter().map(|&i| right.columns[i].clone()));

    let mut right_index: HashMap<&str, usize> = HashMap::with_capacity(right.len());
    for (i, row) in right.rows.iter().enumerate() {
        if let Some(id) = row[right_key].as_str() {
            right_index.insert(id, i);
        }
    }

    let mut matched: HashSet<usize> = HashSet::new();
    let mut rows = Vec::with_capacity(left.len());
    for left_row in &left.rows {
        let mut row = left_row.clone();
        let hit = left_row[left_key]
            .as_str()
            .and_then(|id| right_index.get(id).copied());
        match hit {
            Some(i) => {
                matched.insert(i);
                row.extend(carried.iter().map(|&c| right.rows[i][c].clone()));
            }
            None => row.extend(std::iter::repeat(Value::Null).take(carried.len())),
        }
        rows.push(row);
    }

    for (i, right_row) in right.rows.iter().enumerate() {
        if matched.contains(&i) {
            continue;
        }
        let mut row = vec![Value::Null; left.columns.len()];
        row[left_key] = right_row[right_key].clone();
        row.extend(carried.iter().map(|&c| right_row[c].clone()));
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

fn drop_columns(table: &mut Table, names: &[&str]) {
    let mut indices: Vec<usize> = names
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();
    indices.sort_unstable_by(|a, b| b.cmp(a));
    for index in indices {
        table.columns.remove(index);
        for row in &mut table.rows {
            row.remove(index);
        }
    }
}

/// Sort key for the `desde` column: ISO dates in chronological order, then
/// non-date text lexicographically, then missing values last.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
enum StartKey {
    Date(NaiveDate),
    Text(String),
    Missing,
}

impl StartKey {
    fn from_value(value: &Value) -> StartKey {
        match value.as_str() {
            Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(date) => StartKey::Date(date),
                Err(_) => StartKey::Text(s.to_string()),
            },
            None => StartKey::Missing,
        }
    }
}

fn sort_by_start_date(table: &mut Table, column: &str) -> Result<()> {
    let index = require_column(table, column)?;
    table
        .rows
        .sort_by_cached_key(|row| StartKey::from_value(&row[index]));
    Ok(())
}

fn require_column(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| EtlError::ProcessingError {
            message: format!("column '{}' not found in table", name),
        })
}
