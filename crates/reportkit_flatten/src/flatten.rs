//! Flattening kernel: schema layout resolution and row expansion.

use serde_json::{Map, Value};

use crate::spec::{EnumSchemaField, FlattenError, FlattenResult, SpecFlatTable, SpecSchemaLayout};

/// Flatten `data[table]` into one row per item, repeating fixed fields.
///
/// Column order is fixed fields (schema order) followed by the first schema
/// sample row's keys. Missing values become `""`; present values are copied
/// unchanged. The row count always equals the length of `data[table]`.
pub fn flatten(schema: &Value, data: &Value) -> FlattenResult<SpecFlatTable> {
    let layout = classify_schema_fields(schema)?;
    let l_columns = layout.columns();

    let Some(dict_data) = data.as_object() else {
        return Err(FlattenError::DataNotObject);
    };
    let l_items = match dict_data.get(&layout.table_name) {
        None => return Err(FlattenError::MissingTableData(layout.table_name)),
        Some(Value::Array(l_items)) => l_items,
        Some(_) => return Err(FlattenError::TableDataNotArray(layout.table_name)),
    };

    let mut l_rows = Vec::with_capacity(l_items.len());
    for (n_idx, item) in l_items.iter().enumerate() {
        let Some(dict_item) = item.as_object() else {
            return Err(FlattenError::TableRowNotObject {
                table_name: layout.table_name,
                index: n_idx,
            });
        };

        let mut row = Map::new();
        for c_name in &l_columns {
            let source = if layout.cols_fixed.contains(c_name) {
                dict_data
            } else {
                dict_item
            };
            row.insert(c_name.clone(), derive_value_or_empty(source, c_name));
        }
        l_rows.push(row);
    }

    Ok(SpecFlatTable {
        table_name: layout.table_name,
        columns: l_columns,
        rows: l_rows,
    })
}

/// Resolve fixed fields and the single table section of `schema`.
///
/// Exactly one entry may hold an array; zero or several is an error.
pub fn classify_schema_fields(schema: &Value) -> FlattenResult<SpecSchemaLayout> {
    let Some(dict_schema) = schema.as_object() else {
        return Err(FlattenError::SchemaNotObject);
    };

    let mut l_cols_fixed = Vec::new();
    let mut l_candidates = Vec::new();
    for (c_name, value) in dict_schema {
        match EnumSchemaField::of(value) {
            EnumSchemaField::Fixed => l_cols_fixed.push(c_name.clone()),
            EnumSchemaField::Table => l_candidates.push(c_name.clone()),
        }
    }

    let table_name = match l_candidates.len() {
        0 => return Err(FlattenError::NoTableField),
        1 => l_candidates.remove(0),
        _ => {
            return Err(FlattenError::AmbiguousTableField {
                candidates: l_candidates,
            });
        }
    };

    let cols_table = derive_table_columns(&table_name, &dict_schema[&table_name])?;

    Ok(SpecSchemaLayout {
        table_name,
        cols_fixed: l_cols_fixed,
        cols_table,
    })
}

/// Derive table column names from the first element of a sample array.
pub fn derive_table_columns(table_name: &str, sample: &Value) -> FlattenResult<Vec<String>> {
    let Some(l_samples) = sample.as_array() else {
        return Err(FlattenError::NoTableField);
    };
    let Some(row_first) = l_samples.first() else {
        return Err(FlattenError::EmptyTableSample(table_name.to_string()));
    };
    let Some(dict_first) = row_first.as_object() else {
        return Err(FlattenError::TableSampleNotObject(table_name.to_string()));
    };
    Ok(dict_first.keys().cloned().collect())
}

fn derive_value_or_empty(source: &Map<String, Value>, key: &str) -> Value {
    source
        .get(key)
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()))
}
