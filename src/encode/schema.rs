//! Frozen one-hot column schema and projection of records onto it.
//!
//! Column layout (same order as a dummy-encoded frame with the reference
//! level dropped):
//!
//! ```text
//! year, month, region_<v2>, region_<v3>, ..., fuel_type_<v2>, ...
//! ```
//!
//! Categorical values are sorted lexicographically and the first one of each
//! field is the reference level: it has no column and encodes as all zeros.

use std::collections::{BTreeSet, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};

use nalgebra::DMatrix;
use serde::Serialize;

use crate::domain::{CategoricalField, Features, NumericField, PriceRecord};
use crate::error::AppError;

/// One encoded column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    Numeric { field: NumericField },
    Indicator { field: CategoricalField, value: String },
}

impl Column {
    pub fn name(&self) -> String {
        match self {
            Column::Numeric { field } => field.column_name().to_string(),
            Column::Indicator { field, value } => indicator_name(*field, value),
        }
    }

    pub fn is_indicator(&self) -> bool {
        matches!(self, Column::Indicator { .. })
    }
}

/// The ordered feature columns a model is fit against.
///
/// Built once from training data and never changed afterwards; every row fed
/// to a model must be produced by [`EncodedSchema::encode`] on the same schema.
#[derive(Debug, Clone)]
pub struct EncodedSchema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    references: Vec<(CategoricalField, String)>,
    fingerprint: u64,
}

/// A record projected onto a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub values: Vec<f64>,
    /// Fingerprint of the schema this row was encoded against.
    pub fingerprint: u64,
    /// Categorical values the schema has never seen (they encode as zeros).
    pub unseen: Vec<String>,
}

impl EncodedSchema {
    /// Derive the schema from the categorical domain of the training rows.
    pub fn build<'a, I>(rows: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = Features<'a>>,
    {
        let mut domains: Vec<BTreeSet<&'a str>> = vec![BTreeSet::new(); CategoricalField::ALL.len()];
        let mut n_rows = 0usize;
        for features in rows {
            n_rows += 1;
            for (slot, field) in CategoricalField::ALL.iter().enumerate() {
                domains[slot].insert(features.categorical(*field));
            }
        }
        if n_rows == 0 {
            return Err(AppError::data_unavailable(
                "Cannot build a feature schema from an empty dataset.",
            ));
        }

        let mut columns: Vec<Column> = NumericField::ALL
            .iter()
            .map(|&field| Column::Numeric { field })
            .collect();
        let mut references = Vec::with_capacity(CategoricalField::ALL.len());

        for (field, values) in CategoricalField::ALL.iter().zip(&domains) {
            let mut values = values.iter();
            if let Some(reference) = values.next() {
                references.push((*field, reference.to_string()));
            }
            columns.extend(values.map(|value| Column::Indicator {
                field: *field,
                value: value.to_string(),
            }));
        }

        Ok(Self::from_columns(columns, references))
    }

    /// Convenience for building from owned records.
    pub fn from_records(records: &[PriceRecord]) -> Result<Self, AppError> {
        Self::build(records.iter().map(PriceRecord::features))
    }

    fn from_columns(columns: Vec<Column>, references: Vec<(CategoricalField, String)>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(idx, col)| (col.name(), idx))
            .collect();

        let mut hasher = DefaultHasher::new();
        columns.hash(&mut hasher);
        let fingerprint = hasher.finish();

        Self {
            columns,
            index,
            references,
            fingerprint,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(Column::name).collect()
    }

    /// The dropped reference level of each categorical field.
    pub fn references(&self) -> &[(CategoricalField, String)] {
        &self.references
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Project one record onto the schema.
    ///
    /// The record's own dummy columns are matched by name: columns the schema
    /// does not know are dropped, schema columns the record lacks stay zero.
    pub fn encode(&self, features: Features<'_>) -> EncodedRow {
        let mut values = vec![0.0; self.columns.len()];
        let mut unseen = Vec::new();

        for (name, value) in raw_columns(features) {
            if let Some(&idx) = self.index.get(&name) {
                values[idx] = value;
            }
        }

        for field in CategoricalField::ALL {
            let value = features.categorical(field);
            let name = indicator_name(field, value);
            let is_reference = self
                .references
                .iter()
                .any(|(f, reference)| *f == field && reference == value);
            if !is_reference && !self.index.contains_key(&name) {
                unseen.push(name);
            }
        }

        EncodedRow {
            values,
            fingerprint: self.fingerprint,
            unseen,
        }
    }

    /// Encode many records into an `n × len()` design matrix (no intercept column).
    pub fn encode_matrix(&self, records: &[PriceRecord]) -> DMatrix<f64> {
        let p = self.columns.len();
        let values = records
            .iter()
            .flat_map(|r| self.encode(r.features()).values);
        DMatrix::from_row_iterator(records.len(), p, values)
    }

    /// Names of the indicator columns set in an encoded row.
    pub fn decode(&self, row: &EncodedRow) -> Vec<String> {
        self.columns
            .iter()
            .zip(&row.values)
            .filter(|(col, v)| col.is_indicator() && **v != 0.0)
            .map(|(col, _)| col.name())
            .collect()
    }
}

fn indicator_name(field: CategoricalField, value: &str) -> String {
    format!("{}_{value}", field.column_name())
}

/// The columns a record would produce if it were dummy-encoded on its own.
fn raw_columns(features: Features<'_>) -> Vec<(String, f64)> {
    let numeric = NumericField::ALL
        .iter()
        .map(|&field| (field.column_name().to_string(), features.numeric(field)));
    let indicators = CategoricalField::ALL
        .iter()
        .map(|&field| (indicator_name(field, features.categorical(field)), 1.0));
    numeric.chain(indicators).collect()
}
