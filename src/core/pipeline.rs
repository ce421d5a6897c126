use crate::core::consolidate::{
    self, ENTITY_COLUMNS, ENTITY_KEY, ENTITY_RELATION_COLUMNS, PERSON_COLUMNS, PERSON_KEY,
};
use crate::core::{ConfigProvider, Dataset, Pipeline, Storage, Table, TransformResult};
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde_json::{Map, Value};

pub const OUTPUT_FILE: &str = "maes.csv";

pub struct ConsolidationPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> ConsolidationPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ConsolidationPipeline<S, C> {
    async fn extract(&self) -> Result<Dataset> {
        tracing::debug!("Fetching source document from: {}", self.config.source_url());
        let response = self.client.get(self.config.source_url()).send().await?;

        tracing::debug!("Source response status: {}", response.status());
        let body = response.error_for_status()?.text().await?;

        let document: Value =
            serde_json::from_str(&body).map_err(|e| EtlError::ParseError {
                message: format!("source document is not valid JSON: {}", e),
            })?;
        let mut tables = match document {
            Value::Object(map) => map,
            _ => {
                return Err(EtlError::ParseError {
                    message: "expected a JSON object at the top level".to_string(),
                })
            }
        };

        Ok(Dataset {
            autoridades: take_table(&mut tables, "autoridades")?,
            entidades: take_table(&mut tables, "entidades")?,
            personas: take_table(&mut tables, "personas")?,
        })
    }

    async fn transform(&self, dataset: Dataset) -> Result<TransformResult> {
        let entidades = consolidate::prepare_table(
            dataset.entidades,
            ENTITY_RELATION_COLUMNS,
            ENTITY_COLUMNS,
            "entidad",
            ENTITY_KEY,
        )?;
        let personas = consolidate::prepare_table(
            dataset.personas,
            &[],
            PERSON_COLUMNS,
            "persona",
            PERSON_KEY,
        )?;
        tracing::debug!(
            "Prepared {} entidades and {} personas for the join",
            entidades.len(),
            personas.len()
        );

        let consolidated = consolidate::consolidate(dataset.autoridades, &personas, &entidades)?;
        let csv_output = consolidate::render_csv(&consolidated)?;

        Ok(TransformResult {
            consolidated,
            csv_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        tracing::debug!(
            "Writing {} consolidated rows to {}",
            result.consolidated.len(),
            OUTPUT_FILE
        );
        self.storage
            .write_file(OUTPUT_FILE, result.csv_output.as_bytes())
            .await?;

        Ok(format!("{}/{}", self.config.output_path(), OUTPUT_FILE))
    }
}

fn take_table(document: &mut Map<String, Value>, name: &str) -> Result<Table> {
    let records = match document.remove(name) {
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(EtlError::ParseError {
                message: format!("table '{}' is not an array", name),
            })
        }
        None => {
            return Err(EtlError::ParseError {
                message: format!("missing table '{}' in source document", name),
            })
        }
    };

    let mut objects = Vec::with_capacity(records.len());
    for record in records {
        match record {
            Value::Object(map) => objects.push(map),
            _ => {
                return Err(EtlError::ParseError {
                    message: format!("table '{}' contains a non-object record", name),
                })
            }
        }
    }
    Ok(Table::from_records(objects))
}
