use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use urlencoding::encode;

use crate::{
    config::WarehouseConfig,
    error::{InsertErrors, RowInsertError, WarehouseError},
    info,
    management::ServiceAccountKey,
    success,
    types::{AudioFeatureRecord, SchemaField},
    utils::row_insert_id,
    warning,
};

use super::{
    ClusteringModel, DatasetRef, ServiceAccountAuth, TableRef, Warehouse, clustering_statement,
    distinct_user_query,
};

const QUERY_TIMEOUT_MS: u64 = 30_000;

enum TokenSource {
    ServiceAccount(ServiceAccountAuth),
    Static(String),
}

/// [`Warehouse`] backed by the BigQuery REST API.
pub struct BigQueryWarehouse {
    http: Client,
    api_url: String,
    project_id: String,
    location: String,
    token: TokenSource,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRow<'a> {
    insert_id: String,
    json: &'a AudioFeatureRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct InsertErrorEntry {
    index: usize,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    rows: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    job_reference: Option<JobReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: Option<String>,
}

impl BigQueryWarehouse {
    /// Builds the sink from a service-account key.
    ///
    /// The project is the configured override or, failing that, the key's own
    /// project.
    pub fn from_key(config: &WarehouseConfig, key: ServiceAccountKey) -> Result<Self, WarehouseError> {
        let project_id = config
            .project_id
            .clone()
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| {
                WarehouseError::Credentials("no project id in settings or key file".to_string())
            })?;

        let http = Client::new();
        Ok(Self {
            http: http.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            project_id,
            location: config.location.clone(),
            token: TokenSource::ServiceAccount(ServiceAccountAuth::new(http, key)),
        })
    }

    /// Builds the sink with a fixed, externally obtained access token.
    pub fn with_static_token(api_url: &str, project_id: &str, location: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            location: location.to_string(),
            token: TokenSource::Static(token.to_string()),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, WarehouseError> {
        let token = match &self.token {
            TokenSource::ServiceAccount(auth) => auth.access_token().await?,
            TokenSource::Static(token) => token.clone(),
        };
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, WarehouseError> {
        Ok(self.authorized(request).await?.send().await?)
    }

    fn project_url(&self) -> String {
        format!("{}/projects/{}", self.api_url, encode(&self.project_id))
    }

    fn dataset_url(&self, dataset_id: &str) -> String {
        format!("{}/datasets/{}", self.project_url(), encode(dataset_id))
    }

    fn table_url(&self, table: &TableRef) -> String {
        format!(
            "{}/tables/{}",
            self.dataset_url(&table.dataset_id),
            encode(&table.table_id)
        )
    }

    /// GETs a resource and reports whether it exists.
    async fn exists(&self, url: &str) -> Result<bool, WarehouseError> {
        let response = self.send(self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response).await?;
        Ok(true)
    }

    /// POSTs a create request. A conflict means someone else created it first.
    async fn create(&self, url: &str, body: &serde_json::Value) -> Result<(), WarehouseError> {
        let response = self.send(self.http.post(url).json(body)).await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    async fn ensure_dataset(&self, name: &str) -> Result<DatasetRef, WarehouseError> {
        let dataset = DatasetRef {
            project_id: self.project_id.clone(),
            dataset_id: name.to_string(),
        };

        if self.exists(&self.dataset_url(name)).await? {
            info!("Dataset {} already exists.", dataset);
            return Ok(dataset);
        }

        let body = json!({
            "datasetReference": {
                "projectId": self.project_id,
                "datasetId": name,
            },
            "location": self.location,
        });
        self.create(&format!("{}/datasets", self.project_url()), &body)
            .await?;

        success!("Created dataset {}.", dataset);
        Ok(dataset)
    }

    async fn ensure_table(
        &self,
        dataset: &DatasetRef,
        name: &str,
        schema: &[SchemaField],
    ) -> Result<TableRef, WarehouseError> {
        let table = dataset.table(name);

        if self.exists(&self.table_url(&table)).await? {
            info!("Table {} already exists.", table);
            return Ok(table);
        }

        let body = json!({
            "tableReference": {
                "projectId": table.project_id,
                "datasetId": table.dataset_id,
                "tableId": table.table_id,
            },
            "schema": { "fields": schema },
        });
        self.create(
            &format!("{}/tables", self.dataset_url(&dataset.dataset_id)),
            &body,
        )
        .await?;

        success!("Created table {}.", table);
        Ok(table)
    }

    async fn user_already_ingested(
        &self,
        table: &TableRef,
        user_id: &str,
    ) -> Result<bool, WarehouseError> {
        let body = json!({
            "query": distinct_user_query(table),
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "user_id",
                "parameterType": { "type": "STRING" },
                "parameterValue": { "value": user_id },
            }],
            "location": self.location,
            "timeoutMs": QUERY_TIMEOUT_MS,
        });

        let url = format!("{}/queries", self.project_url());
        let response = check_status(self.send(self.http.post(&url).json(&body)).await?).await?;
        let result: QueryResponse = response.json().await?;

        if !result.job_complete {
            warning!("Lookup of user {} did not finish in time", user_id);
            return Err(WarehouseError::QueryIncomplete);
        }

        Ok(!result.rows.is_empty())
    }

    async fn insert_batch(
        &self,
        table: &TableRef,
        rows: &[AudioFeatureRecord],
    ) -> Result<(), WarehouseError> {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(index, record)| InsertAllRow {
                insert_id: row_insert_id(&record.user_id, index, &record.track_name),
                json: record,
            })
            .collect::<Vec<_>>();

        let body = json!({
            "kind": "bigquery#tableDataInsertAllRequest",
            "skipInvalidRows": false,
            "ignoreUnknownValues": false,
            "rows": rows,
        });

        let url = format!("{}/insertAll", self.table_url(table));
        let response = check_status(self.send(self.http.post(&url).json(&body)).await?).await?;
        let result: InsertAllResponse = response.json().await?;

        if result.insert_errors.is_empty() {
            return Ok(());
        }

        let errors = result
            .insert_errors
            .into_iter()
            .flat_map(|entry| {
                let index = entry.index;
                entry.errors.into_iter().map(move |e| RowInsertError {
                    index,
                    reason: e.reason.unwrap_or_default(),
                    message: e.message.unwrap_or_default(),
                })
            })
            .collect::<Vec<_>>();

        let errors = InsertErrors(errors);
        warning!("Encountered errors while inserting rows: {}", errors);
        Err(errors.into())
    }

    async fn trigger_clustering_model(
        &self,
        dataset: &DatasetRef,
        table: &TableRef,
        model: &ClusteringModel,
    ) -> Result<(), WarehouseError> {
        let body = json!({
            "configuration": {
                "query": {
                    "query": clustering_statement(dataset, table, model),
                    "useLegacySql": false,
                }
            },
            "jobReference": {
                "projectId": self.project_id,
                "location": self.location,
            },
        });

        let url = format!("{}/jobs", self.project_url());
        let response = check_status(self.send(self.http.post(&url).json(&body)).await?).await?;
        let job: JobResponse = response.json().await?;

        let job_id = job
            .job_reference
            .and_then(|r| r.job_id)
            .unwrap_or_else(|| "unknown".to_string());
        info!("Submitted training job {} for model {}.", job_id, model.name);
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, WarehouseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or(body);

    warning!("Warehouse request failed with {}: {}", status.as_u16(), message);
    Err(WarehouseError::Api {
        status: status.as_u16(),
        message,
    })
}
