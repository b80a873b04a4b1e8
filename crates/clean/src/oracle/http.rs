//! Oracles served over HTTP in the Hugging Face inference format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Classification, Detection, Entity, EntityOracle, LanguageOracle, OracleError, QualityOracle};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

async fn post_json<B, R>(client: &Client, url: &str, token: Option<&str>, body: &B) -> Result<R, OracleError>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let mut request = client.post(url).json(body);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(OracleError::Api(format!("{status}: {body}")));
    }

    Ok(response.json().await?)
}

/// Text-classification endpoint. Serves both as the quality classifier and,
/// pointed at a language-identification model, as the language oracle.
pub struct HttpClassifier {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: build_client(),
            url: url.into(),
            token,
        }
    }

    async fn top_labels(&self, texts: &[&str]) -> Result<Vec<Classification>, OracleError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = ClassifyRequest { inputs: texts };
        let response: ClassifyResponse =
            post_json(&self.client, &self.url, self.token.as_deref(), &request).await?;
        let results = response.into_top(texts.len())?;
        if results.len() != texts.len() {
            return Err(OracleError::LengthMismatch {
                expected: texts.len(),
                actual: results.len(),
            });
        }
        Ok(results)
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Pipelines answer either one top label per input or the full label
/// distribution per input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Ranked(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassifyResponse {
    fn into_top(self, expected: usize) -> Result<Vec<Classification>, OracleError> {
        match self {
            ClassifyResponse::Flat(items) => Ok(items
                .into_iter()
                .map(|item| Classification {
                    label: item.label,
                    score: item.score,
                })
                .collect()),
            ClassifyResponse::Ranked(rows) => rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .max_by(|a, b| a.score.total_cmp(&b.score))
                        .map(|best| Classification {
                            label: best.label,
                            score: best.score,
                        })
                        .ok_or_else(|| {
                            OracleError::Malformed(format!("empty label list in batch of {expected}"))
                        })
                })
                .collect(),
        }
    }
}

#[async_trait]
impl QualityOracle for HttpClassifier {
    async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Classification>, OracleError> {
        self.top_labels(texts).await
    }
}

#[async_trait]
impl LanguageOracle for HttpClassifier {
    async fn detect(&self, text: &str) -> Result<Detection, OracleError> {
        let top = self
            .top_labels(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Malformed("no label returned".into()))?;
        Ok(Detection {
            language: top.label,
            confidence: top.score,
        })
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// Token-classification endpoint with entity aggregation.
pub struct HttpEntityRecognizer {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpEntityRecognizer {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: build_client(),
            url: url.into(),
            token,
        }
    }
}

#[derive(Serialize)]
struct EntityRequest<'a> {
    inputs: &'a str,
    parameters: EntityParameters,
}

#[derive(Serialize)]
struct EntityParameters {
    aggregation_strategy: &'static str,
}

#[derive(Debug, Deserialize)]
struct EntitySpan {
    entity_group: String,
    word: String,
}

#[async_trait]
impl EntityOracle for HttpEntityRecognizer {
    async fn recognize(&self, text: &str, _language: &str) -> Result<Vec<Entity>, OracleError> {
        let request = EntityRequest {
            inputs: text,
            parameters: EntityParameters {
                aggregation_strategy: "simple",
            },
        };
        let spans: Vec<EntitySpan> =
            post_json(&self.client, &self.url, self.token.as_deref(), &request).await?;
        Ok(spans
            .into_iter()
            .map(|span| Entity {
                text: span.word.trim().to_string(),
                category: span.entity_group,
            })
            .collect())
    }
}
