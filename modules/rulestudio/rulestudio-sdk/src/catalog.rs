//! Rule catalog: enriched listing and mutations that re-read engine state.

use serde::Serialize;
use tracing::{debug, info};

use crate::batch::item_result;
use crate::client::{EngineClient, from_value};
use crate::error::{ClientError, Result};
use crate::fallback::{FallbackResult, run_chain};
use crate::resources::segment;
use crate::types::{BatchRequestItem, RuleDefinition, RuleStatus, RuleSummary};

/// How an enriched rule list was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStrategy {
    /// One `/batch/req` call with definition and status per rule
    Batch,
    /// Two calls per rule
    Sequential,
    /// The plain `/rules` list, no enrichment
    Plain,
}

/// Default order for [`RuleCatalog::list_enriched`].
pub const DEFAULT_LIST_CHAIN: [ListStrategy; 3] =
    [ListStrategy::Batch, ListStrategy::Sequential, ListStrategy::Plain];

/// A rule with whatever detail could be fetched for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRule {
    #[serde(flatten)]
    pub summary: RuleSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<RuleDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<RuleStatus>,
}

impl EnrichedRule {
    fn plain(summary: RuleSummary) -> Self {
        Self {
            summary,
            definition: None,
            detail: None,
        }
    }
}

/// Rule operations for list and detail views.
///
/// Engine state is never cached: every mutation is followed by a fresh read
/// and the fresh state is returned.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    client: EngineClient,
}

impl RuleCatalog {
    #[must_use]
    pub const fn new(client: EngineClient) -> Self {
        Self { client }
    }

    /// Rules with definitions and status, using the default strategy order.
    ///
    /// # Errors
    /// Fails only when the plain rule list cannot be fetched.
    pub async fn list_enriched(&self) -> Result<FallbackResult<ListStrategy, Vec<EnrichedRule>>> {
        self.list_enriched_with(&DEFAULT_LIST_CHAIN).await
    }

    /// Same as [`Self::list_enriched`] with an explicit strategy order.
    ///
    /// # Errors
    /// Fails only when the plain rule list cannot be fetched.
    pub async fn list_enriched_with(
        &self,
        chain: &[ListStrategy],
    ) -> Result<FallbackResult<ListStrategy, Vec<EnrichedRule>>> {
        let summaries = self.client.rules().list().await?;
        let summaries = &summaries;

        let result = run_chain(chain, |strategy| async move {
            match strategy {
                ListStrategy::Batch => self.enrich_batch(summaries).await,
                ListStrategy::Sequential => self.enrich_sequential(summaries).await,
                ListStrategy::Plain => Ok(summaries.iter().cloned().map(EnrichedRule::plain).collect()),
            }
        })
        .await;

        if let Some(strategy) = result.winner() {
            debug!(strategy = ?strategy, rules = summaries.len(), "Rule list assembled");
        }
        Ok(result)
    }

    async fn enrich_batch(&self, summaries: &[RuleSummary]) -> Result<Vec<EnrichedRule>> {
        let mut items = Vec::with_capacity(summaries.len() * 2);
        for summary in summaries {
            let base = format!("/rules/{}", segment(&summary.id, "rule id")?);
            items.push(BatchRequestItem::get(base.clone()));
            items.push(BatchRequestItem::get(format!("{base}/status")));
        }

        let mut responses = self.client.batch(&items).await?.into_iter();
        let mut out = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let (Some(def), Some(status)) = (responses.next(), responses.next()) else {
                return Err(ClientError::InvalidResponse(
                    "batch response shorter than request".into(),
                ));
            };
            out.push(EnrichedRule {
                summary: summary.clone(),
                definition: item_result(def).ok().and_then(|v| from_value(v).ok()),
                detail: item_result(status).ok().map(RuleStatus::from_value),
            });
        }
        Ok(out)
    }

    async fn enrich_sequential(&self, summaries: &[RuleSummary]) -> Result<Vec<EnrichedRule>> {
        let rules = self.client.rules();
        let mut out = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let definition = tolerate(rules.get(&summary.id).await)?;
            let detail = tolerate(rules.status(&summary.id).await)?;
            out.push(EnrichedRule {
                summary: summary.clone(),
                definition,
                detail,
            });
        }
        Ok(out)
    }

    /// Start a rule and return its refreshed status.
    ///
    /// # Errors
    /// Propagates transport errors of either call.
    pub async fn start(&self, id: &str) -> Result<RuleStatus> {
        self.client.rules().start(id).await?;
        info!(rule_id = %id, "Rule started");
        self.client.rules().status(id).await
    }

    /// Stop a rule and return its refreshed status.
    ///
    /// # Errors
    /// Propagates transport errors of either call.
    pub async fn stop(&self, id: &str) -> Result<RuleStatus> {
        self.client.rules().stop(id).await?;
        info!(rule_id = %id, "Rule stopped");
        self.client.rules().status(id).await
    }

    /// Restart a rule and return its refreshed status.
    ///
    /// # Errors
    /// Propagates transport errors of either call.
    pub async fn restart(&self, id: &str) -> Result<RuleStatus> {
        self.client.rules().restart(id).await?;
        info!(rule_id = %id, "Rule restarted");
        self.client.rules().status(id).await
    }

    /// Delete a rule and return the refreshed rule list.
    ///
    /// # Errors
    /// Propagates transport errors of either call.
    pub async fn delete(&self, id: &str) -> Result<Vec<RuleSummary>> {
        self.client.rules().delete(id).await?;
        info!(rule_id = %id, "Rule deleted");
        self.client.rules().list().await
    }

    /// Replace a rule definition and return it as stored by the engine.
    ///
    /// # Errors
    /// Propagates transport errors of either call.
    pub async fn update(&self, id: &str, rule: &RuleDefinition) -> Result<RuleDefinition> {
        self.client.rules().update(id, rule).await?;
        info!(rule_id = %id, "Rule updated");
        self.client.rules().get(id).await
    }
}

// Per-rule errors leave a gap; losing the engine fails the strategy.
fn tolerate<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_unreachable() || e.is_timeout() => Err(e),
        Err(_) => Ok(None),
    }
}
