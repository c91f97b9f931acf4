//! Stock adjustment executor.

use common::ProductId;
use domain::{AdjustmentPlan, StockAdjustment};
use store::{AdjustOutcome, StockStore};

use crate::error::EngineError;

/// One adjustment that matched and modified a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedAdjustment {
    pub adjustment: StockAdjustment,

    /// Stock level right after this adjustment.
    pub stock_after: i64,
}

/// Adjustments applied by one [`StockAdjustmentExecutor::apply`] or
/// [`StockAdjustmentExecutor::release`] call, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustmentReport {
    applied: Vec<AppliedAdjustment>,
}

impl AdjustmentReport {
    pub fn applied(&self) -> &[AppliedAdjustment] {
        &self.applied
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    /// Stock level of a product after the batch, if it was adjusted.
    pub fn stock_after(&self, product_id: &ProductId) -> Option<i64> {
        self.applied
            .iter()
            .rev()
            .find(|a| &a.adjustment.product_id == product_id)
            .map(|a| a.stock_after)
    }
}

/// Applies adjustment plans to a [`StockStore`] as a single unit of work.
///
/// Each adjustment is one atomic conditional update. If any of them cannot
/// be applied, the ones already applied in the same batch are reverted in
/// reverse order before the error is returned.
pub struct StockAdjustmentExecutor<S: StockStore> {
    stock: S,
}

impl<S: StockStore> StockAdjustmentExecutor<S> {
    pub fn new(stock: S) -> Self {
        Self { stock }
    }

    /// Returns a reference to the underlying stock store.
    pub fn store(&self) -> &S {
        &self.stock
    }

    /// Applies every adjustment of the plan, or none of them.
    #[tracing::instrument(skip_all, fields(adjustments = plan.len()))]
    pub async fn apply(&self, plan: &AdjustmentPlan) -> Result<AdjustmentReport, EngineError> {
        let mut report = AdjustmentReport::default();

        for adjustment in plan.adjustments() {
            let outcome = match self.stock.adjust(&adjustment.product_id, adjustment.delta).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    metrics::counter!("stock_adjustments_total", "outcome" => "error").increment(1);
                    self.revert(&report).await?;
                    return Err(e.into());
                }
            };

            let failure = match outcome {
                AdjustOutcome::Applied { stock } => {
                    metrics::counter!("stock_adjustments_total", "outcome" => "applied")
                        .increment(1);
                    tracing::debug!(
                        product_id = %adjustment.product_id,
                        delta = adjustment.delta,
                        stock,
                        "stock adjusted"
                    );
                    report.applied.push(AppliedAdjustment {
                        adjustment,
                        stock_after: stock,
                    });
                    continue;
                }
                AdjustOutcome::Insufficient { available } => {
                    metrics::counter!("stock_adjustments_total", "outcome" => "insufficient")
                        .increment(1);
                    tracing::warn!(
                        product_id = %adjustment.product_id,
                        requested = -adjustment.delta,
                        available,
                        "insufficient stock"
                    );
                    EngineError::InsufficientStock {
                        product_id: adjustment.product_id,
                        requested: -adjustment.delta,
                        available,
                    }
                }
                AdjustOutcome::UnknownProduct => {
                    metrics::counter!("stock_adjustments_total", "outcome" => "unknown_product")
                        .increment(1);
                    tracing::warn!(product_id = %adjustment.product_id, "unknown product");
                    EngineError::ProductNotFound(adjustment.product_id)
                }
            };

            self.revert(&report).await?;
            return Err(failure);
        }

        Ok(report)
    }

    /// Undoes a previously applied batch, newest adjustment first.
    ///
    /// Reverting a consumption cannot run short of stock. Reverting a release
    /// can, if the returned units were consumed in the meantime; the remaining
    /// adjustments are still reverted and the first failure is returned.
    #[tracing::instrument(skip_all, fields(adjustments = report.applied.len()))]
    pub async fn revert(&self, report: &AdjustmentReport) -> Result<(), EngineError> {
        if report.is_empty() {
            return Ok(());
        }

        metrics::counter!("stock_compensations_total").increment(1);
        let mut first_failure = None;

        for applied in report.applied.iter().rev() {
            let undo = applied.adjustment.inverse();
            if let Err(reason) = self.force(&undo).await {
                tracing::error!(
                    product_id = %undo.product_id,
                    delta = undo.delta,
                    %reason,
                    "stock compensation failed"
                );
                first_failure.get_or_insert(EngineError::CompensationFailed {
                    product_id: undo.product_id,
                    reason,
                });
            }
        }

        first_failure.map_or(Ok(()), Err)
    }

    /// Returns the units of a release plan to stock.
    ///
    /// Runs after the order write that freed the units has committed, so
    /// there is nothing to roll back: every release is attempted and the
    /// first failure is returned.
    #[tracing::instrument(skip_all, fields(adjustments = plan.len()))]
    pub async fn release(&self, plan: &AdjustmentPlan) -> Result<AdjustmentReport, EngineError> {
        let mut report = AdjustmentReport::default();
        let mut first_failure = None;

        for adjustment in plan.adjustments() {
            match self.force(&adjustment).await {
                Ok(stock) => {
                    metrics::counter!("stock_adjustments_total", "outcome" => "applied")
                        .increment(1);
                    report.applied.push(AppliedAdjustment {
                        adjustment,
                        stock_after: stock,
                    });
                }
                Err(reason) => {
                    metrics::counter!("stock_adjustments_total", "outcome" => "error")
                        .increment(1);
                    tracing::error!(
                        product_id = %adjustment.product_id,
                        delta = adjustment.delta,
                        %reason,
                        "stock release failed"
                    );
                    first_failure.get_or_insert(EngineError::ReleaseFailed {
                        product_id: adjustment.product_id,
                        reason,
                    });
                }
            }
        }

        first_failure.map_or(Ok(report), Err)
    }

    /// Applies one adjustment that has no fallback, describing any miss.
    async fn force(&self, adjustment: &StockAdjustment) -> Result<i64, String> {
        match self.stock.adjust(&adjustment.product_id, adjustment.delta).await {
            Ok(AdjustOutcome::Applied { stock }) => Ok(stock),
            Ok(AdjustOutcome::Insufficient { available }) => Err(format!(
                "needed {} units, {available} available",
                -adjustment.delta
            )),
            Ok(AdjustOutcome::UnknownProduct) => Err("product disappeared".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}
