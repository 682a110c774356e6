//! The end-to-end run.

use crate::checks::cross_checks;
use crate::config::PipelineConfig;
use crate::events::{PipelineEvent, PipelineEventHandler};
use crate::metrics::PeriodInput;
use crate::report::{BucketRecord, MetricRecord, PipelineReport};
use crate::row::RawRow;
use crate::PipelineError;
use ledgerline_aggregate::{aggregate_bucket, record_bucket};
use ledgerline_confidence::Confidence;
use ledgerline_lineage::{CalculationStep, IdGenerator, LineageBuilder, NodeId};
use ledgerline_resolver::{record_resolution, Resolver};
use ledgerline_taxonomy::{ConceptId, OverrideProvider, TaxonomyProvider};
use std::collections::BTreeMap;

/// Mapped values for one period, keyed by concept.
#[derive(Debug, Default)]
struct PeriodSlot {
    values: BTreeMap<ConceptId, f64>,
    sources: BTreeMap<ConceptId, Vec<NodeId>>,
}

/// Runs rows through resolution, aggregation and derived metrics against
/// one immutable taxonomy.
pub struct Pipeline<'a> {
    taxonomy: &'a dyn TaxonomyProvider,
    overrides: Option<&'a dyn OverrideProvider>,
    config: PipelineConfig,
    event_handlers: Vec<PipelineEventHandler>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        taxonomy: &'a dyn TaxonomyProvider,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            taxonomy,
            overrides: None,
            config,
            event_handlers: Vec::new(),
        })
    }

    pub fn with_overrides(mut self, overrides: &'a dyn OverrideProvider) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn on_event(&mut self, handler: PipelineEventHandler) {
        self.event_handlers.push(handler);
    }

    fn emit(&self, event: PipelineEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    fn resolver(&self) -> Resolver<'a> {
        let resolver = Resolver::new(self.taxonomy, self.config.resolver.clone());
        match self.overrides {
            Some(overrides) => resolver.with_overrides(overrides),
            None => resolver,
        }
    }

    pub fn run(&self, rows: &[RawRow]) -> Result<PipelineReport, PipelineError> {
        let ids = match &self.config.session {
            Some(session) => IdGenerator::new(session.clone()),
            None => IdGenerator::random(),
        };
        let mut builder = LineageBuilder::new(ids);
        if let Some(source) = &self.config.source {
            builder.graph_mut().set_source(source.clone());
        }

        // Step 1: Source cells and extraction
        let mut extracted = Vec::with_capacity(rows.len());
        for row in rows {
            let cell = builder.add_source_cell(row.cell(), Some(row.label.clone()), row.value)?;
            let (node, _) =
                builder.add_extraction(&cell, row.label.clone(), row.value, row.period.clone())?;
            extracted.push(node);
        }
        self.emit(PipelineEvent::RowsExtracted { rows: rows.len() });

        // Step 2: Resolve in parallel, record in input order
        let resolver = self.resolver();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        let resolutions = resolver.resolve_batch(&labels);

        let mut periods: BTreeMap<Option<String>, PeriodSlot> = BTreeMap::new();
        for ((row, node), resolution) in rows.iter().zip(&extracted).zip(&resolutions) {
            let (mapped, _) = record_resolution(&mut builder, node, resolution)?;
            if let (Some(concept), Some(value)) = (&resolution.concept, row.value) {
                let slot = periods.entry(row.period.clone()).or_default();
                *slot.values.entry(concept.clone()).or_insert(0.0) += value;
                slot.sources.entry(concept.clone()).or_default().push(mapped);
            }
        }
        let resolution_stats = resolver.stats();
        tracing::info!(
            rows = rows.len(),
            found = resolution_stats.found(),
            unmapped = resolution_stats.total() - resolution_stats.found(),
            periods = periods.len(),
            "labels resolved"
        );
        self.emit(PipelineEvent::LabelsResolved {
            stats: resolution_stats.clone(),
        });

        let mut buckets = Vec::new();
        let mut metrics = Vec::new();
        let mut checks = Vec::new();
        let mut model_inputs: BTreeMap<String, Option<Confidence>> = BTreeMap::new();

        for (period, slot) in &periods {
            let mut inputs: BTreeMap<String, PeriodInput> = BTreeMap::new();

            // Step 3: Aggregate each bucket
            let mut conflicts = 0;
            for bucket in &self.config.buckets {
                let outcome =
                    aggregate_bucket(self.taxonomy, bucket, &slot.values, &self.config.aggregate);
                let recorded = record_bucket(
                    &mut builder,
                    bucket,
                    period.as_deref(),
                    &outcome,
                    &slot.sources,
                )?;
                if outcome.result.conflict {
                    conflicts += 1;
                }

                let confidence = match &recorded {
                    Some(ids) => {
                        let confidence = builder.graph().get_node(&ids.node)?.confidence;
                        inputs.insert(
                            bucket.name.clone(),
                            PeriodInput {
                                node: ids.node.clone(),
                                value: outcome.result.value,
                                confidence,
                            },
                        );
                        lower(&mut model_inputs, &bucket.label, confidence);
                        confidence
                    }
                    None => Confidence::ZERO,
                };
                buckets.push(BucketRecord {
                    period: period.clone(),
                    bucket: bucket.name.clone(),
                    label: bucket.label.clone(),
                    node: recorded.map(|ids| ids.node),
                    confidence,
                    outcome,
                });
            }
            let with_data = inputs.len();
            self.emit(PipelineEvent::PeriodAggregated {
                period: period.clone(),
                buckets_with_data: with_data,
                buckets_without_data: self.config.buckets.len() - with_data,
                conflicts,
            });

            // Step 4: Derived metrics
            let mut skipped = 0;
            for metric in &self.config.metrics {
                let Some(eval) = metric.evaluate(&inputs) else {
                    tracing::debug!(
                        metric = %metric.name,
                        period = period.as_deref().unwrap_or("-"),
                        "metric skipped, required input missing"
                    );
                    skipped += 1;
                    continue;
                };
                let formula = metric.formula();
                let (node, _) = builder.add_calculation(CalculationStep {
                    inputs: eval.nodes,
                    label: metric.label.clone(),
                    period: period.clone(),
                    value: Some(eval.value),
                    formula: formula.clone(),
                    formula_inputs: eval.values.clone(),
                    transform: Confidence::ONE,
                })?;
                let confidence = builder.graph().get_node(&node)?.confidence;
                lower(&mut model_inputs, &metric.label, confidence);
                inputs.insert(
                    metric.name.clone(),
                    PeriodInput {
                        node: node.clone(),
                        value: eval.value,
                        confidence,
                    },
                );
                metrics.push(MetricRecord {
                    period: period.clone(),
                    name: metric.name.clone(),
                    label: metric.label.clone(),
                    node,
                    value: eval.value,
                    confidence,
                    formula,
                    inputs: eval.values,
                });
            }
            self.emit(PipelineEvent::MetricsCalculated {
                period: period.clone(),
                calculated: self.config.metrics.len() - skipped,
                skipped,
            });

            // Step 5: Cross-statement checks
            checks.extend(cross_checks(
                self.taxonomy,
                period.as_deref(),
                &slot.values,
                self.config.revenue_check_tolerance,
            ));
        }

        tracing::info!(
            buckets = buckets.iter().filter(|b| b.node.is_some()).count(),
            metrics = metrics.len(),
            checks = checks.len(),
            "aggregation and metrics complete"
        );
        self.emit(PipelineEvent::ChecksCompleted {
            failed: checks.iter().filter(|c| !c.valid).cloned().collect(),
            total: checks.len(),
        });

        // Step 6: Model verdicts
        for (input, value) in &self.config.assumptions {
            model_inputs.insert(input.clone(), Some(Confidence::new(*value)));
        }
        let verdicts: Vec<_> = self
            .config
            .models
            .iter()
            .map(|model| self.config.blocking.evaluate(model, &model_inputs))
            .collect();
        for verdict in &verdicts {
            tracing::info!(
                model = %verdict.model,
                status = %verdict.status,
                overall = %verdict.overall_confidence,
                "model verdict"
            );
            self.emit(PipelineEvent::ModelEvaluated {
                model: verdict.model.clone(),
                status: verdict.status,
            });
        }

        // Step 7: Validate the finished graph
        let graph = builder.into_graph();
        let validation = graph.validate();
        let quality =
            graph.data_quality(Confidence::new(self.config.low_confidence_threshold));
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            valid = validation.is_valid(),
            coverage = quality.coverage,
            "lineage graph complete"
        );

        Ok(PipelineReport {
            graph,
            resolutions,
            resolution_stats,
            buckets,
            metrics,
            checks,
            model_inputs,
            verdicts,
            validation,
            quality,
        })
    }
}

/// Keep the lowest confidence seen for a blocking input.
fn lower(inputs: &mut BTreeMap<String, Option<Confidence>>, name: &str, confidence: Confidence) {
    let slot = inputs.entry(name.to_string()).or_insert(Some(confidence));
    if let Some(current) = slot {
        *current = current.min(confidence);
    }
}
