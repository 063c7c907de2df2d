//! Core Extractor implementation

use crate::catalog::SlotCatalog;
use crate::config::ExtractorConfig;
use crate::decoder::decode;
use crate::error::ExtractorError;
use crate::prompt::build_prompt;
use anamnesis_domain::{
    ExtractionRequest, ExtractionResult, ResultSink, RunId, RunSummary, SlotSpec, SlotValue,
};
use anamnesis_llm::client::cancelled;
use anamnesis_llm::{InferenceBackend, InferenceClient, OllamaProvider};
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, Stream, StreamExt};
use futures_util::FutureExt;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The Extractor fans one narrative out to every slot of a catalog
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    /// Create a new Extractor, rejecting an invalid configuration
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self { config })
    }

    /// The active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Open a fresh Ollama connection pool sized to the in-flight ceiling
    ///
    /// Each run should get its own pool; it is released when the run ends.
    pub fn connect(&self) -> Result<OllamaProvider, ExtractorError> {
        let provider = OllamaProvider::with_pool_size(
            self.config.endpoint.as_str(),
            self.config.model.as_str(),
            self.config.max_in_flight,
        )?;
        Ok(provider)
    }

    /// Start a run of `slots` over `narrative`
    ///
    /// Nothing happens until the returned [`ExtractionRun`] is polled. The
    /// backend moves into the run and is dropped with it.
    pub fn run<B>(&self, backend: B, narrative: &str, slots: &[SlotSpec]) -> ExtractionRun<B>
    where
        B: InferenceBackend + 'static,
    {
        let run_id = RunId::new();
        let cancel = CancellationToken::new();
        let client = Arc::new(
            InferenceClient::new(backend, self.config.retry_policy(), self.config.max_in_flight)
                .with_cancellation(cancel.clone()),
        );
        let narrative: Arc<str> = Arc::from(narrative);

        info!(
            "Run {} starting: {} slots, model '{}', at most {} in flight",
            run_id,
            slots.len(),
            client.backend().model_name(),
            client.max_in_flight()
        );

        let stagger = self.config.stagger();
        let default_budget = self.config.default_max_output_tokens;
        let pending = slots
            .iter()
            .enumerate()
            .map(|(position, slot)| {
                let task = SlotTask {
                    client: Arc::clone(&client),
                    slot: slot.clone(),
                    narrative: Arc::clone(&narrative),
                    delay: stagger * position as u32,
                    default_budget,
                    cancel: cancel.clone(),
                };
                task.execute().boxed()
            })
            .collect();

        ExtractionRun {
            run_id,
            narrative,
            client,
            pending,
            total: slots.len(),
            yielded: 0,
            started: Instant::now(),
            cancel,
        }
    }

    /// Start a run over every slot of `catalog`
    pub fn run_catalog<B>(
        &self,
        backend: B,
        narrative: &str,
        catalog: &SlotCatalog,
    ) -> ExtractionRun<B>
    where
        B: InferenceBackend + 'static,
    {
        self.run(backend, narrative, catalog.get_slots())
    }

    /// Extract every catalog slot against the configured Ollama endpoint,
    /// forwarding results to `sink` as they complete
    ///
    /// Only setup failures are returned as errors; slot failures are part of
    /// the results.
    pub async fn extract<S>(
        &self,
        narrative: &str,
        catalog: &SlotCatalog,
        sink: S,
    ) -> Result<RunSummary, ExtractorError>
    where
        S: ResultSink,
        S::Error: Display,
    {
        let backend = self.connect()?;
        Ok(self.run_catalog(backend, narrative, catalog).drain(sink).await)
    }
}

/// One in-progress pipeline run
///
/// Yields exactly one [`ExtractionResult`] per slot, in completion order.
/// Dropping an unfinished run abandons its pending requests; [`cancel`]
/// instead turns them into `network_exception` results.
///
/// [`cancel`]: ExtractionRun::cancel
pub struct ExtractionRun<B> {
    run_id: RunId,
    narrative: Arc<str>,
    client: Arc<InferenceClient<B>>,
    pending: FuturesUnordered<BoxFuture<'static, ExtractionResult>>,
    total: usize,
    yielded: usize,
    started: Instant,
    cancel: CancellationToken,
}

impl<B> ExtractionRun<B> {
    /// Identifier of this run
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The narrative every slot is extracted from
    pub fn narrative(&self) -> &str {
        &self.narrative
    }

    /// Number of slots in the run
    pub fn len(&self) -> usize {
        self.total
    }

    /// Whether the run has no slots at all
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Slots that have not produced a result yet
    pub fn remaining(&self) -> usize {
        self.total - self.yielded
    }

    /// The backend shared by every slot of the run
    pub fn backend(&self) -> &B {
        self.client.backend()
    }

    /// Token that cancels all pending work of this run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel all pending work; remaining slots complete as failures
    pub fn cancel(&self) {
        info!("Run {} cancelled with {} slots pending", self.run_id, self.remaining());
        self.cancel.cancel();
    }

    /// Wait for every slot and return the results in completion order
    pub async fn collect_all(self) -> Vec<ExtractionResult> {
        self.collect().await
    }

    /// Forward every result to `sink` as it arrives
    ///
    /// Sink errors are logged and never stop the run.
    pub async fn drain<S>(mut self, mut sink: S) -> RunSummary
    where
        S: ResultSink,
        S::Error: Display,
    {
        if let Err(e) = sink.begin(self.run_id, &self.narrative) {
            warn!("Run {}: sink failed to open session: {}", self.run_id, e);
        }

        let mut failed = 0;
        let mut completed = 0;
        while let Some(result) = self.next().await {
            completed += 1;
            if result.is_error() {
                failed += 1;
            }
            if let Err(e) = sink.accept(&result) {
                warn!("Run {}: sink rejected slot '{}': {}", self.run_id, result.slot_id, e);
            }
        }

        let summary = RunSummary {
            run_id: self.run_id,
            completed,
            failed,
            elapsed: self.started.elapsed(),
        };

        info!(
            "Run {} finished: {}/{} slots succeeded in {:.2}s",
            summary.run_id,
            summary.succeeded(),
            summary.completed,
            summary.elapsed_seconds()
        );

        if let Err(e) = sink.finish(&summary) {
            warn!("Run {}: sink failed to close session: {}", self.run_id, e);
        }

        summary
    }
}

impl<B> Stream for ExtractionRun<B> {
    type Item = ExtractionResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.pending.poll_next_unpin(cx);
        if let Poll::Ready(Some(result)) = &polled {
            self.yielded += 1;
            debug!(
                "Run {}: slot '{}' done ({}/{})",
                self.run_id, result.slot_id, self.yielded, self.total
            );
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

/// Everything one slot needs to produce its result
struct SlotTask<B> {
    client: Arc<InferenceClient<B>>,
    slot: SlotSpec,
    narrative: Arc<str>,
    delay: Duration,
    default_budget: u32,
    cancel: CancellationToken,
}

impl<B: InferenceBackend> SlotTask<B> {
    async fn execute(self) -> ExtractionResult {
        // 1. Staggered start
        if !self.delay.is_zero() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let value = SlotValue::Failed(cancelled());
                    return ExtractionResult::new(self.slot.id, value, Duration::ZERO);
                }
                _ = sleep(self.delay) => {}
            }
        }

        let started = Instant::now();

        // 2. Prompt
        let request = ExtractionRequest {
            slot_id: self.slot.id.clone(),
            prompt: build_prompt(&self.slot, &self.narrative),
            max_output_tokens: self.slot.output_budget(self.default_budget),
        };
        debug!(
            "Slot '{}' prompt: {} chars, budget {}",
            request.slot_id,
            request.prompt.len(),
            request.max_output_tokens
        );

        // 3. Inference, then 4. decoding
        let value = match self.client.call(&request).await {
            Ok(raw) => SlotValue::from(decode(&raw, self.slot.shape_template.as_ref())),
            Err(e) => SlotValue::Failed(e),
        };

        if let Some(e) = value.error() {
            warn!("Slot '{}' failed: {}", self.slot.id, e);
        }

        ExtractionResult::new(self.slot.id, value, started.elapsed())
    }
}
