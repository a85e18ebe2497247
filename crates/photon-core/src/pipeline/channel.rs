//! Bounded channels for backpressure in the processing pipeline.

use tokio::sync::mpsc;

use crate::config::PipelineConfig;

/// Create a bounded channel pair with the configured buffer size.
///
/// When the buffer is full, the sender will block, providing backpressure
/// to prevent memory exhaustion during batch processing.
pub fn bounded_channel<T>(config: &PipelineConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.buffer_size)
}

/// A pipeline stage that processes items with backpressure.
///
/// This is a utility for building multi-stage processing pipelines
/// where each stage pulls from an input channel and pushes to an output channel.
pub struct PipelineStage<I, O> {
    input: mpsc::Receiver<I>,
    output: mpsc::Sender<O>,
}

impl<I, O> PipelineStage<I, O> {
    /// Create a new pipeline stage.
    pub fn new(input: mpsc::Receiver<I>, output: mpsc::Sender<O>) -> Self {
        Self { input, output }
    }

    /// Run the stage with a processing function.
    ///
    /// The function `f` is called for each input item. If it returns `Some(output)`,
    /// the output is sent to the next stage. If it returns `None`, the item is dropped.
    pub async fn run<F, Fut>(mut self, f: F)
    where
        F: Fn(I) -> Fut,
        Fut: std::future::Future<Output = Option<O>>,
    {
        while let Some(item) = self.input.recv().await {
            if let Some(result) = f(item).await {
                if self.output.send(result).await.is_err() {
                    // Downstream closed, stop processing
                    break;
                }
            }
        }
    }

    /// Run the stage with a fallible processing function.
    ///
    /// Similar to `run`, but the processing function can return a `Result`.
    /// Errors are logged and the item is skipped.
    pub async fn run_fallible<F, Fut, E>(mut self, f: F)
    where
        F: Fn(I) -> Fut,
        Fut: std::future::Future<Output = Result<O, E>>,
        E: std::fmt::Display,
    {
        while let Some(item) = self.input.recv().await {
            match f(item).await {
                Ok(result) => {
                    if self.output.send(result).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Pipeline stage error: {}", e);
                }
            }
        }
    }
}
