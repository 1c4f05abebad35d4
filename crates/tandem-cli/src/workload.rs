//! Simulated per-item work used by demos and ad-hoc runs.

use std::time::Duration;

use rand::Rng;
use tandem_core::ExecutorConfig;

/// A fake operation: sleep, then either multiply the item or fail.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    /// Base latency of every item.
    pub latency: Duration,
    /// Replace the fixed latency with a random one in `0..=latency`.
    pub jitter: bool,
    /// Fail every k-th item (1-based position).
    pub fail_every: Option<usize>,
    /// Value returned for item `n` is `n * multiplier`.
    pub multiplier: u64,
}

impl SimulatedWork {
    pub fn new(latency: Duration, multiplier: u64) -> Self {
        Self {
            latency,
            jitter: false,
            fail_every: None,
            multiplier,
        }
    }

    /// Latency for the next item.
    pub fn latency(&self) -> Duration {
        if self.jitter && !self.latency.is_zero() {
            let max = self.latency.as_millis() as u64;
            Duration::from_millis(rand::thread_rng().gen_range(0..=max))
        } else {
            self.latency
        }
    }

    /// Whether the item at `index` is set up to fail.
    pub fn fails(&self, index: usize) -> bool {
        self.fail_every.is_some_and(|k| k > 0 && (index + 1) % k == 0)
    }

    /// Run the simulated operation for one item.
    pub async fn perform(&self, item: u64, index: usize) -> Result<u64, String> {
        let latency = self.latency();
        tracing::trace!(index, latency_ms = latency.as_millis() as u64, "Simulating work");
        tokio::time::sleep(latency).await;
        if self.fails(index) {
            Err(format!("item {item} rejected"))
        } else {
            Ok(item * self.multiplier)
        }
    }
}

/// Everything needed for one run.
#[derive(Debug, Clone)]
pub struct Plan {
    pub title: String,
    pub items: Vec<u64>,
    pub work: SimulatedWork,
    pub config: ExecutorConfig,
    /// Signal abort after this long, like pressing a stop button.
    pub abort_after: Option<Duration>,
}
