//! Built-in demo scenarios.

use std::time::Duration;

use clap::ValueEnum;
use tandem_core::ExecutorConfig;

use crate::workload::{Plan, SimulatedWork};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Double five numbers, all at once (100ms each)
    Double,
    /// One at a time with a 100ms floor over 500ms tasks
    Throttle,
    /// Ten tasks with random latency, three at a time
    Random,
    /// Two at a time, stopped after one second
    Abort,
    /// Fifty items in chunks of ten
    Chunks,
    /// Five tasks, two at a time
    Observable,
}

impl Scenario {
    pub fn plan(self) -> Plan {
        let ms = Duration::from_millis;
        match self {
            Self::Double => Plan {
                title: "Double".to_string(),
                items: (1..=5).collect(),
                work: SimulatedWork::new(ms(100), 2),
                config: ExecutorConfig::default().with_parallel_limit(5),
                abort_after: None,
            },
            Self::Throttle => Plan {
                title: "Throttle".to_string(),
                items: (1..=5).collect(),
                work: SimulatedWork::new(ms(500), 3),
                config: ExecutorConfig::sequential().with_min_duration(ms(100)),
                abort_after: None,
            },
            Self::Random => Plan {
                title: "Random latency".to_string(),
                items: (1..=10).collect(),
                work: SimulatedWork {
                    jitter: true,
                    ..SimulatedWork::new(ms(1000), 1)
                },
                config: ExecutorConfig::default(),
                abort_after: None,
            },
            Self::Abort => Plan {
                title: "Abort".to_string(),
                items: (1..=5).collect(),
                work: SimulatedWork::new(ms(500), 3),
                config: ExecutorConfig::default()
                    .with_parallel_limit(2)
                    .with_min_duration(ms(100)),
                abort_after: Some(ms(1000)),
            },
            Self::Chunks => Plan {
                title: "Chunks".to_string(),
                items: (1..=50).collect(),
                work: SimulatedWork::new(ms(300), 1),
                config: ExecutorConfig::chunked(10),
                abort_after: None,
            },
            Self::Observable => Plan {
                title: "Observable".to_string(),
                items: (1..=5).collect(),
                work: SimulatedWork::new(ms(500), 2),
                config: ExecutorConfig::default().with_parallel_limit(2),
                abort_after: None,
            },
        }
    }
}
