//! Run command implementation for the tandem CLI.
//!
//! Executes a plan against simulated work and reports progress as it goes.

use tandem_core::{AbortHandle, Executor, ProgressBus};

use crate::colors;
use crate::reporter::{self, Format};
use crate::workload::Plan;

/// Execute a plan.
pub async fn execute(plan: Plan, format: Format) -> anyhow::Result<()> {
    let bus = ProgressBus::new();
    reporter::attach(&bus, format);

    let handle = AbortHandle::new();
    let executor = Executor::new(plan.config.clone())?
        .with_abort_handle(handle.clone())
        .with_progress(bus);

    if format == Format::Text {
        print_header(&plan);
    }

    // Ctrl-C acts as the stop button.
    let ctrl_c = {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.abort();
            }
        })
    };
    let timer = plan.abort_after.map(|after| {
        let handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tracing::debug!("Stop requested after {:?}", after);
            handle.abort();
        })
    });

    let work = &plan.work;
    let result = executor
        .run(&plan.items, move |&item, index, _| work.perform(item, index))
        .await;

    ctrl_c.abort();
    if let Some(timer) = timer {
        timer.abort();
    }

    match result {
        Ok(output) => {
            reporter::print_results(&output, false, format);
            Ok(())
        }
        Err(aborted) => {
            reporter::print_results(&aborted.partial, true, format);
            Err(tandem_core::Error::from(aborted).into())
        }
    }
}

fn print_header(plan: &Plan) {
    let config = &plan.config;
    let mode = match config.chunk_size {
        Some(size) => format!("chunks of {size}"),
        None => format!("parallel limit {}", config.parallel_limit),
    };
    let detail = format!(
        "({} items, {}, min duration {}ms)",
        plan.items.len(),
        mode,
        config.min_duration.as_millis()
    );
    println!(
        "{} {}",
        colors::paint(colors::BOLD, &plan.title),
        colors::paint(colors::CYAN, detail)
    );
}
