//! Terminal reporting of run progress and results.

use tandem_core::{ProgressBus, RunOutput, Slot, TaskEvent};

use crate::colors;

/// How events and results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    /// One JSON object per line.
    Json,
}

/// Print every event published on `bus`.
pub fn attach(bus: &ProgressBus, format: Format) {
    bus.subscribe_all(move |event| match format {
        Format::Text => println!("{}", describe(event)),
        Format::Json => match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Failed to encode event: {}", e),
        },
    });
}

/// Human-readable line for an event. Tasks are numbered from 1.
pub fn describe(event: &TaskEvent) -> String {
    let text = match event {
        TaskEvent::Started { index } => format!("Task {} started", index + 1),
        TaskEvent::Completed { index, duration_ms } => {
            format!("Task {} completed ({}ms)", index + 1, duration_ms)
        }
        TaskEvent::Failed { index, error } => format!("Task {} failed: {}", index + 1, error),
        TaskEvent::Aborted { reason } => format!("Aborted! ({reason})"),
    };
    colors::paint(colors::for_event(event.kind()), text)
}

/// Render slots as a list: values, `failed`, or `-` for never attempted.
pub fn format_slots(slots: &[Slot<u64, String>]) -> String {
    let parts: Vec<String> = slots
        .iter()
        .map(|slot| match slot {
            Slot::Completed(value) => value.to_string(),
            Slot::Failed(_) => "failed".to_string(),
            Slot::NotAttempted => "-".to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

/// Print the outcome of a run.
pub fn print_results(output: &RunOutput<u64, String>, aborted: bool, format: Format) {
    let stats = output.stats();
    match format {
        Format::Text => {
            println!("\n{} {}", colors::paint(colors::BOLD, "Results:"), format_slots(output.slots()));
            let label = if aborted {
                colors::paint(colors::YELLOW, "Aborted")
            } else {
                colors::paint(colors::GREEN, "Completed")
            };
            let detail = format!(
                "(failed: {}, dropped after abort: {}, peak concurrency: {})",
                stats.failed, stats.discarded, stats.peak_concurrency
            );
            println!(
                "{} {} of {} items in {:.2}s {}",
                label,
                stats.completed,
                output.len(),
                stats.elapsed.as_secs_f64(),
                colors::paint(colors::DIM, detail)
            );
        }
        Format::Json => {
            let values: Vec<serde_json::Value> = output
                .slots()
                .iter()
                .map(|slot| match slot {
                    Slot::Completed(value) => serde_json::json!(value),
                    Slot::Failed(error) => serde_json::json!({ "error": error }),
                    Slot::NotAttempted => serde_json::Value::Null,
                })
                .collect();
            let summary = serde_json::json!({
                "type": "result",
                "aborted": aborted,
                "values": values,
                "completed": stats.completed,
                "failed": stats.failed,
                "discarded": stats.discarded,
                "peak_concurrency": stats.peak_concurrency,
                "elapsed_ms": stats.elapsed.as_millis() as u64,
            });
            println!("{summary}");
        }
    }
}
