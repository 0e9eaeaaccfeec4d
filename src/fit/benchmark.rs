use crate::engine::dispatch::EngineHandle;
use crate::fit::cancel::CancelToken;
use crate::fit::report::BenchmarkReport;
use crate::foundation::error::{FitError, FitResult};
use crate::scene::list::SharedScene;
use std::time::Instant;

/// Time `cycles` rounds of render + statistic over every non-empty set.
pub(crate) fn run_benchmark(
    engine: &EngineHandle,
    scene: &SharedScene,
    cancel: &CancelToken,
    cycles: usize,
) -> FitResult<BenchmarkReport> {
    let summary = engine.data_info()?;
    if summary.total_allocated() == 0 {
        return Err(FitError::no_data("benchmark needs at least one data point"));
    }

    let start = Instant::now();
    let mut done = 0;
    let mut cancelled = false;
    let mut last_statistic = Vec::new();
    for _ in 0..cycles {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        last_statistic.clear();
        for (set, info) in summary.sets.iter().enumerate() {
            if info.allocated == 0 {
                continue;
            }
            scene.lock().set_time(info.ave_time);
            engine.render_sync()?;
            last_statistic.push(engine.statistic(set)?);
        }
        done += 1;
    }

    let report = BenchmarkReport {
        cycles: done,
        elapsed: start.elapsed(),
        cancelled,
        last_statistic,
    };
    tracing::info!(
        cycles = report.cycles,
        per_second = report.per_second(),
        cancelled,
        "benchmark finished"
    );
    Ok(report)
}
