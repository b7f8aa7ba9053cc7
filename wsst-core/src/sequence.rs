use crate::aggregate::AggregateResult;
use crate::error::RunError;
use crate::run::LoadTest;
use std::num::NonZeroUsize;
use tracing::info;

impl LoadTest {
    /// Run once per entry of `counts`, one after the other.
    ///
    /// Runs never overlap, so each measurement is free of load generated by the others. Results
    /// are returned in the order of `counts`.
    pub async fn run_sequence(
        &self,
        counts: &[NonZeroUsize],
    ) -> Result<Vec<AggregateResult>, RunError> {
        self.run_sequence_with(counts, |_| {}).await
    }

    /// Like [`LoadTest::run_sequence`], calling `on_result` after every run and before the next
    /// one starts.
    pub async fn run_sequence_with<F>(
        &self,
        counts: &[NonZeroUsize],
        mut on_result: F,
    ) -> Result<Vec<AggregateResult>, RunError>
    where
        F: FnMut(&AggregateResult),
    {
        let mut results = Vec::with_capacity(counts.len());
        for (i, connections) in counts.iter().enumerate() {
            info!("Run {}/{} with {connections} connections", i + 1, counts.len());
            let result = self.run(*connections).await?;
            on_result(&result);
            results.push(result);
        }
        Ok(results)
    }
}
