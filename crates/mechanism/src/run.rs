use {
    crate::domain::{Error, Mechanism, Outcome},
    futures::future,
    optimizer::Optimizer,
    std::sync::Arc,
    tracing::Instrument,
};

/// Solves independent auctions concurrently on the blocking thread pool.
/// Results are in the order of `mechanisms`.
pub async fn solve_all<O>(mechanisms: Vec<Arc<Mechanism<O>>>) -> Vec<Result<Outcome, Error>>
where
    O: Optimizer + 'static,
{
    let solves = mechanisms.into_iter().enumerate().map(|(index, mechanism)| {
        let span = tracing::info_span!("auction", index);
        let solve = span.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let _entered = solve.entered();
                mechanism.solve_it().cloned()
            })
            .await
            .expect("auction solve unexpected panic")
        }
        .instrument(span)
    });
    future::join_all(solves).await
}
