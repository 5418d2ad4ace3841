mod check;
mod http;
mod prober;
mod sink;
mod throttle;
mod types;

pub use check::prefix_scheme;
pub use http::ProbeError;
pub use prober::{run_pool, Probe, Prober};
pub use sink::ReportSink;
pub use types::{CancelFlag, Outcome, ProbeConfig, StatusClass, ThrottleConfig};

pub async fn probe(target: &str) -> Result<Option<Outcome>, ProbeError> {
    Ok(Prober::new()?.probe_one(target).await)
}

pub async fn probe_many<I>(targets: I) -> Result<Vec<Outcome>, ProbeError>
where
    I: IntoIterator<Item = String>,
{
    let prober = Prober::new()?;
    let outcomes = prober.run(targets, CancelFlag::new(), ()).await;
    Ok(outcomes.into_iter().collect())
}
