use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub job_transitions_total: IntCounterVec,
    pub acceptance_conflicts_total: IntCounter,
    pub secret_code_mismatches_total: IntCounter,
    pub active_subscriptions: IntGauge,
    pub payment_wait_seconds: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let job_transitions_total = IntCounterVec::new(
            Opts::new("job_transitions_total", "Job status transitions by new status"),
            &["status"],
        )
        .expect("valid job_transitions_total metric");

        let acceptance_conflicts_total = IntCounter::new(
            "acceptance_conflicts_total",
            "Accept attempts that lost the race to another agent",
        )
        .expect("valid acceptance_conflicts_total metric");

        let secret_code_mismatches_total = IntCounter::new(
            "secret_code_mismatches_total",
            "Proof-of-delivery attempts with a wrong code",
        )
        .expect("valid secret_code_mismatches_total metric");

        let active_subscriptions = IntGauge::new(
            "active_subscriptions",
            "Registered live job subscriptions across all sessions",
        )
        .expect("valid active_subscriptions metric");

        let payment_wait_seconds = HistogramVec::new(
            HistogramOpts::new(
                "payment_wait_seconds",
                "Time spent waiting for the checkout client secret",
            ),
            &["outcome"],
        )
        .expect("valid payment_wait_seconds metric");

        registry
            .register(Box::new(job_transitions_total.clone()))
            .expect("register job_transitions_total");
        registry
            .register(Box::new(acceptance_conflicts_total.clone()))
            .expect("register acceptance_conflicts_total");
        registry
            .register(Box::new(secret_code_mismatches_total.clone()))
            .expect("register secret_code_mismatches_total");
        registry
            .register(Box::new(active_subscriptions.clone()))
            .expect("register active_subscriptions");
        registry
            .register(Box::new(payment_wait_seconds.clone()))
            .expect("register payment_wait_seconds");

        Self {
            registry,
            job_transitions_total,
            acceptance_conflicts_total,
            secret_code_mismatches_total,
            active_subscriptions,
            payment_wait_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
