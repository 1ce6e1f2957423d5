use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_offered_total: IntCounterVec,
    pub assignments_total: IntCounterVec,
    pub releases_total: IntCounter,
    pub claim_conflicts_total: IntCounter,
    pub ledger_open_entries: IntGauge,
    pub assignment_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_offered_total = IntCounterVec::new(
            Opts::new(
                "orders_offered_total",
                "Orders inserted into the availability ledger by urgency",
            ),
            &["urgency"],
        )
        .expect("valid orders_offered_total metric");

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Driver assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let releases_total =
            IntCounter::new("releases_total", "Completed driver releases")
                .expect("valid releases_total metric");

        let claim_conflicts_total = IntCounter::new(
            "claim_conflicts_total",
            "Claim attempts that lost to another driver or hit an expired offer",
        )
        .expect("valid claim_conflicts_total metric");

        let ledger_open_entries = IntGauge::new(
            "ledger_open_entries",
            "Current number of availability ledger entries",
        )
        .expect("valid ledger_open_entries metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of assignment workflows in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        registry
            .register(Box::new(orders_offered_total.clone()))
            .expect("register orders_offered_total");
        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(releases_total.clone()))
            .expect("register releases_total");
        registry
            .register(Box::new(claim_conflicts_total.clone()))
            .expect("register claim_conflicts_total");
        registry
            .register(Box::new(ledger_open_entries.clone()))
            .expect("register ledger_open_entries");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");

        Self {
            registry,
            orders_offered_total,
            assignments_total,
            releases_total,
            claim_conflicts_total,
            ledger_open_entries,
            assignment_latency_seconds,
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
