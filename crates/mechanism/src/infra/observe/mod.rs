use crate::domain::{PaymentRule, Resolution};

pub mod metrics;

pub fn solving(rule: PaymentRule) {
    metrics::get()
        .solves
        .with_label_values(&[rule.as_str()])
        .inc();
}

pub fn resolved(rule: PaymentRule, resolution: &Resolution) {
    metrics::get()
        .resolutions
        .with_label_values(&[rule.as_str(), resolution.label()])
        .inc();
}

pub fn core_iterations(iterations: usize) {
    metrics::get().core_iterations.observe(iterations as f64);
}

pub fn optimizer_call() {
    metrics::get().optimizer_calls.inc();
}
