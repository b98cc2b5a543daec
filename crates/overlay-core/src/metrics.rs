//! Counters and histograms for overlay activity.

use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_load(outcome: &'static str, elapsed: Duration) {
    counter!("overlay_loads_total", "outcome" => outcome).increment(1);
    histogram!("overlay_load_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}

pub fn record_hover(outcome: &'static str) {
    counter!("overlay_hover_queries_total", "outcome" => outcome).increment(1);
}

pub fn record_range_edit(outcome: &'static str) {
    counter!("overlay_range_edits_total", "outcome" => outcome).increment(1);
}
