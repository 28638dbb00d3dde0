//! Viewer metric names and recording helpers.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

use crate::commands::Intent;

pub fn describe() {
    describe_counter!("viewer_commands_total", "Commands applied to the navigation state");
    describe_counter!("viewer_command_errors_total", "Commands rejected by their transition");
    describe_counter!("viewer_stale_responses_total", "Loads discarded because navigation moved on");
    describe_counter!("viewer_load_failures_total", "Loads that left the previous frame in place");
    describe_histogram!("viewer_render_duration_seconds", "Time to render a canvas or overlay");
    describe_counter!("climate_cache_hits_total", "Dataset cache hits");
    describe_counter!("climate_cache_misses_total", "Dataset cache misses");
    describe_counter!("climate_fetches_total", "Documents fetched from the data source");
}

pub fn record_command(intent: Intent) {
    counter!("viewer_commands_total", "intent" => format!("{:?}", intent)).increment(1);
}

pub fn record_command_error(intent: Intent) {
    counter!("viewer_command_errors_total", "intent" => format!("{:?}", intent)).increment(1);
}

pub fn record_stale_response() {
    counter!("viewer_stale_responses_total").increment(1);
}

pub fn record_load_failure() {
    counter!("viewer_load_failures_total").increment(1);
}

pub fn record_render(kind: &'static str, elapsed: Duration) {
    histogram!("viewer_render_duration_seconds", "kind" => kind).record(elapsed.as_secs_f64());
}
