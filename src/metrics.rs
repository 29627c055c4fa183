pub fn register_metrics() {
    // Descriptions of labeled metrics
    metrics::describe_counter!(
        "sweepbot_deletions_scheduled_total",
        "Number of messages scheduled for deletion."
    );
    metrics::describe_counter!(
        "sweepbot_deletions_total",
        "Number of executed delete attempts, by status."
    );

    // Constant metrics

    // sweepbot_start_time_seconds
    metrics::describe_gauge!(
        "sweepbot_start_time_seconds",
        "Unix timestamp of the bot start time."
    );
    metrics::gauge!(
        "sweepbot_start_time_seconds",
        std::time::UNIX_EPOCH.elapsed().unwrap_or_default().as_secs_f64(),
    );

    // sweepbot_build_info
    metrics::describe_gauge!(
        "sweepbot_build_info",
        "A metric with a constant '1' value with the sweepbot build information."
    );
    metrics::gauge!(
        "sweepbot_build_info",
        1.0,
        "revision" => crate::version(),
    );
}
