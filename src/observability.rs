use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::sql::Command;

// ── Request metrics ─────────────────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "classalloc_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "classalloc_query_duration_seconds";

/// Counter: allocation attempts. Labels: outcome (allocated, rejected).
pub const ALLOCATIONS_TOTAL: &str = "classalloc_allocations_total";

// ── Resource metrics ────────────────────────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "classalloc_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "classalloc_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "classalloc_connections_rejected_total";

/// Gauge: number of loaded tenants.
pub const TENANTS_ACTIVE: &str = "classalloc_tenants_active";

/// Histogram: journal group-commit flush duration in seconds.
pub const JOURNAL_FLUSH_DURATION_SECONDS: &str = "classalloc_journal_flush_duration_seconds";

/// Histogram: journal group-commit batch size (appends per flush).
pub const JOURNAL_FLUSH_BATCH_SIZE: &str = "classalloc_journal_flush_batch_size";

/// Counter: journal compactions. Labels: status.
pub const JOURNAL_COMPACTIONS_TOTAL: &str = "classalloc_journal_compactions_total";

/// Counter: failed calls to the remote data source. Labels: operation.
pub const DATA_SOURCE_ERRORS_TOTAL: &str = "classalloc_data_source_errors_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertRoom { .. } => "insert_room",
        Command::DeleteRoom { .. } => "delete_room",
        Command::InsertBooking { .. } => "insert_booking",
        Command::ResetSampleData => "reset_sample_data",
        Command::SelectRooms { .. } => "select_rooms",
        Command::SelectAdjacency => "select_adjacency",
        Command::SelectBookings { .. } => "select_bookings",
        Command::SelectConflicts => "select_conflicts",
        Command::SelectLogs { .. } => "select_logs",
        Command::SelectStatistics => "select_statistics",
        Command::SelectAlternatives { .. } => "select_alternatives",
        Command::Export { .. } => "export",
    }
}
