use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use tokio_postgres::{Config, NoTls};
use ulid::Ulid;

async fn connect(host: &str, port: u16, dbname: &str) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname(dbname)
        .user("classalloc")
        .password("classalloc");

    let (client, conn) = config.connect(NoTls).await.expect("connect failed");
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            eprintln!("connection error: {e}");
        }
    });
    client
}

/// Fresh tenant per phase so phases do not see each other's bookings.
fn tenant() -> String {
    format!("bench_{}", Ulid::new())
}

fn nth_day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Days::new(n)
}

fn booking_sql(course: &str, date: NaiveDate, start_hour: u32, capacity: u32) -> String {
    format!(
        "INSERT INTO bookings (course_name, date, start_time, end_time, capacity) \
         VALUES ('{course}', '{date}', '{start_hour:02}:00', '{:02}:00', {capacity})",
        start_hour + 1
    )
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

async fn phase1_sequential(host: &str, port: u16) {
    let client = connect(host, port, &tenant()).await;

    let n = 2000u64;
    let mut latencies = Vec::with_capacity(n as usize);
    let start = Instant::now();

    for i in 0..n {
        let sql = booking_sql(&format!("Course {i}"), nth_day(i), 9, 20);
        let t = Instant::now();
        client.batch_execute(&sql).await.unwrap();
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!("  {n} allocations in {:.2}s = {ops:.0} ops/sec", elapsed.as_secs_f64());
    print_latency("allocation latency", &mut latencies);
}

/// Many connections allocate into one tenant. Each (day, hour) fits the seven
/// sample rooms, so some requests are expected to find no room.
async fn phase2_contended(host: &str, port: u16) {
    let db = tenant();
    let n_tasks = 10;
    let n_per_task = 100u64;
    let allocated = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let mut handles = Vec::new();

    for task in 0..n_tasks {
        let host = host.to_string();
        let db = db.clone();
        let allocated = allocated.clone();
        let rejected = rejected.clone();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &db).await;
            for j in 0..n_per_task {
                let sql = booking_sql(&format!("T{task} C{j}"), nth_day(j / 8), 8 + (j % 8) as u32, 25);
                match client.batch_execute(&sql).await {
                    Ok(()) => allocated.fetch_add(1, Ordering::Relaxed),
                    Err(_) => rejected.fetch_add(1, Ordering::Relaxed),
                };
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks as u64 * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} requests = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
    println!(
        "  allocated={}, rejected={}",
        allocated.load(Ordering::Relaxed),
        rejected.load(Ordering::Relaxed)
    );

    let client = connect(host, port, &db).await;
    let conflicts = client.simple_query("SELECT * FROM conflicts").await.unwrap();
    let conflict_rows = conflicts
        .iter()
        .filter(|m| matches!(m, tokio_postgres::SimpleQueryMessage::Row(_)))
        .count();
    println!("  conflicts after run: {conflict_rows}");
}

async fn phase3_read_under_load(host: &str, port: u16) {
    let db = tenant();

    let setup_client = connect(host, port, &db).await;
    for i in 0..200u64 {
        let sql = booking_sql(&format!("Prefill {i}"), nth_day(i), 9, 20);
        setup_client.batch_execute(&sql).await.unwrap();
    }
    drop(setup_client);

    let stop = Arc::new(AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for w in 0..5u64 {
        let host = host.to_string();
        let db = db.clone();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &db).await;
            let mut i = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let sql = booking_sql(&format!("W{w} {i}"), nth_day(1000 + w * 10_000 + i), 14, 20);
                let _ = client.batch_execute(&sql).await;
                i += 1;
            }
        }));
    }

    let n_readers = 10;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();

    for r in 0..n_readers {
        let host = host.to_string();
        let db = db.clone();
        reader_handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &db).await;
            let queries = [
                "SELECT * FROM rooms",
                "SELECT * FROM statistics",
                "SELECT * FROM bookings WHERE room_id = 'LAB-A' AND building = 'Science'",
            ];
            let mut latencies = Vec::with_capacity(reads_per_reader);
            for i in 0..reads_per_reader {
                let t = Instant::now();
                client
                    .batch_execute(queries[(r + i) % queries.len()])
                    .await
                    .unwrap();
                latencies.push(t.elapsed());
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for h in reader_handles {
        all_latencies.extend(h.await.unwrap());
    }

    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("read latency", &mut all_latencies);
}

async fn phase4_connection_storm(host: &str, port: u16) {
    let n_conns = 50;
    let ops_per_conn = 10u64;

    let start = Instant::now();
    let mut handles = Vec::new();
    let success = Arc::new(AtomicUsize::new(0));

    for _ in 0..n_conns {
        let host = host.to_string();
        let success = success.clone();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &tenant()).await;
            for i in 0..ops_per_conn {
                let sql = booking_sql(&format!("Storm {i}"), nth_day(i), 10, 30);
                client.batch_execute(&sql).await.unwrap();
            }
            success.fetch_add(1, Ordering::Relaxed);
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let elapsed = start.elapsed();
    let ok = success.load(Ordering::Relaxed);
    println!(
        "  {n_conns} connections (one tenant each), {ops_per_conn} allocations each: {ok}/{n_conns} succeeded in {:.2}s",
        elapsed.as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let host = std::env::var("CLASSALLOC_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("CLASSALLOC_PORT")
        .unwrap_or_else(|_| "5433".into())
        .parse()
        .expect("invalid CLASSALLOC_PORT");

    println!("=== classalloc stress benchmark ===");
    println!("target: {host}:{port}\n");

    println!("[phase 1] sequential allocation throughput");
    phase1_sequential(&host, port).await;

    println!("\n[phase 2] contended allocation into one tenant");
    phase2_contended(&host, port).await;

    println!("\n[phase 3] read latency under allocation load");
    phase3_read_under_load(&host, port).await;

    println!("\n[phase 4] connection storm");
    phase4_connection_storm(&host, port).await;

    println!("\n=== benchmark complete ===");
}
