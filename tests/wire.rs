use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage, SimpleQueryRow};
use ulid::Ulid;

use classalloc::tenant::TenantManager;
use classalloc::wire;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> (SocketAddr, Arc<TenantManager>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = std::env::temp_dir().join(format!("classalloc_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let tm = Arc::new(TenantManager::new(dir, 1000));

    let tm2 = tm.clone();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let tm = tm2.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, tm, "classalloc".to_string(), None).await;
            });
        }
    });

    (addr, tm)
}

async fn connect_db(addr: SocketAddr, dbname: &str, password: &str) -> Result<Client, tokio_postgres::Error> {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname(dbname)
        .user("registrar")
        .password(password);

    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    Ok(client)
}

async fn connect(addr: SocketAddr) -> Client {
    connect_db(addr, "test", "classalloc").await.unwrap()
}

async fn rows(client: &Client, sql: &str) -> Vec<SimpleQueryRow> {
    client
        .simple_query(sql)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|m| match m {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

fn sqlstate(err: &tokio_postgres::Error) -> &str {
    err.code().map(|c| c.code()).unwrap_or("")
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn new_tenant_lists_sample_rooms() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    let rooms = rows(&client, "SELECT * FROM rooms").await;
    assert_eq!(rooms.len(), 7);
    assert_eq!(rooms[0].get("room_id"), Some("101"));
    assert_eq!(rooms[0].get("building"), Some("Main"));
    assert_eq!(rooms[0].get("capacity"), Some("50"));
    assert_eq!(rooms[0].get("bookings_count"), Some("0"));
    assert!(rooms[0].get("adjacent").unwrap().contains("Main 102"));

    let science = rows(&client, "SELECT * FROM rooms WHERE building = 'Science'").await;
    assert_eq!(science.len(), 2);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (addr, _tm) = start_test_server().await;
    assert!(connect_db(addr, "test", "wrong").await.is_err());
}

#[tokio::test]
async fn allocate_then_query_schedule() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    let booked = rows(
        &client,
        "INSERT INTO bookings (course_name, instructor, date, start_time, end_time, capacity, building) \
         VALUES ('Algorithms', 'Dr. Knuth', '2025-01-01', '09:00', '10:00', 48, 'Main') RETURNING *",
    )
    .await;
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].get("room_id"), Some("101"));
    assert_eq!(booked[0].get("start_time"), Some("09:00"));
    let id = booked[0].get("booking_id").unwrap().to_string();

    let schedule = rows(&client, "SELECT * FROM bookings WHERE room_id = '101' AND building = 'Main'").await;
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].get("booking_id"), Some(id.as_str()));
    assert_eq!(schedule[0].get("course_name"), Some("Algorithms"));

    let logs = rows(&client, "SELECT * FROM logs WHERE kind = 'success'").await;
    assert_eq!(
        logs[0].get("message"),
        Some(format!("Allocated Main 101 for Algorithms (ID: {id})").as_str())
    );

    let stats = rows(&client, "SELECT * FROM statistics").await;
    assert_eq!(stats[0].get("total_bookings"), Some("1"));
    assert_eq!(stats[0].get("utilized_rooms"), Some("1"));
    assert_eq!(stats[0].get("utilization_rate"), Some("14.29"));
}

#[tokio::test]
async fn overlapping_request_reports_no_candidate() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    client
        .simple_query(
            "INSERT INTO bookings VALUES ('Algorithms', '2025-01-01', '09:00', '10:00', 48, NULL, 'Main')",
        )
        .await
        .unwrap();
    let err = client
        .simple_query(
            "INSERT INTO bookings VALUES ('Networks', '2025-01-01', '09:30', '10:30', 48, NULL, 'Main')",
        )
        .await
        .unwrap_err();
    assert_eq!(sqlstate(&err), "P0002");

    let ok = rows(
        &client,
        "INSERT INTO bookings VALUES ('Networks', '2025-01-01', '10:00', '11:00', 48, NULL, 'Main') RETURNING *",
    )
    .await;
    assert_eq!(ok[0].get("room_id"), Some("101"));

    assert!(rows(&client, "SELECT * FROM conflicts").await.is_empty());

    let alternatives = rows(
        &client,
        "SELECT * FROM alternatives WHERE room_id = '101' AND building = 'Main' \
         AND date = '2025-01-01' AND start_time = '09:30' AND end_time = '10:30'",
    )
    .await;
    assert_eq!(alternatives[0].get("room_id"), Some("102"));
}

#[tokio::test]
async fn room_management_errors_map_to_sqlstates() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    client
        .simple_query("INSERT INTO rooms (room_id, building, capacity, facilities) VALUES ('B1', 'Library', 20, 'whiteboard')")
        .await
        .unwrap();
    let err = client
        .simple_query("INSERT INTO rooms (room_id, building, capacity) VALUES ('B1', 'Library', 20)")
        .await
        .unwrap_err();
    assert_eq!(sqlstate(&err), "23505");

    let err = client
        .simple_query("DELETE FROM rooms WHERE room_id = 'nope' AND building = 'Library'")
        .await
        .unwrap_err();
    assert_eq!(sqlstate(&err), "42704");

    let err = client
        .simple_query("INSERT INTO rooms (room_id, building, capacity) VALUES ('B2', 'Library', 0)")
        .await
        .unwrap_err();
    assert_eq!(sqlstate(&err), "22023");

    let err = client.simple_query("SELECT * FROM buildings").await.unwrap_err();
    assert_eq!(sqlstate(&err), "42601");

    client
        .simple_query("DELETE FROM rooms WHERE room_id = 'B1' AND building = 'Library'")
        .await
        .unwrap();
    assert_eq!(rows(&client, "SELECT * FROM rooms").await.len(), 7);
}

#[tokio::test]
async fn truncate_resets_to_sample_data() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    client
        .simple_query("INSERT INTO rooms (room_id, building, capacity) VALUES ('B1', 'Library', 20)")
        .await
        .unwrap();
    client
        .simple_query("INSERT INTO bookings VALUES ('Seminar', '2025-01-01', '09:00', '10:00', 10)")
        .await
        .unwrap();

    client.simple_query("TRUNCATE rooms").await.unwrap();
    assert_eq!(rows(&client, "SELECT * FROM rooms").await.len(), 7);
    assert!(rows(&client, "SELECT * FROM bookings").await.is_empty());
    let logs = rows(&client, "SELECT * FROM logs").await;
    assert_eq!(logs.len(), 8);
    assert_eq!(logs[0].get("message"), Some("System initialized with sample data"));
}

#[tokio::test]
async fn export_documents() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    let export = rows(&client, "SELECT * FROM export WHERE kind = 'rooms'").await;
    let csv = export[0].get("document").unwrap();
    assert!(csv.starts_with("room_id,building,capacity,floor,facilities\n"));
    assert_eq!(csv.lines().count(), 8);

    let export = rows(&client, "SELECT * FROM export WHERE kind = 'logs'").await;
    assert_eq!(export[0].get("kind"), Some("logs"));
    assert_eq!(export[0].get("document").unwrap().lines().count(), 8);
}

#[tokio::test]
async fn extended_protocol_with_parameters() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    let booked = client
        .query(
            "INSERT INTO bookings (course_name, date, start_time, end_time, capacity) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
            &[&"O'Brien Seminar", &"2025-02-03", &"14:00", &"15:00", &"45"],
        )
        .await
        .unwrap();
    assert_eq!(booked.len(), 1);
    let room_id: &str = booked[0].get("room_id");
    let building: &str = booked[0].get("building");
    assert_eq!((room_id, building), ("101", "Main"));

    let main = client
        .query("SELECT * FROM rooms WHERE building = $1", &[&"Main"])
        .await
        .unwrap();
    assert_eq!(main.len(), 2);
}

#[tokio::test]
async fn tenants_are_isolated_by_database() {
    let (addr, tm) = start_test_server().await;
    let a = connect_db(addr, "campus_a", "classalloc").await.unwrap();
    let b = connect_db(addr, "campus_b", "classalloc").await.unwrap();

    a.simple_query("INSERT INTO rooms (room_id, building, capacity) VALUES ('B1', 'Library', 20)")
        .await
        .unwrap();
    assert_eq!(rows(&a, "SELECT * FROM rooms").await.len(), 8);
    assert_eq!(rows(&b, "SELECT * FROM rooms").await.len(), 7);
    assert_eq!(tm.len(), 2);
}

#[tokio::test]
async fn dollar_signs_in_parameters_are_kept() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    let booked = client
        .query(
            "INSERT INTO bookings (building, course_name, date, start_time, end_time, capacity) \
             VALUES ($1, $2, '2025-02-03', '14:00', '15:00', 20) RETURNING *",
            &[&"Main", &"Econ $1 pricing"],
        )
        .await
        .unwrap();
    let course: &str = booked[0].get("course_name");
    let building: &str = booked[0].get("building");
    assert_eq!((course, building), ("Econ $1 pricing", "Main"));
}

#[tokio::test]
async fn multiple_statements_are_rejected() {
    let (addr, _tm) = start_test_server().await;
    let client = connect(addr).await;

    let err = client
        .simple_query("SELECT * FROM rooms; DELETE FROM rooms WHERE room_id = '101' AND building = 'Main'")
        .await
        .unwrap_err();
    assert_eq!(sqlstate(&err), "42601");
    assert_eq!(rows(&client, "SELECT * FROM rooms").await.len(), 7);
}
