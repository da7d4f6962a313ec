use std::fmt::Debug;
use std::io;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::Sink;
use futures::stream;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::ClassallocAuthSource;
use crate::engine::{Engine, EngineError};
use crate::export::format_timestamp;
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command, ExportKind, SqlError};
use crate::tenant::TenantManager;

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    tenant_manager: Arc<TenantManager>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> io::Result<()> {
    let factory = ClassallocFactory::new(tenant_manager, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

pub struct ClassallocHandler {
    tenant_manager: Arc<TenantManager>,
    query_parser: Arc<ClassallocQueryParser>,
}

impl ClassallocHandler {
    pub fn new(tenant_manager: Arc<TenantManager>) -> Self {
        Self {
            tenant_manager,
            query_parser: Arc::new(ClassallocQueryParser),
        }
    }

    async fn resolve_engine(&self, db: String) -> PgWireResult<Arc<Engine>> {
        self.tenant_manager.get_or_create(&db).await.map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("tenant error: {e}"),
            )))
        })
    }

    async fn run(&self, engine: &Engine, sql: &str) -> PgWireResult<Response> {
        let cmd = sql::parse_sql(sql).map_err(sql_err)?;
        let label = observability::command_label(&cmd);
        let start = Instant::now();
        let result = self.execute_command(engine, cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(start.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Response> {
        match cmd {
            Command::InsertRoom { room } => {
                engine.add_room(room).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_oid(0).with_rows(1)))
            }
            Command::DeleteRoom { key } => {
                engine.remove_room(&key).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("DELETE").with_rows(1)))
            }
            Command::InsertBooking { request, returning } => {
                let record = engine.allocate(request).await.map_err(engine_err)?;
                if returning {
                    Ok(bookings_response([&record]))
                } else {
                    Ok(Response::Execution(Tag::new("INSERT").with_oid(0).with_rows(1)))
                }
            }
            Command::ResetSampleData => {
                engine.reset_to_sample_data().await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("TRUNCATE TABLE")))
            }
            Command::SelectRooms { building } => {
                let rooms = engine.rooms(building.as_deref()).await;
                Ok(rooms_response(&rooms))
            }
            Command::SelectAdjacency => {
                let edges = engine.adjacency_edges().await;
                let schema = Arc::new(adjacency_schema());
                let rows: Vec<PgWireResult<_>> = edges
                    .into_iter()
                    .map(|(a, b, kind)| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&a.room_id)?;
                        encoder.encode_field(&a.building)?;
                        encoder.encode_field(&b.room_id)?;
                        encoder.encode_field(&b.building)?;
                        encoder.encode_field(&kind.as_str().to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
            Command::SelectBookings { room_id, building } => {
                let schedule = engine.schedule(room_id.as_deref(), building.as_deref()).await;
                Ok(bookings_response(schedule.iter().map(|e| &e.booking)))
            }
            Command::SelectConflicts => {
                let conflicts = engine.conflicts().await;
                let schema = Arc::new(conflicts_schema());
                let rows: Vec<PgWireResult<_>> = conflicts
                    .into_iter()
                    .map(|c| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&c.room.room_id)?;
                        encoder.encode_field(&c.room.building)?;
                        encoder.encode_field(&c.first.date().to_string())?;
                        encoder.encode_field(&c.first.id.to_string())?;
                        encoder.encode_field(&c.first.request.course_name)?;
                        encoder.encode_field(&c.first.slot().to_string())?;
                        encoder.encode_field(&c.second.id.to_string())?;
                        encoder.encode_field(&c.second.request.course_name)?;
                        encoder.encode_field(&c.second.slot().to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
            Command::SelectLogs { kind } => {
                let logs = engine.logs(kind).await;
                let schema = Arc::new(logs_schema());
                let rows: Vec<PgWireResult<_>> = logs
                    .into_iter()
                    .map(|entry| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&entry.kind.as_str().to_string())?;
                        encoder.encode_field(&entry.message)?;
                        encoder.encode_field(&format_timestamp(entry.timestamp))?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
            Command::SelectStatistics => {
                let stats = engine.statistics().await;
                let schema = Arc::new(statistics_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&(stats.total_rooms as i64))?;
                encoder.encode_field(&(stats.total_bookings as i64))?;
                encoder.encode_field(&(stats.utilized_rooms as i64))?;
                encoder.encode_field(&stats.utilization_rate)?;
                encoder.encode_field(&(stats.conflicts as i64))?;
                let rows = vec![Ok(encoder.take_row())];
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
            Command::SelectAlternatives { start, date, slot } => {
                let rooms = engine.alternatives(&start, date, &slot).await;
                let schema = Arc::new(alternatives_schema());
                let rows: Vec<PgWireResult<_>> = rooms
                    .into_iter()
                    .map(|room| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&room.room_id)?;
                        encoder.encode_field(&room.building)?;
                        encoder.encode_field(&i64::from(room.capacity))?;
                        encoder.encode_field(&room.floor)?;
                        encoder.encode_field(&room.facilities.to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
            Command::Export { kind } => {
                let (name, bytes) = match kind {
                    ExportKind::Rooms => ("rooms", engine.export_rooms_csv().await),
                    ExportKind::Logs => ("logs", engine.export_logs_text().await),
                };
                let schema = Arc::new(export_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&name.to_string())?;
                encoder.encode_field(&String::from_utf8_lossy(&bytes).into_owned())?;
                let rows = vec![Ok(encoder.take_row())];
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
        }
    }
}

fn rooms_response(rooms: &[RoomInfo]) -> Response {
    let schema = Arc::new(rooms_schema());
    let rows: Vec<PgWireResult<_>> = rooms
        .iter()
        .map(|info| {
            let adjacent = info
                .adjacent
                .iter()
                .map(RoomKey::to_string)
                .collect::<Vec<_>>()
                .join(";");
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&info.room.room_id)?;
            encoder.encode_field(&info.room.building)?;
            encoder.encode_field(&i64::from(info.room.capacity))?;
            encoder.encode_field(&info.room.floor)?;
            encoder.encode_field(&info.room.facilities.to_string())?;
            encoder.encode_field(&adjacent)?;
            encoder.encode_field(&(info.bookings_count as i64))?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

fn bookings_response<'a>(records: impl IntoIterator<Item = &'a BookingRecord>) -> Response {
    let schema = Arc::new(bookings_schema());
    let rows: Vec<PgWireResult<_>> = records
        .into_iter()
        .map(|record| {
            let req = &record.request;
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&record.id.to_string())?;
            encoder.encode_field(&record.room.room_id)?;
            encoder.encode_field(&record.room.building)?;
            encoder.encode_field(&req.course_name)?;
            encoder.encode_field(&req.instructor)?;
            encoder.encode_field(&req.date.to_string())?;
            encoder.encode_field(&req.slot.start.to_string())?;
            encoder.encode_field(&req.slot.end.to_string())?;
            encoder.encode_field(&i64::from(req.capacity))?;
            encoder.encode_field(&record.created_at)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(rows)))
}

/// The database name of the connection selects the tenant.
fn database<C: ClientInfo>(client: &C) -> String {
    client
        .metadata()
        .get("database")
        .cloned()
        .unwrap_or_else(|| "default".to_string())
}

// ── Result schemas ───────────────────────────────────────────────

fn text(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn int8(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT8, FieldFormat::Text)
}

fn rooms_schema() -> Vec<FieldInfo> {
    vec![
        text("room_id"),
        text("building"),
        int8("capacity"),
        FieldInfo::new("floor".into(), None, None, Type::INT4, FieldFormat::Text),
        text("facilities"),
        text("adjacent"),
        int8("bookings_count"),
    ]
}

fn adjacency_schema() -> Vec<FieldInfo> {
    vec![
        text("room_id"),
        text("building"),
        text("adjacent_room_id"),
        text("adjacent_building"),
        text("kind"),
    ]
}

fn bookings_schema() -> Vec<FieldInfo> {
    vec![
        text("booking_id"),
        text("room_id"),
        text("building"),
        text("course_name"),
        text("instructor"),
        text("date"),
        text("start_time"),
        text("end_time"),
        int8("capacity"),
        int8("created_at"),
    ]
}

fn conflicts_schema() -> Vec<FieldInfo> {
    vec![
        text("room_id"),
        text("building"),
        text("date"),
        text("first_booking_id"),
        text("first_course"),
        text("first_slot"),
        text("second_booking_id"),
        text("second_course"),
        text("second_slot"),
    ]
}

fn logs_schema() -> Vec<FieldInfo> {
    vec![text("kind"), text("message"), text("timestamp")]
}

fn statistics_schema() -> Vec<FieldInfo> {
    vec![
        int8("total_rooms"),
        int8("total_bookings"),
        int8("utilized_rooms"),
        FieldInfo::new("utilization_rate".into(), None, None, Type::FLOAT8, FieldFormat::Text),
        int8("conflicts"),
    ]
}

fn alternatives_schema() -> Vec<FieldInfo> {
    vec![
        text("room_id"),
        text("building"),
        int8("capacity"),
        FieldInfo::new("floor".into(), None, None, Type::INT4, FieldFormat::Text),
        text("facilities"),
    ]
}

fn export_schema() -> Vec<FieldInfo> {
    vec![text("kind"), text("document")]
}

/// Result columns for a statement that may still hold `$N` placeholders.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.to_uppercase();
    let mut words = upper.split(|c: char| c.is_whitespace() || c == ';' || c == '(');
    let first = words.find(|w| !w.is_empty()).unwrap_or_default();
    match first {
        "SELECT" => {
            let table = words
                .skip_while(|w| *w != "FROM")
                .find(|w| !w.is_empty() && *w != "FROM")
                .unwrap_or_default();
            match table.trim_matches('"') {
                "ROOMS" => rooms_schema(),
                "ADJACENCY" => adjacency_schema(),
                "BOOKINGS" | "SCHEDULE" => bookings_schema(),
                "CONFLICTS" => conflicts_schema(),
                "LOGS" => logs_schema(),
                "STATISTICS" => statistics_schema(),
                "ALTERNATIVES" => alternatives_schema(),
                "EXPORT" => export_schema(),
                _ => vec![],
            }
        }
        "INSERT" if upper.contains("BOOKINGS") && upper.contains("RETURNING") => bookings_schema(),
        _ => vec![],
    }
}

#[async_trait]
impl SimpleQueryHandler for ClassallocHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(database(client)).await?;
        Ok(vec![self.run(&engine, query).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct ClassallocQueryParser;

#[async_trait]
impl QueryParser for ClassallocQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for ClassallocHandler {
    type Statement = String;
    type QueryParser = ClassallocQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(database(client)).await?;
        let sql = substitute_params(portal);
        self.run(&engine, &sql).await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            result_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(
            &target.statement.statement,
        )))
    }
}

/// Highest `$N` placeholder in the SQL string.
/// `$N` placeholders outside quoted literals and identifiers, as
/// `(byte range, N)`. A doubled quote inside a literal is an escape.
fn placeholders(sql: &str) -> Vec<(Range<usize>, usize)> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => {
                if bytes.get(i + 1) == Some(&q) {
                    i += 1;
                } else {
                    quote = None;
                }
            }
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if b == b'$' => {
                let digits = bytes[i + 1..].iter().take_while(|d| d.is_ascii_digit()).count();
                if let Ok(n) = sql[i + 1..i + 1 + digits].parse::<usize>() {
                    found.push((i..i + 1 + digits, n));
                    i += digits;
                }
            }
            None => {}
        }
        i += 1;
    }
    found
}

fn count_params(sql: &str) -> usize {
    placeholders(sql).into_iter().map(|(_, n)| n).max().unwrap_or(0)
}

/// Replace `$1, $2, ...` with the bound text parameters, quoted as literals.
fn substitute_params(portal: &Portal<String>) -> String {
    let params: Vec<Option<String>> = portal
        .parameters
        .iter()
        .map(|p| p.as_ref().map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
        .collect();
    substitute(&portal.statement.statement, &params)
}

/// Single pass over the original text, so parameter values are never rescanned.
/// A placeholder with no bound value is left as written.
fn substitute(sql: &str, params: &[Option<String>]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut copied = 0;
    for (range, n) in placeholders(sql) {
        let Some(param) = n.checked_sub(1).and_then(|i| params.get(i)) else {
            continue;
        };
        out.push_str(&sql[copied..range.start]);
        match param {
            Some(text) => {
                out.push('\'');
                out.push_str(&text.replace('\'', "''"));
                out.push('\'');
            }
            None => out.push_str("NULL"),
        }
        copied = range.end;
    }
    out.push_str(&sql[copied..]);
    out
}

// ── Factory ──────────────────────────────────────────────────────

pub struct ClassallocFactory {
    handler: Arc<ClassallocHandler>,
    auth_handler: Arc<
        CleartextPasswordAuthStartupHandler<ClassallocAuthSource, DefaultServerParameterProvider>,
    >,
    noop: Arc<NoopHandler>,
}

impl ClassallocFactory {
    pub fn new(tenant_manager: Arc<TenantManager>, password: String) -> Self {
        let auth_source = ClassallocAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(ClassallocHandler::new(tenant_manager)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for ClassallocFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

// ── Error mapping ────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

fn engine_sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::Invalid(_) => "22023",
        EngineError::NoCandidate => "P0002",
        EngineError::DuplicateRoom(_) => "23505",
        EngineError::RoomNotFound(_) => "42704",
        EngineError::HasBookings(_)
        | EngineError::LimitExceeded(_)
        | EngineError::JournalError(_) => "P0001",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    user_error(engine_sqlstate(&e), e.to_string())
}

fn sql_sqlstate(e: &SqlError) -> &'static str {
    match e {
        SqlError::InvalidValue(_) => "22023",
        _ => "42601",
    }
}

fn sql_err(e: SqlError) -> PgWireError {
    user_error(sql_sqlstate(&e), e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_params_finds_highest_placeholder() {
        assert_eq!(count_params("SELECT * FROM rooms"), 0);
        assert_eq!(count_params("SELECT * FROM rooms WHERE building = $1"), 1);
        assert_eq!(
            count_params("INSERT INTO bookings VALUES ($1, $2, $3, $4, $10)"),
            10
        );
    }

    #[test]
    fn substitute_quotes_and_orders_placeholders() {
        let params: Vec<Option<String>> = (1..=10).map(|i| Some(format!("v{i}"))).collect();
        let sql = substitute("VALUES ($1, $10)", &params);
        assert_eq!(sql, "VALUES ('v1', 'v10')");

        let sql = substitute(
            "SELECT * FROM rooms WHERE building = $1 AND x = $2",
            &[Some("O'Neil Hall".into()), None],
        );
        assert_eq!(sql, "SELECT * FROM rooms WHERE building = 'O''Neil Hall' AND x = NULL");
    }

    #[test]
    fn substitute_never_rescans_parameter_values() {
        let sql = substitute(
            "INSERT INTO bookings (building, course_name) VALUES ($1, $2)",
            &[Some("Main".into()), Some("Econ $1 pricing".into())],
        );
        assert_eq!(
            sql,
            "INSERT INTO bookings (building, course_name) VALUES ('Main', 'Econ $1 pricing')"
        );

        let sql = substitute("VALUES ($2, $1)", &[Some("$2".into()), Some("b".into())]);
        assert_eq!(sql, "VALUES ('b', '$2')");
    }

    #[test]
    fn placeholders_inside_literals_are_text() {
        let sql = substitute(
            "SELECT * FROM logs WHERE message = 'cost $1 it''s $2' AND kind = $1",
            &[Some("info".into())],
        );
        assert_eq!(sql, "SELECT * FROM logs WHERE message = 'cost $1 it''s $2' AND kind = 'info'");
        assert_eq!(count_params("SELECT '$3' FROM \"$4\" WHERE a = $1"), 1);
        assert_eq!(substitute("WHERE a = $3", &[None]), "WHERE a = $3");
    }

    #[test]
    fn result_schema_by_table() {
        let names = |sql: &str| -> Vec<String> {
            result_schema(sql).iter().map(|f| f.name().to_string()).collect()
        };
        assert_eq!(names("SELECT * FROM logs WHERE kind = $1"), vec!["kind", "message", "timestamp"]);
        assert_eq!(names("select * from statistics;").len(), 5);
        assert_eq!(names("INSERT INTO bookings VALUES ($1) RETURNING *")[0], "booking_id");
        assert!(names("INSERT INTO rooms VALUES ($1, $2, $3)").is_empty());
        assert!(names("TRUNCATE rooms").is_empty());
    }

    #[test]
    fn sqlstates() {
        assert_eq!(engine_sqlstate(&EngineError::NoCandidate), "P0002");
        assert_eq!(
            engine_sqlstate(&EngineError::DuplicateRoom(RoomKey::new("1", "A"))),
            "23505"
        );
        assert_eq!(
            engine_sqlstate(&EngineError::RoomNotFound(RoomKey::new("1", "A"))),
            "42704"
        );
        assert_eq!(
            engine_sqlstate(&EngineError::Invalid(crate::engine::ValidationError::ZeroCapacity)),
            "22023"
        );
        assert_eq!(sql_sqlstate(&SqlError::InvalidValue("x".into())), "22023");
        assert_eq!(sql_sqlstate(&SqlError::Empty), "42601");
    }
}
