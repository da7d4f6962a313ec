use chrono::NaiveDate;
use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertRoom {
        room: Room,
    },
    DeleteRoom {
        key: RoomKey,
    },
    InsertBooking {
        request: BookingRequest,
        returning: bool,
    },
    /// `TRUNCATE rooms`: wipe the campus and reload the sample rooms.
    ResetSampleData,
    SelectRooms {
        building: Option<String>,
    },
    SelectAdjacency,
    SelectBookings {
        room_id: Option<String>,
        building: Option<String>,
    },
    SelectConflicts,
    SelectLogs {
        kind: Option<LogKind>,
    },
    SelectStatistics,
    SelectAlternatives {
        start: RoomKey,
        date: NaiveDate,
        slot: TimeSlot,
    },
    Export {
        kind: ExportKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Rooms,
    Logs,
}

/// Positional column order for `INSERT INTO rooms VALUES (...)`.
const ROOM_COLUMNS: &[&str] = &[
    "room_id", "building", "capacity", "floor", "projector", "lab", "accessible", "whiteboard",
    "audio", "smartboard",
];

/// Positional column order for `INSERT INTO bookings VALUES (...)`.
const BOOKING_COLUMNS: &[&str] = &[
    "course_name", "date", "start_time", "end_time", "capacity", "instructor", "building",
    "projector", "lab", "accessible", "whiteboard", "audio", "smartboard",
];

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if let Some(head) = trimmed.get(..9)
        && head.eq_ignore_ascii_case("TRUNCATE ")
    {
        return parse_truncate(&trimmed[9..]);
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    let stmt = match stmts.as_slice() {
        [] => return Err(SqlError::Empty),
        [stmt] => stmt,
        _ => {
            return Err(SqlError::Unsupported(format!(
                "{} statements in one query; send them one at a time",
                stmts.len()
            )));
        }
    };

    match stmt {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_truncate(rest: &str) -> Result<Command, SqlError> {
    let mut words = rest.split_whitespace();
    let mut table = words.next().unwrap_or_default();
    if table.eq_ignore_ascii_case("TABLE") {
        table = words.next().unwrap_or_default();
    }
    if words.next().is_some() {
        return Err(SqlError::Unsupported(format!("TRUNCATE {rest}")));
    }
    match table.trim_matches('"').to_lowercase().as_str() {
        "rooms" => Ok(Command::ResetSampleData),
        "" => Err(SqlError::Parse("TRUNCATE without table".into())),
        other => Err(SqlError::UnknownTable(other.to_string())),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    match table.as_str() {
        "rooms" => {
            let row = named_row(insert, "rooms", ROOM_COLUMNS)?;
            Ok(Command::InsertRoom {
                room: room_from_row(&row)?,
            })
        }
        "bookings" => {
            let row = named_row(insert, "bookings", BOOKING_COLUMNS)?;
            Ok(Command::InsertBooking {
                request: request_from_row(&row)?,
                returning: insert.returning.is_some(),
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    if table != "rooms" {
        return Err(SqlError::UnknownTable(table));
    }
    let filters = Filters::from_selection(delete.selection.as_ref())?;
    Ok(Command::DeleteRoom {
        key: RoomKey::new(filters.required_string("room_id")?, filters.required_string("building")?),
    })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;
    let filters = Filters::from_selection(select.selection.as_ref())?;

    match table.as_str() {
        "rooms" => Ok(Command::SelectRooms {
            building: filters.optional_string("building")?,
        }),
        "adjacency" => Ok(Command::SelectAdjacency),
        "bookings" | "schedule" => Ok(Command::SelectBookings {
            room_id: filters.optional_string("room_id")?,
            building: filters.optional_string("building")?,
        }),
        "conflicts" => Ok(Command::SelectConflicts),
        "logs" => {
            let kind = filters
                .optional_string("kind")?
                .map(|k| k.parse::<LogKind>().map_err(SqlError::InvalidValue))
                .transpose()?;
            Ok(Command::SelectLogs { kind })
        }
        "statistics" => Ok(Command::SelectStatistics),
        "alternatives" => {
            let start = RoomKey::new(
                filters.required_string("room_id")?,
                filters.required_string("building")?,
            );
            let date = parse_date(&filters.required_string("date")?)?;
            let slot = TimeSlot::new(
                parse_time(&filters.required_string("start_time")?)?,
                parse_time(&filters.required_string("end_time")?)?,
            );
            Ok(Command::SelectAlternatives { start, date, slot })
        }
        "export" => {
            let kind = match filters.required_string("kind")?.to_lowercase().as_str() {
                "rooms" => ExportKind::Rooms,
                "logs" => ExportKind::Logs,
                other => {
                    return Err(SqlError::InvalidValue(format!(
                        "unknown export kind: {other} (expected rooms or logs)"
                    )));
                }
            };
            Ok(Command::Export { kind })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── Row builders ──────────────────────────────────────────────

/// One VALUES row paired with its column names. Without a column list the
/// values are matched against `positional` in order.
struct Row {
    table: &'static str,
    cells: Vec<(String, Expr)>,
}

impl Row {
    fn get(&self, column: &str) -> Option<&Expr> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, e)| e)
    }

    fn required(&self, column: &'static str) -> Result<&Expr, SqlError> {
        self.get(column).ok_or(SqlError::MissingColumn(self.table, column))
    }

    fn facilities(&self) -> Result<Facilities, SqlError> {
        let mut facilities = Facilities::default();
        if let Some(expr) = self.get("facilities")
            && let Some(list) = parse_optional_string(expr)?
        {
            for name in list.split([';', ',']).map(str::trim).filter(|s| !s.is_empty()) {
                let facility = name.parse::<Facility>().map_err(SqlError::InvalidValue)?;
                facilities.set(facility, true);
            }
        }
        for facility in Facility::ALL {
            if let Some(expr) = self.get(facility.as_str())
                && parse_bool(expr)?
            {
                facilities.set(facility, true);
            }
        }
        Ok(facilities)
    }
}

fn named_row(
    insert: &ast::Insert,
    table: &'static str,
    positional: &[&str],
) -> Result<Row, SqlError> {
    let rows = extract_insert_rows(insert)?;
    if rows.len() != 1 {
        return Err(SqlError::Unsupported(format!(
            "{table}: multi-row INSERT ({} rows)",
            rows.len()
        )));
    }
    let values = &rows[0];

    let columns: Vec<String> = if insert.columns.is_empty() {
        if values.len() > positional.len() {
            return Err(SqlError::WrongArity(table, positional.len(), values.len()));
        }
        positional.iter().map(|c| c.to_string()).collect()
    } else {
        if insert.columns.len() != values.len() {
            return Err(SqlError::WrongArity(table, insert.columns.len(), values.len()));
        }
        insert.columns.iter().map(|c| c.value.to_lowercase()).collect()
    };

    for column in &columns {
        let known = positional.contains(&column.as_str()) || column == "facilities";
        if !known {
            return Err(SqlError::UnknownColumn(table, column.clone()));
        }
    }

    Ok(Row {
        table,
        cells: columns.into_iter().zip(values.iter().cloned()).collect(),
    })
}

fn room_from_row(row: &Row) -> Result<Room, SqlError> {
    let floor = match row.get("floor") {
        Some(expr) => parse_i64_or_null(expr)?
            .map(|v| i32::try_from(v).map_err(|_| SqlError::InvalidValue(format!("floor {v} out of range"))))
            .transpose()?,
        None => None,
    };
    Ok(Room::new(
        parse_string(row.required("room_id")?)?,
        parse_string(row.required("building")?)?,
        parse_u32(row.required("capacity")?)?,
        floor,
        row.facilities()?,
    ))
}

fn request_from_row(row: &Row) -> Result<BookingRequest, SqlError> {
    let optional = |column: &str| match row.get(column) {
        Some(expr) => parse_optional_string(expr),
        None => Ok(None),
    };
    Ok(BookingRequest {
        course_name: parse_string(row.required("course_name")?)?,
        instructor: optional("instructor")?,
        date: parse_date(&parse_string(row.required("date")?)?)?,
        slot: TimeSlot::new(
            parse_time(&parse_string(row.required("start_time")?)?)?,
            parse_time(&parse_string(row.required("end_time")?)?)?,
        ),
        capacity: parse_u32(row.required("capacity")?)?,
        building: optional("building")?,
        facilities: row.facilities()?,
    })
}

// ── WHERE filters ─────────────────────────────────────────────

/// `col = value` terms joined by AND.
#[derive(Default)]
struct Filters {
    terms: Vec<(String, Expr)>,
}

impl Filters {
    fn from_selection(selection: Option<&Expr>) -> Result<Self, SqlError> {
        let mut filters = Filters::default();
        if let Some(expr) = selection {
            filters.collect(expr)?;
        }
        Ok(filters)
    }

    fn collect(&mut self, expr: &Expr) -> Result<(), SqlError> {
        match expr {
            Expr::BinaryOp {
                left,
                op: ast::BinaryOperator::And,
                right,
            } => {
                self.collect(left)?;
                self.collect(right)
            }
            Expr::BinaryOp {
                left,
                op: ast::BinaryOperator::Eq,
                right,
            } => {
                let column = expr_column_name(left)
                    .ok_or_else(|| SqlError::Unsupported(format!("filter on {left}")))?;
                self.terms.push((column, right.as_ref().clone()));
                Ok(())
            }
            Expr::Nested(inner) => self.collect(inner),
            other => Err(SqlError::Unsupported(format!("filter {other}"))),
        }
    }

    fn get(&self, column: &str) -> Option<&Expr> {
        self.terms.iter().find(|(c, _)| c == column).map(|(_, e)| e)
    }

    fn optional_string(&self, column: &str) -> Result<Option<String>, SqlError> {
        match self.get(column) {
            Some(expr) => parse_optional_string(expr),
            None => Ok(None),
        }
    }

    fn required_string(&self, column: &'static str) -> Result<String, SqlError> {
        self.optional_string(column)?
            .ok_or(SqlError::MissingFilter(column))
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_rows(insert: &ast::Insert) -> Result<&[Vec<Expr>], SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            Ok(&values.rows)
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

/// Text value. Numbers are accepted so `room_id = 101` works unquoted.
fn parse_optional_string(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        Some(Value::SingleQuotedString(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::SingleQuotedString(s)) | Some(Value::Number(s, _)) => Ok(Some(s.clone())),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    // Empty strings pass through; the engine reports them as validation errors.
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        _ => parse_optional_string(expr)?
            .ok_or_else(|| SqlError::InvalidValue("unexpected NULL".into())),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| SqlError::InvalidValue(format!("bad date {s:?}: {e}")))
}

fn parse_time(s: &str) -> Result<TimeOfDay, SqlError> {
    s.trim().parse::<TimeOfDay>().map_err(SqlError::InvalidValue)
}

fn parse_i64_expr(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .trim()
                .parse()
                .map_err(|e| SqlError::InvalidValue(format!("bad integer {s:?}: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64_expr(expr)?;
    u32::try_from(v).map_err(|_| SqlError::InvalidValue(format!("{v} out of range")))
}

fn parse_i64_or_null(expr: &Expr) -> Result<Option<i64>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => Ok(Some(parse_i64_expr(expr)?)),
    }
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Null => Ok(false),
            Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(true),
                "false" | "f" | "0" | "no" | "" => Ok(false),
                _ => Err(SqlError::InvalidValue(format!("bad bool: {s}"))),
            },
            Value::Number(n, _) => Ok(n != "0"),
            _ => Err(SqlError::Parse(format!("expected bool, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(&'static str, String),
    WrongArity(&'static str, usize, usize),
    MissingColumn(&'static str, &'static str),
    MissingFilter(&'static str),
    /// Well-formed SQL carrying a value the domain rejects (bad date, time,
    /// facility name, out-of-range number).
    InvalidValue(String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(t, c) => write!(f, "{t}: unknown column {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingColumn(t, c) => write!(f, "{t}: missing column {c}"),
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::InvalidValue(s) => write!(f, "invalid value: {s}"),
        }
    }
}

impl std::error::Error for SqlError {}
