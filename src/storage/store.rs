//! Transactional report store on SQLite.
//!
//! One `persist` call is one transaction: the report row, its pins, its
//! certificates and both chain memberships become visible together or not at
//! all. Pins and certificates are shared across reports and are written with
//! insert-if-absent followed by a lookup, so writers racing on the same new
//! value both end up with the single stored row.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, ToSql, Transaction, TransactionBehavior};

use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::logging::structured::LogContext;
use crate::{log_debug, log_info};
use crate::validation::chain::ChainCertificate;

use super::models::{format_db_timestamp, ChainKind, ReportRecord, TableCounts};
use super::queries;

/// True for a UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Insert a row unless its key already exists, then return the row's id.
///
/// A uniqueness conflict on the insert means another report (possibly a
/// concurrent one) stored the value first; that is success.
pub fn upsert_returning_id(
    tx: &Transaction<'_>,
    table: &'static str,
    insert_sql: &str,
    insert_params: &[&dyn ToSql],
    select_sql: &str,
    key: &str,
) -> Result<i64, StorageError> {
    match tx.execute(insert_sql, insert_params) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {}
        Err(e) => return Err(e.into()),
    }

    tx.query_row(select_sql, [key], |row| row.get(0))
        .optional()?
        .ok_or_else(|| StorageError::MissingRow {
            table,
            key: key.to_string(),
        })
}

/// Handle on one store connection. Each worker owns its own.
pub struct ReportStore {
    conn: Connection,
}

impl ReportStore {
    /// Open (creating if needed) the database described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        let conn = Connection::open(&config.database_path)?;
        conn.busy_timeout(config.busy_timeout)?;
        if config.journal_wal {
            // journal_mode returns the resulting mode as a row.
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        }
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(queries::SCHEMA)?;
        Ok(())
    }

    /// Persist one validated report. Returns the new report id.
    ///
    /// Any error drops the transaction, which rolls back everything written
    /// for this report.
    pub fn persist(
        &mut self,
        report: &ReportRecord,
        pins: &[String],
        served: &[ChainCertificate],
        validated: &[ChainCertificate],
        ctx: &LogContext,
    ) -> Result<i64, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let report_id = insert_report(&tx, report)?;
        let ctx = ctx.with_report(report_id);
        log_debug!(ctx, "REPORT_ROW_INSERTED");

        insert_pins(&tx, report_id, pins, &ctx)?;
        insert_chain(&tx, report_id, ChainKind::Served, served, &ctx)?;
        insert_chain(&tx, report_id, ChainKind::Validated, validated, &ctx)?;

        tx.commit()?;

        log_info!(
            ctx,
            "REPORT_STORED",
            pins = pins.len(),
            served = served.len(),
            validated = validated.len()
        );
        Ok(report_id)
    }

    /// Row count of every table.
    pub fn counts(&self) -> Result<TableCounts, StorageError> {
        let mut n = [0u64; 6];
        for (slot, table) in n.iter_mut().zip(queries::TABLES) {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
            *slot = count as u64;
        }
        Ok(TableCounts {
            reports: n[0],
            pins: n[1],
            report_pins: n[2],
            certs: n[3],
            report_s_chain: n[4],
            report_v_chain: n[5],
        })
    }

    /// Distinct pins associated with a report, sorted.
    pub fn report_pins(&self, report_id: i64) -> Result<Vec<String>, StorageError> {
        let mut stmt = self.conn.prepare(queries::SELECT_REPORT_PINS)?;
        let pins = stmt
            .query_map([report_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(pins)
    }

    /// `(position, pin)` pairs of one chain, in chain order.
    pub fn chain(&self, report_id: i64, kind: ChainKind) -> Result<Vec<(usize, String)>, StorageError> {
        let mut stmt = self.conn.prepare(&queries::build_chain_select(kind))?;
        let rows = stmt
            .query_map([report_id], |row| {
                Ok((row.get::<_, i64>(0)? as usize, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn insert_report(tx: &Transaction<'_>, report: &ReportRecord) -> Result<i64, StorageError> {
    tx.execute(
        &queries::build_report_insert(),
        params![
            format_db_timestamp(&report.created_at),
            report.request_ip,
            report.user_agent,
            format_db_timestamp(&report.date_time),
            format_db_timestamp(&report.effective_expiration_date),
            report.hostname,
            report.noted_hostname,
            report.port,
            report.include_subdomains as i64,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

fn insert_pins(
    tx: &Transaction<'_>,
    report_id: i64,
    pins: &[String],
    ctx: &LogContext,
) -> Result<(), StorageError> {
    for pin in pins {
        let pin_id = upsert_returning_id(
            tx,
            "pins",
            queries::INSERT_PIN,
            params![pin],
            queries::SELECT_PIN_ID,
            pin,
        )?;

        match tx.execute(queries::INSERT_REPORT_PIN, params![report_id, pin_id]) {
            Ok(_) => {}
            // Same pin listed twice in one report.
            Err(e) if is_unique_violation(&e) => {
                log_debug!(ctx, "REPORT_PIN_DUPLICATE", pin = pin);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn insert_chain(
    tx: &Transaction<'_>,
    report_id: i64,
    kind: ChainKind,
    chain: &[ChainCertificate],
    ctx: &LogContext,
) -> Result<(), StorageError> {
    let insert_member = queries::build_chain_insert(kind);

    for cert in chain {
        let cert_id = upsert_returning_id(
            tx,
            "certs",
            queries::INSERT_CERT,
            params![cert.pem, cert.pin],
            queries::SELECT_CERT_ID,
            &cert.pin,
        )?;

        insert_chain_member(tx, &insert_member, report_id, cert_id, kind, cert.position)?;
        log_debug!(
            ctx,
            "CHAIN_MEMBER_INSERTED",
            chain = kind,
            position = cert.position,
            cert_id = cert_id
        );
    }
    Ok(())
}

/// Unlike pins, a conflict here is fatal: positions are unique per report.
fn insert_chain_member(
    tx: &Transaction<'_>,
    sql: &str,
    report_id: i64,
    cert_id: i64,
    kind: ChainKind,
    position: usize,
) -> Result<(), StorageError> {
    tx.execute(sql, params![report_id, cert_id, position as i64])
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::DuplicateChainPosition { kind, position }
            } else {
                e.into()
            }
        })?;
    Ok(())
}
