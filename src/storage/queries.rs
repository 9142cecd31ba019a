//! SQL text for the report store.
//!
//! Schema DDL and the statements the store executes. Kept here so the
//! statements can be inspected and tested without a connection.

use super::models::ChainKind;

/// Idempotent schema creation.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    request_ip TEXT NOT NULL,
    user_agent TEXT NOT NULL,
    date_time TEXT NOT NULL,
    effective_expiration_date TEXT NOT NULL,
    hostname TEXT NOT NULL,
    noted_hostname TEXT NOT NULL,
    port INTEGER NOT NULL,
    include_subdomains INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS pins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pin TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS report_pins (
    report_id INTEGER NOT NULL REFERENCES reports(id),
    pin_id INTEGER NOT NULL REFERENCES pins(id),
    PRIMARY KEY (report_id, pin_id)
);

CREATE TABLE IF NOT EXISTS certs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cert TEXT NOT NULL,
    pin TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS report_s_chain (
    report_id INTEGER NOT NULL REFERENCES reports(id),
    cert_id INTEGER NOT NULL REFERENCES certs(id),
    position INTEGER NOT NULL,
    PRIMARY KEY (report_id, position)
);

CREATE TABLE IF NOT EXISTS report_v_chain (
    report_id INTEGER NOT NULL REFERENCES reports(id),
    cert_id INTEGER NOT NULL REFERENCES certs(id),
    position INTEGER NOT NULL,
    PRIMARY KEY (report_id, position)
);
"#;

/// Columns of `reports` written on insert (`id` is generated).
pub fn get_report_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("created_at", "?1"),
        ("request_ip", "?2"),
        ("user_agent", "?3"),
        ("date_time", "?4"),
        ("effective_expiration_date", "?5"),
        ("hostname", "?6"),
        ("noted_hostname", "?7"),
        ("port", "?8"),
        ("include_subdomains", "?9"),
    ]
}

/// Build INSERT query for reports.
pub fn build_report_insert() -> String {
    let columns = get_report_columns();
    let col_names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<&str> = columns.iter().map(|(_, ph)| *ph).collect();

    format!(
        "INSERT INTO reports ({}) VALUES ({})",
        col_names.join(", "),
        placeholders.join(", ")
    )
}

pub const INSERT_PIN: &str = "INSERT INTO pins (pin) VALUES (?1)";
pub const SELECT_PIN_ID: &str = "SELECT id FROM pins WHERE pin = ?1";
pub const INSERT_REPORT_PIN: &str = "INSERT INTO report_pins (report_id, pin_id) VALUES (?1, ?2)";

pub const INSERT_CERT: &str = "INSERT INTO certs (cert, pin) VALUES (?1, ?2)";
pub const SELECT_CERT_ID: &str = "SELECT id FROM certs WHERE pin = ?1";

/// Build INSERT query for one chain membership row.
pub fn build_chain_insert(kind: ChainKind) -> String {
    format!(
        "INSERT INTO {} (report_id, cert_id, position) VALUES (?1, ?2, ?3)",
        kind.table()
    )
}

/// Positions and pins of one report's chain, in chain order.
pub fn build_chain_select(kind: ChainKind) -> String {
    format!(
        "SELECT c.position, certs.pin FROM {} c JOIN certs ON certs.id = c.cert_id \
         WHERE c.report_id = ?1 ORDER BY c.position",
        kind.table()
    )
}

pub const SELECT_REPORT_PINS: &str = "SELECT pins.pin FROM report_pins rp \
     JOIN pins ON pins.id = rp.pin_id WHERE rp.report_id = ?1 ORDER BY pins.pin";

/// Tables in dependency order, for counting.
pub const TABLES: [&str; 6] = [
    "reports",
    "pins",
    "report_pins",
    "certs",
    "report_s_chain",
    "report_v_chain",
];
