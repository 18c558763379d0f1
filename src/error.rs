use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrationError>;

/// Every failure aborts the run; none of these are transient.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("node '{0}' has no row in the attribute table")]
    MissingAttribute(String),
    #[error("calendar error: {0}")]
    Calendar(String),
    #[error("cannot find the location of the parent of node '{0}'")]
    MissingParentLocation(String),
    #[error("invalid parent-daughter locations for node '{node}': {parent}, {child}")]
    UnknownLocation {
        node: String,
        parent: String,
        child: String,
    },
    #[error("year {year} of branch '{pair}' into node '{node}' is outside the calendar {first}..={last}")]
    OutOfCalendarRange {
        node: String,
        pair: String,
        year: i64,
        first: i64,
        last: i64,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("error processing table data (CSV)")]
    Csv(#[from] csv::Error),
}
