use std::path::Path;

use tracing::debug;

use crate::error::{Result, SchoolError};
use crate::models::Record;

/// In-memory copy of one CSV-backed collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    records: Vec<T>,
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    /// Max existing ID + 1, or 1 when empty. `None` once IDs are exhausted.
    pub fn next_id(&self) -> Option<u64> {
        match self.records.iter().map(Record::id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        }
    }

    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }
}

/// Reads the collection at `location`, creating a header-only file when it
/// does not exist yet.
pub fn load<T: Record>(location: &Path) -> Result<Collection<T>> {
    if !location.exists() {
        debug!(path = %location.display(), "collection missing, creating empty file");
        let collection = Collection::new();
        persist(&collection, location)?;
        return Ok(collection);
    }

    let mut reader = csv::Reader::from_path(location).map_err(|err| csv_error(location, err))?;

    let headers = reader
        .headers()
        .map_err(|err| csv_error(location, err))?
        .clone();
    if headers.is_empty() || headers.iter().ne(T::COLUMNS.iter().copied()) {
        return Err(SchoolError::corrupt(
            location,
            format!(
                "expected columns [{}], found [{}]",
                T::COLUMNS.join(", "),
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        ));
    }

    let mut records = Vec::new();
    for result in reader.deserialize::<T>() {
        records.push(result.map_err(|err| csv_error(location, err))?);
    }

    debug!(path = %location.display(), rows = records.len(), "collection loaded");
    Ok(Collection { records })
}

/// Writes the header and every row, replacing whatever was at `location`.
pub fn persist<T: Record>(collection: &Collection<T>, location: &Path) -> Result<()> {
    if let Some(parent) = location.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| SchoolError::io(parent, err))?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(location)
        .map_err(|err| csv_error(location, err))?;

    writer
        .write_record(T::COLUMNS)
        .map_err(|err| csv_error(location, err))?;
    for record in collection.iter() {
        writer
            .serialize(record)
            .map_err(|err| csv_error(location, err))?;
    }
    writer.flush().map_err(|err| SchoolError::io(location, err))?;

    debug!(path = %location.display(), rows = collection.len(), "collection persisted");
    Ok(())
}

/// Load, assign the next ID, push the record built for it, persist. Returns
/// the assigned ID.
pub fn append<T, F>(location: &Path, build: F) -> Result<u64>
where
    T: Record,
    F: FnOnce(u64) -> T,
{
    let mut collection = load::<T>(location)?;
    let id = collection.next_id().ok_or_else(|| {
        SchoolError::corrupt(location, format!("record IDs exhausted at {}", u64::MAX))
    })?;
    collection.push(build(id));
    persist(&collection, location)?;
    Ok(id)
}

fn csv_error(location: &Path, err: csv::Error) -> SchoolError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return SchoolError::io(location, io);
        }
        return SchoolError::corrupt(location, "unreadable file");
    }
    SchoolError::corrupt(location, err)
}
