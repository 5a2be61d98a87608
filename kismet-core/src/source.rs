//! The pull contract shared by every backend.

use std::iter::FusedIterator;

use crate::{ExtractError, Record};

/// Header names for the mandatory positions.
pub const MANDATORY_HEADERS: [&str; 3] = ["lat", "lon", "id"];

/// Build a header row: [`MANDATORY_HEADERS`] followed by the extra field names.
#[must_use]
pub fn headers_with_extras<'a, I>(extras: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    MANDATORY_HEADERS
        .into_iter()
        .chain(extras)
        .map(str::to_owned)
        .collect()
}

/// A backend that yields records one at a time.
///
/// Implementations own their cursor state. Each call to
/// [`RecordSource::next_record`] returns the next not-yet-seen record, or
/// `Ok(None)` once the source is exhausted. After a fatal error the source
/// behaves as exhausted; a non-fatal error (see [`ExtractError::is_fatal`])
/// concerns a single row and the following call continues with the next one.
pub trait RecordSource {
    /// Column headers for formats that emit them.
    fn headers(&self) -> Vec<String>;

    /// Produce the next record, or `Ok(None)` when no records remain.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] when the backend fails or a value cannot be
    /// coerced into the record shape, and [`ExtractError::SourceClosed`] after
    /// [`RecordSource::finish`].
    fn next_record(&mut self) -> Result<Option<Record>, ExtractError>;

    /// Release backend resources.
    ///
    /// Calling `finish` more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] when the backend fails to release its
    /// resources cleanly.
    fn finish(&mut self) -> Result<(), ExtractError>;

    /// Iterate over the remaining records.
    fn records(&mut self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records::new(self)
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn headers(&self) -> Vec<String> {
        (**self).headers()
    }

    fn next_record(&mut self) -> Result<Option<Record>, ExtractError> {
        (**self).next_record()
    }

    fn finish(&mut self) -> Result<(), ExtractError> {
        (**self).finish()
    }
}

/// Iterator adapter over a [`RecordSource`].
///
/// Yields non-fatal errors in place of the affected record and stops after
/// the first fatal error.
#[derive(Debug)]
pub struct Records<'a, S: ?Sized> {
    source: &'a mut S,
    done: bool,
}

impl<'a, S: RecordSource + ?Sized> Records<'a, S> {
    /// Wrap a source.
    pub const fn new(source: &'a mut S) -> Self {
        Self {
            source,
            done: false,
        }
    }
}

impl<S: RecordSource + ?Sized> Iterator for Records<'_, S> {
    type Item = Result<Record, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = err.is_fatal();
                Some(Err(err))
            }
        }
    }
}

impl<S: RecordSource + ?Sized> FusedIterator for Records<'_, S> {}
