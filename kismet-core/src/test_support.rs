//! Test-only, in-memory `RecordSource` implementation used by unit and
//! behaviour tests.

use std::collections::VecDeque;

use crate::{ExtractError, Record, RecordSource, headers_with_extras};

/// In-memory `RecordSource` replaying a scripted sequence of outcomes.
///
/// The source follows the backend contract: it stops after a fatal error,
/// reports [`ExtractError::SourceClosed`] once finished and counts how often
/// resources were actually released.
#[derive(Debug, Default)]
pub struct MemorySource {
    outcomes: VecDeque<Result<Record, ExtractError>>,
    extra_headers: Vec<String>,
    failed: bool,
    closed: bool,
    releases: usize,
}

impl MemorySource {
    /// Create a source replaying `outcomes` in order.
    pub fn new<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Result<Record, ExtractError>>,
    {
        Self {
            outcomes: outcomes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Create a source yielding the given records.
    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        Self::new(records.into_iter().map(Ok))
    }

    /// Name the extra fields reported by [`RecordSource::headers`].
    #[must_use]
    pub fn with_extra_headers<'a, I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.extra_headers = names.into_iter().map(str::to_owned).collect();
        self
    }

    /// Number of times `finish` released resources.
    #[must_use]
    pub const fn releases(&self) -> usize {
        self.releases
    }
}

impl RecordSource for MemorySource {
    fn headers(&self) -> Vec<String> {
        headers_with_extras(self.extra_headers.iter().map(String::as_str))
    }

    fn next_record(&mut self) -> Result<Option<Record>, ExtractError> {
        if self.closed {
            return Err(ExtractError::SourceClosed);
        }
        if self.failed {
            return Ok(None);
        }
        match self.outcomes.pop_front() {
            None => Ok(None),
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(err)) => {
                self.failed = err.is_fatal();
                Err(err)
            }
        }
    }

    fn finish(&mut self) -> Result<(), ExtractError> {
        if !self.closed {
            self.closed = true;
            self.outcomes.clear();
            self.releases += 1;
        }
        Ok(())
    }
}
