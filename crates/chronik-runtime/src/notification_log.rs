//! The global event stream, sliced into bounded sections.

use std::sync::Arc;

use chronik_core::{EventRecorder, Result, Section, StoreError};

/// Default cap on the number of notifications per section.
pub const DEFAULT_SECTION_SIZE: usize = 10;

/// Presents all stored events as a totally-ordered, gap-tolerant stream.
///
/// Sections are addressed by a `"start,end"` id pair. A full section's
/// `next_id` starts right after the last id actually observed, so a
/// consumer following the links visits every notification exactly once
/// even across gaps left by aborted transactions. Nothing is cached;
/// every query re-reads the recorder.
pub struct NotificationLog {
    recorder: Arc<dyn EventRecorder>,
    section_size: usize,
}

impl NotificationLog {
    /// A log with the default section size.
    pub fn new(recorder: Arc<dyn EventRecorder>) -> Self {
        Self::with_section_size(recorder, DEFAULT_SECTION_SIZE)
    }

    /// A log with an explicit section size cap.
    pub fn with_section_size(recorder: Arc<dyn EventRecorder>, section_size: usize) -> Self {
        Self {
            recorder,
            section_size: section_size.max(1),
        }
    }

    /// Read the section addressed by `"start,end"`.
    ///
    /// The window is clamped to the configured section size. The returned
    /// section's `section_id` reflects the ids actually found; `next_id` is
    /// `None` once the stream is exhausted.
    pub async fn section(&self, section_id: &str) -> Result<Section> {
        let (start, end) = parse_section_id(section_id)?;
        let limit = (end - start + 1).min(self.section_size as u64) as usize;
        let items = self.recorder.select_notifications(start, limit).await?;

        let section_id = match (items.first(), items.last()) {
            (Some(first), Some(last)) => Some(format!("{},{}", first.id, last.id)),
            _ => None,
        };
        // A short section means the stream is exhausted. A full one links to
        // the window starting after the last observed id; ids the recorder
        // returned past `end` are part of this section, never re-served.
        let next_id = match items.last() {
            Some(last) if items.len() == limit => {
                Some(format!("{},{}", last.id + 1, last.id + limit as u64))
            }
            _ => None,
        };

        Ok(Section {
            section_id,
            items,
            next_id,
        })
    }
}

fn parse_section_id(section_id: &str) -> Result<(u64, u64)> {
    let invalid = || StoreError::InvalidSectionId(section_id.to_owned());
    let (start, end) = section_id.split_once(',').ok_or_else(invalid)?;
    let start: u64 = start.trim().parse().map_err(|_| invalid())?;
    let end: u64 = end.trim().parse().map_err(|_| invalid())?;
    if start == 0 || end < start {
        return Err(invalid());
    }
    Ok((start, end))
}
