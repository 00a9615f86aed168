//! Splits a raw log buffer into event fragments on the `</event>` boundary.

use memchr::memmem;

/// Literal closing tag that terminates every event record.
pub const EVENT_BOUNDARY: &[u8] = b"</event>";

/// A slice of the source buffer holding one event, without its boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFragment<'a> {
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> EventFragment<'a> {
    /// Byte offset of the fragment in the source buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Fragment content, boundary excluded.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Fragment content with the boundary re-appended.
    pub fn complete(&self) -> Vec<u8> {
        let mut event = Vec::with_capacity(self.bytes.len() + EVENT_BOUNDARY.len());
        event.extend_from_slice(self.bytes);
        event.extend_from_slice(EVENT_BOUNDARY);
        event
    }

    /// Fragment content with surrounding whitespace trimmed and the
    /// boundary re-appended.
    pub fn complete_trimmed(&self) -> Vec<u8> {
        let trimmed = self.bytes.trim_ascii();
        let mut event = Vec::with_capacity(trimmed.len() + EVENT_BOUNDARY.len());
        event.extend_from_slice(trimmed);
        event.extend_from_slice(EVENT_BOUNDARY);
        event
    }
}

/// Lazy iterator over the fragments of a buffer.
///
/// Content after the last boundary is never yielded. Cloning the iterator,
/// or calling [`tokenize`] again, restarts from wherever the clone was taken.
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    haystack: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = EventFragment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.haystack.get(self.pos..)?;
        let found = memmem::find(rest, EVENT_BOUNDARY)?;

        let fragment = EventFragment {
            offset: self.pos,
            bytes: &rest[..found],
        };
        self.pos += found + EVENT_BOUNDARY.len();
        Some(fragment)
    }
}

/// Tokenizes `content` into event fragments.
pub fn tokenize(content: &[u8]) -> Fragments<'_> {
    Fragments {
        haystack: content,
        pos: 0,
    }
}

/// Number of complete events in `content`.
pub fn count_events(content: &[u8]) -> usize {
    memmem::find_iter(content, EVENT_BOUNDARY).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_boundary() {
        let content = b"<event uid=\"a\"></event>\n<event uid=\"b\"></event>\n";
        let fragments: Vec<_> = tokenize(content).collect();

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].as_bytes(), b"<event uid=\"a\">");
        assert_eq!(fragments[0].offset(), 0);
        assert_eq!(fragments[1].as_bytes(), b"\n<event uid=\"b\">");
        assert_eq!(fragments[1].complete(), b"\n<event uid=\"b\"></event>".to_vec());
        assert_eq!(
            fragments[1].complete_trimmed(),
            b"<event uid=\"b\"></event>".to_vec()
        );
    }

    #[test]
    fn test_trailing_tail_discarded() {
        let content = b"<event></event><event uid=\"partial\"";
        let fragments: Vec<_> = tokenize(content).collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(count_events(content), 1);
    }

    #[test]
    fn test_no_boundary_is_empty() {
        assert_eq!(tokenize(b"<event uid=\"x\"/>").count(), 0);
        assert_eq!(tokenize(b"").count(), 0);
        assert_eq!(count_events(b"no events here"), 0);
    }

    #[test]
    fn test_restartable() {
        let content = b"a</event>b</event>c";
        let fragments = tokenize(content);
        let first_pass: Vec<_> = fragments.clone().collect();
        let second_pass: Vec<_> = fragments.collect();
        assert_eq!(first_pass, second_pass);
        assert_eq!(first_pass.len(), 2);
    }
}
