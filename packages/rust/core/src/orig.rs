//! Recovering the original element stream from chunks.

use tracing::{debug, instrument};

use docchunk_shared::Element;

/// Replace each chunk by the elements it was formed from.
///
/// Chunks without `orig_elements` (chunking ran with them disabled, or the
/// element was never chunked) are passed through as they are. A table split
/// into several `TableChunk`s records the same table on every piece; it is
/// emitted once.
#[instrument(skip_all, fields(chunks = chunks.len()))]
pub fn expand_orig_elements(chunks: &[Element]) -> Vec<Element> {
    let mut elements: Vec<Element> = Vec::new();
    let mut previous: &[Element] = &[];

    for chunk in chunks {
        match chunk.metadata.orig_elements.as_deref() {
            Some(orig) if !orig.is_empty() => {
                let continued = chunk.metadata.is_continuation == Some(true);
                for element in orig {
                    let repeated = continued
                        && previous.iter().any(|p| p.element_id == element.element_id);
                    if !repeated {
                        elements.push(element.clone());
                    }
                }
                previous = orig;
            }
            _ => {
                elements.push(chunk.clone());
                previous = &[];
            }
        }
    }

    debug!(elements = elements.len(), "expanded orig_elements");
    elements
}
