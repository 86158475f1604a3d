//! Element identifiers for emitted chunks.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use docchunk_shared::Element;

/// Length of a deterministic id, in hex digits.
const HASH_ID_LEN: usize = 32;

/// Assign an `element_id` to every element in `elements`.
///
/// By default ids are deterministic: re-chunking the same input with the
/// same options reproduces them. With `unique` every element gets a fresh
/// UUID v7 instead.
pub fn assign_element_ids(elements: &mut [Element], unique: bool) {
    for (sequence, element) in elements.iter_mut().enumerate() {
        element.element_id = if unique {
            Uuid::now_v7().to_string()
        } else {
            hash_id(element, sequence)
        };
    }
}

/// SHA-256 over filename, text, page number and position, truncated.
///
/// An absent filename or page number contributes nothing, so the sequence
/// index alone tells apart identical elements of one document.
pub fn hash_id(element: &Element, sequence: usize) -> String {
    let page_number = element
        .metadata
        .page_number
        .map(|n| n.to_string())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(element.metadata.filename.as_deref().unwrap_or("").as_bytes());
    hasher.update(element.text.as_bytes());
    hasher.update(page_number.as_bytes());
    hasher.update(sequence.to_string().as_bytes());

    let mut hash = format!("{:x}", hasher.finalize());
    hash.truncate(HASH_ID_LEN);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<Element> {
        let mut a = Element::narrative("same text");
        a.metadata.filename = Some("a.pdf".into());
        a.metadata.page_number = Some(1);
        let b = a.clone();
        vec![a, b]
    }

    #[test]
    fn hash_ids_are_deterministic() {
        let mut first = chunks();
        let mut second = chunks();
        assign_element_ids(&mut first, false);
        assign_element_ids(&mut second, false);

        assert_eq!(first[0].element_id, second[0].element_id);
        assert_eq!(first[0].element_id.len(), 32);
        assert!(first[0].element_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn sequence_separates_identical_elements() {
        let mut elements = chunks();
        assign_element_ids(&mut elements, false);
        assert_ne!(elements[0].element_id, elements[1].element_id);
    }

    #[test]
    fn hash_depends_on_filename() {
        let elements = chunks();
        let mut other = elements[0].clone();
        other.metadata.filename = Some("b.pdf".into());
        assert_ne!(hash_id(&elements[0], 0), hash_id(&other, 0));
    }

    #[test]
    fn unique_ids_are_uuids() {
        let mut elements = chunks();
        assign_element_ids(&mut elements, true);
        assert_ne!(elements[0].element_id, elements[1].element_id);
        assert!(Uuid::parse_str(&elements[0].element_id).is_ok());
    }
}
