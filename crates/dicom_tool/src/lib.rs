//! Helpers behind the `dicom-tool` binary

use thiserror::Error;

use dicom_codec::{CodecOptions, DataSet, DicomDocument, DicomError, Element, Tag};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Decode(#[from] DicomError),

    #[error("Element {0} not found")]
    NotFound(Tag),

    #[error("Cannot strip from a deflated data set: offsets do not map to file bytes")]
    Deflated,

    #[error("Cannot strip {0}: it sits inside a container with a defined length")]
    InsideDefinedLength(Tag),

    #[error("Cannot strip {0}: file meta elements are covered by the group length")]
    MetaElement(Tag),

    #[error("Element span {start}..{end} lies outside the {len}-byte source")]
    OutOfRange { start: u64, end: u64, len: usize },
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// First element with `tag` in document order, searching inside items,
/// and whether any enclosing sequence or item declares a defined length.
pub fn locate(dataset: &DataSet, tag: Tag) -> Option<(&Element, bool)> {
    let mut stack = vec![(dataset.iter(), false)];
    loop {
        let (next, fixed) = match stack.last_mut() {
            Some((elements, fixed)) => (elements.next(), *fixed),
            None => return None,
        };
        let Some(element) = next else {
            stack.pop();
            continue;
        };
        if element.tag == tag {
            return Some((element, fixed));
        }
        if let Some(items) = element.items() {
            for item in items.iter().rev() {
                let defined = !element.is_undefined_length() || !item.is_undefined_length();
                stack.push((item.elements.iter(), fixed || defined));
            }
        }
    }
}

/// Remove the bytes of one decoded element from the source it was decoded
/// from, leaving every other byte untouched.
pub fn strip_element(source: &[u8], element: &Element) -> Result<Vec<u8>> {
    let start = element.offset;
    let end = element.end_offset();
    if end as usize > source.len() || start >= end {
        return Err(ToolError::OutOfRange {
            start,
            end,
            len: source.len(),
        });
    }
    let mut stripped = Vec::with_capacity(source.len() - (end - start) as usize);
    stripped.extend_from_slice(&source[..start as usize]);
    stripped.extend_from_slice(&source[end as usize..]);
    Ok(stripped)
}

/// Decode `source`, remove the first element with `tag` and check that the
/// result still decodes.
pub fn strip_tag(source: &[u8], tag: Tag, options: &CodecOptions) -> Result<Vec<u8>> {
    if tag.group() == 0x0002 {
        return Err(ToolError::MetaElement(tag));
    }
    let document = DicomDocument::from_bytes(source, options)?;
    if document.transfer_syntax.deflated {
        return Err(ToolError::Deflated);
    }
    let (element, nested_in_defined) =
        locate(&document.dataset, tag).ok_or(ToolError::NotFound(tag))?;
    if nested_in_defined {
        return Err(ToolError::InsideDefinedLength(tag));
    }

    let stripped = strip_element(source, element)?;
    DicomDocument::from_bytes(&stripped, options)?;
    Ok(stripped)
}
