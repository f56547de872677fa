//! Ordered, tag-addressable collection of elements

use std::collections::HashMap;
use std::fmt;

use crate::config::CodecOptions;
use crate::cursor::{ByteReader, ByteWriter};
use crate::dictionary::{Dictionary, StandardDictionary};
use crate::element::Element;
use crate::error::Result;
use crate::sequence;
use crate::tag::Tag;
use crate::transfer_syntax::TransferSyntax;

/// Elements of one nesting level, in insertion order, unique by tag
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    elements: Vec<Element>,
    index: HashMap<Tag, usize>,
}

/// Order-sensitive: two data sets are equal when they hold equal elements
/// in the same order.
impl PartialEq for DataSet {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Insert an element. An element with the same tag is replaced in place
    /// and returned.
    pub fn insert(&mut self, element: Element) -> Option<Element> {
        match self.index.get(&element.tag) {
            Some(&position) => Some(std::mem::replace(&mut self.elements[position], element)),
            None => {
                self.index.insert(element.tag, self.elements.len());
                self.elements.push(element);
                None
            }
        }
    }

    pub fn get(&self, tag: Tag) -> Option<&Element> {
        self.index.get(&tag).map(|&position| &self.elements[position])
    }

    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut Element> {
        match self.index.get(&tag) {
            Some(&position) => self.elements.get_mut(position),
            None => None,
        }
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.index.contains_key(&tag)
    }

    /// Character value of an element, padding removed
    pub fn string(&self, tag: Tag) -> Option<String> {
        self.get(tag)?.to_str().map(|s| s.into_owned())
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Element> {
        let position = self.index.remove(&tag)?;
        let element = self.elements.remove(position);
        self.reindex();
        Some(element)
    }

    pub(crate) fn pop_first(&mut self) -> Option<Element> {
        if self.elements.is_empty() {
            return None;
        }
        let first = self.elements.remove(0);
        self.reindex();
        Some(first)
    }

    fn reindex(&mut self) {
        self.index = self
            .elements
            .iter()
            .enumerate()
            .map(|(position, element)| (element.tag, position))
            .collect();
    }

    /// Elements in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    /// Elements ordered by (group, element), for display
    pub fn sorted(&self) -> Vec<&Element> {
        let mut sorted: Vec<&Element> = self.elements.iter().collect();
        sorted.sort_by_key(|element| element.tag);
        sorted
    }

    /// Reorder this level by tag; nested items are left as they are
    pub fn sort_by_tag(&mut self) {
        self.elements.sort_by_key(|element| element.tag);
        self.reindex();
    }

    /// Human-readable lines for every element, recursing into items
    pub fn describe(&self, indent: usize) -> Vec<String> {
        self.describe_with(indent, &StandardDictionary)
    }

    pub fn describe_with(&self, indent: usize, dictionary: &dyn Dictionary) -> Vec<String> {
        let mut lines = Vec::new();
        for element in &self.elements {
            element.describe_into(indent, dictionary, &mut lines);
        }
        lines
    }

    /// Decode a bare data set (no preamble or meta group)
    pub fn decode(data: &[u8], syntax: TransferSyntax, options: &CodecOptions) -> Result<DataSet> {
        let mut reader = ByteReader::new(data, syntax.endianness);
        sequence::decode_dataset(&mut reader, syntax, options)
    }

    /// Encode this data set in insertion order
    pub fn encode(&self, syntax: TransferSyntax, options: &CodecOptions) -> Result<Vec<u8>> {
        let mut writer = ByteWriter::new(syntax.endianness);
        sequence::encode_dataset(&mut writer, self, syntax, options, 0)?;
        Ok(writer.into_vec())
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl IntoIterator for DataSet {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl FromIterator<Element> for DataSet {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut dataset = DataSet::new();
        for element in iter {
            dataset.insert(element);
        }
        dataset
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.describe(0) {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
