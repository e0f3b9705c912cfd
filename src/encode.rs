//! Encoding containers.
//!
//! Encoding builds a tree of nodes first and serializes it post-order at the
//! end: a leaf holds a fully-serialized byte chunk, an interior node holds an
//! ordered collection of children whose count header cannot be written until
//! the value has finished describing itself. Keyed nodes are
//! insertion-ordered so wire output is deterministic.

use crate::{format, CodingPath, Encode, EncodeError, UserInfo};
use bytes::{Bytes, BytesMut};
use indexmap::IndexMap;
use std::sync::Arc;

/// One node of the container tree.
pub(crate) enum Node {
    /// A fully-serialized value.
    Leaf(Bytes),
    /// An ordered list, not yet serialized.
    Array(Vec<Node>),
    /// A record of named fields in insertion order, not yet serialized.
    Map(IndexMap<String, Node>),
}

/// Serialize a node tree post-order: headers first, then each child's bytes.
pub(crate) fn assemble(node: &Node, out: &mut BytesMut) -> Result<(), EncodeError> {
    match node {
        Node::Leaf(bytes) => {
            out.extend_from_slice(bytes);
            Ok(())
        }
        Node::Array(items) => {
            format::write_array_header(out, items.len())?;
            for item in items {
                assemble(item, out)?;
            }
            Ok(())
        }
        Node::Map(entries) => {
            format::write_map_header(out, entries.len())?;
            for (key, value) in entries {
                format::write_str(out, key)?;
                assemble(value, out)?;
            }
            Ok(())
        }
    }
}

/// Describe a value into a fresh node tree at the given path.
///
/// This is the recursion step behind every generic `encode` call: each
/// nested value gets its own root encoder, and the resulting node is spliced
/// into the parent container. No encoder state is shared between siblings.
pub(crate) fn to_node<T: Encode + ?Sized>(
    value: &T,
    path: CodingPath,
    user_info: Arc<UserInfo>,
) -> Result<Node, EncodeError> {
    let mut encoder = Encoder {
        slot: None,
        path,
        user_info,
    };
    value.encode(&mut encoder)?;
    match encoder.slot {
        Some(node) => Ok(node),
        None => Err(EncodeError::NothingEncoded { path: encoder.path }),
    }
}

fn leaf(bytes: BytesMut) -> Node {
    Node::Leaf(bytes.freeze())
}

/// The root of one encode call.
///
/// A value describes itself by requesting exactly one container. The written
/// value lives in a one-shot slot: `None` is the not-written state, `Some`
/// the written state, so a second write is a typed error rather than silent
/// replacement.
pub struct Encoder {
    pub(crate) slot: Option<Node>,
    pub(crate) path: CodingPath,
    pub(crate) user_info: Arc<UserInfo>,
}

impl Encoder {
    /// The path from the root value to this encoder.
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    /// Caller-supplied configuration shared with every container of this
    /// encode call.
    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// A container for a single scalar value.
    pub fn single_value(&mut self) -> SingleValueEncoder<'_> {
        SingleValueEncoder {
            slot: &mut self.slot,
            path: self.path.clone(),
            user_info: Arc::clone(&self.user_info),
        }
    }

    /// A container for a record of named fields.
    ///
    /// # Errors
    /// Returns `EncodeError::ValueAlreadyEncoded` if a non-map value was
    /// already written here.
    pub fn keyed(&mut self) -> Result<KeyedEncoder<'_>, EncodeError> {
        if self.slot.is_none() {
            self.slot = Some(Node::Map(IndexMap::new()));
        }
        match &mut self.slot {
            Some(Node::Map(entries)) => Ok(KeyedEncoder {
                entries,
                path: self.path.clone(),
                user_info: Arc::clone(&self.user_info),
            }),
            _ => Err(EncodeError::ValueAlreadyEncoded {
                path: self.path.clone(),
            }),
        }
    }

    /// A container for an ordered list of elements.
    ///
    /// # Errors
    /// Returns `EncodeError::ValueAlreadyEncoded` if a non-array value was
    /// already written here.
    pub fn unkeyed(&mut self) -> Result<UnkeyedEncoder<'_>, EncodeError> {
        if self.slot.is_none() {
            self.slot = Some(Node::Array(Vec::new()));
        }
        match &mut self.slot {
            Some(Node::Array(elements)) => Ok(UnkeyedEncoder {
                elements,
                path: self.path.clone(),
                user_info: Arc::clone(&self.user_info),
            }),
            _ => Err(EncodeError::ValueAlreadyEncoded {
                path: self.path.clone(),
            }),
        }
    }
}

/// Encoding container for exactly one scalar value.
///
/// Every `encode_*` method may succeed at most once per instance; a second
/// write fails with `ValueAlreadyEncoded`.
pub struct SingleValueEncoder<'a> {
    slot: &'a mut Option<Node>,
    path: CodingPath,
    user_info: Arc<UserInfo>,
}

impl SingleValueEncoder<'_> {
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    fn put(&mut self, node: Node) -> Result<(), EncodeError> {
        if self.slot.is_some() {
            return Err(EncodeError::ValueAlreadyEncoded {
                path: self.path.clone(),
            });
        }
        *self.slot = Some(node);
        Ok(())
    }

    pub fn encode_nil(&mut self) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(1);
        format::write_nil(&mut out);
        self.put(leaf(out))
    }

    pub fn encode_bool(&mut self, value: bool) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(1);
        format::write_bool(&mut out, value);
        self.put(leaf(out))
    }

    pub fn encode_u64(&mut self, value: u64) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(9);
        format::write_uint(&mut out, value);
        self.put(leaf(out))
    }

    pub fn encode_i64(&mut self, value: i64) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(9);
        format::write_int(&mut out, value);
        self.put(leaf(out))
    }

    pub fn encode_f32(&mut self, value: f32) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(5);
        format::write_f32(&mut out, value);
        self.put(leaf(out))
    }

    pub fn encode_f64(&mut self, value: f64) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(9);
        format::write_f64(&mut out, value);
        self.put(leaf(out))
    }

    pub fn encode_str(&mut self, value: &str) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(value.len() + 5);
        format::write_str(&mut out, value)?;
        self.put(leaf(out))
    }

    pub fn encode_bytes(&mut self, value: &[u8]) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(value.len() + 5);
        format::write_bin(&mut out, value)?;
        self.put(leaf(out))
    }

    pub fn encode_timestamp(&mut self, value: crate::Timestamp) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(15);
        format::write_timestamp(&mut out, value)?;
        self.put(leaf(out))
    }

    /// Encode any value through a fresh sub-encoder and splice its node in
    /// place.
    pub fn encode_value<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let node = to_node(value, self.path.clone(), Arc::clone(&self.user_info))?;
        self.put(node)
    }
}

/// Encoding container for a record of named fields.
///
/// Keys are written to the wire as UTF-8 strings in insertion order, so the
/// same value always produces the same bytes.
pub struct KeyedEncoder<'a> {
    entries: &'a mut IndexMap<String, Node>,
    path: CodingPath,
    user_info: Arc<UserInfo>,
}

impl KeyedEncoder<'_> {
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// Number of fields written so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encode_nil(&mut self, key: &str) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(1);
        format::write_nil(&mut out);
        self.entries.insert(key.to_owned(), leaf(out));
        Ok(())
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), EncodeError> {
        let node = to_node(value, self.path.child_key(key), Arc::clone(&self.user_info))?;
        self.entries.insert(key.to_owned(), node);
        Ok(())
    }

    /// A nested record under the given key.
    pub fn nested_keyed(&mut self, key: &str) -> KeyedEncoder<'_> {
        let slot = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Node::Map(IndexMap::new()));
        if !matches!(slot, Node::Map(_)) {
            *slot = Node::Map(IndexMap::new());
        }
        let path = self.path.child_key(key);
        let user_info = Arc::clone(&self.user_info);
        match slot {
            Node::Map(entries) => KeyedEncoder {
                entries,
                path,
                user_info,
            },
            _ => unreachable!("slot was just set to a map"),
        }
    }

    /// A nested list under the given key.
    pub fn nested_unkeyed(&mut self, key: &str) -> UnkeyedEncoder<'_> {
        let slot = self
            .entries
            .entry(key.to_owned())
            .or_insert_with(|| Node::Array(Vec::new()));
        if !matches!(slot, Node::Array(_)) {
            *slot = Node::Array(Vec::new());
        }
        let path = self.path.child_key(key);
        let user_info = Arc::clone(&self.user_info);
        match slot {
            Node::Array(elements) => UnkeyedEncoder {
                elements,
                path,
                user_info,
            },
            _ => unreachable!("slot was just set to an array"),
        }
    }
}

/// Encoding container for an ordered list of elements.
pub struct UnkeyedEncoder<'a> {
    elements: &'a mut Vec<Node>,
    path: CodingPath,
    user_info: Arc<UserInfo>,
}

impl UnkeyedEncoder<'_> {
    pub fn coding_path(&self) -> &CodingPath {
        &self.path
    }

    pub fn user_info(&self) -> &UserInfo {
        &self.user_info
    }

    /// Number of elements written so far.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn encode_nil(&mut self) -> Result<(), EncodeError> {
        let mut out = BytesMut::with_capacity(1);
        format::write_nil(&mut out);
        self.elements.push(leaf(out));
        Ok(())
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), EncodeError> {
        let path = self.path.child_index(self.elements.len());
        let node = to_node(value, path, Arc::clone(&self.user_info))?;
        self.elements.push(node);
        Ok(())
    }

    /// A nested record appended as the next element.
    pub fn nested_keyed(&mut self) -> KeyedEncoder<'_> {
        let path = self.path.child_index(self.elements.len());
        let user_info = Arc::clone(&self.user_info);
        self.elements.push(Node::Map(IndexMap::new()));
        match self.elements.last_mut() {
            Some(Node::Map(entries)) => KeyedEncoder {
                entries,
                path,
                user_info,
            },
            _ => unreachable!("a map was just pushed"),
        }
    }

    /// A nested list appended as the next element.
    pub fn nested_unkeyed(&mut self) -> UnkeyedEncoder<'_> {
        let path = self.path.child_index(self.elements.len());
        let user_info = Arc::clone(&self.user_info);
        self.elements.push(Node::Array(Vec::new()));
        match self.elements.last_mut() {
            Some(Node::Array(elements)) => UnkeyedEncoder {
                elements,
                path,
                user_info,
            },
            _ => unreachable!("an array was just pushed"),
        }
    }
}
