//! Fixed-bucket chained hash table
//!
//! The single indexing primitive of the model. The bucket count is fixed at
//! creation and never grows, so callers size each table for its worst-case
//! load. Keys are copied into the table as raw bytes; values are stored as
//! given and handed back untouched on removal.

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Multiplier of the rolling hash used for byte-string keys
const STRING_HASH_MULTIPLIER: u32 = 31;

/// How a table turns key bytes into a hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Hash is the numeric value of the (little-endian) key
    Integer,
    /// Multiplicative rolling hash over the key bytes
    ByteString,
    /// Plain sum of the key bytes
    ByteSum,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("allocation failed: {0}")]
    AllocationFailure(String),

    #[error("key already present")]
    DuplicateKey,

    #[error("key not found")]
    KeyNotFound,
}

/// Anything that can be turned into table key bytes
pub trait TableKey {
    fn key_bytes(&self) -> Cow<'_, [u8]>;
}

impl TableKey for u16 {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_le_bytes().to_vec())
    }
}

impl TableKey for u32 {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.to_le_bytes().to_vec())
    }
}

impl TableKey for str {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl TableKey for String {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl TableKey for [u8] {
    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

struct Entry<V> {
    key: Box<[u8]>,
    value: V,
    next: Option<Box<Entry<V>>>,
}

type Link<V> = Option<Box<Entry<V>>>;

pub struct HashTable<V> {
    buckets: Vec<Link<V>>,
    kind: KeyKind,
    hasher: fn(&[u8]) -> u32,
    len: usize,
}

fn hash_integer(key: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    let n = key.len().min(4);
    raw[..n].copy_from_slice(&key[..n]);
    u32::from_le_bytes(raw)
}

fn hash_string(key: &[u8]) -> u32 {
    key.iter().fold(0u32, |sum, &b| {
        sum.wrapping_mul(STRING_HASH_MULTIPLIER).wrapping_add(b as u32)
    })
}

fn hash_byte_sum(key: &[u8]) -> u32 {
    key.iter().fold(0u32, |sum, &b| sum.wrapping_add(b as u32))
}

impl<V> HashTable<V> {
    /// Create a table with `bucket_count` chains.
    ///
    /// A power-of-two count routes by masking, anything else by modulo.
    pub fn create(bucket_count: usize, kind: KeyKind) -> Result<Self, HashError> {
        if bucket_count == 0 {
            return Err(HashError::AllocationFailure(
                "bucket count must be non-zero".to_string(),
            ));
        }

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(bucket_count)
            .map_err(|e| HashError::AllocationFailure(e.to_string()))?;
        buckets.resize_with(bucket_count, || None);

        let hasher = match kind {
            KeyKind::Integer => hash_integer,
            KeyKind::ByteString => hash_string,
            KeyKind::ByteSum => hash_byte_sum,
        };

        Ok(Self {
            buckets,
            kind,
            hasher,
            len: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn key_kind(&self) -> KeyKind {
        self.kind
    }

    /// Bucket a key routes to
    pub fn bucket_index<K: TableKey + ?Sized>(&self, key: &K) -> usize {
        self.index_of(&key.key_bytes())
    }

    fn index_of(&self, key: &[u8]) -> usize {
        let n = self.buckets.len();
        if n == 1 && self.kind == KeyKind::ByteString {
            return 0;
        }

        let hash = (self.hasher)(key) as usize;
        if n.is_power_of_two() {
            hash & (n - 1)
        } else {
            hash % n
        }
    }

    fn chain(&self, idx: usize) -> impl Iterator<Item = &Entry<V>> {
        std::iter::successors(self.buckets[idx].as_deref(), |e| e.next.as_deref())
    }

    /// Insert a new key. An existing equal key fails with `DuplicateKey`
    /// and leaves the table untouched.
    pub fn insert<K: TableKey + ?Sized>(&mut self, key: &K, value: V) -> Result<(), HashError> {
        let bytes = key.key_bytes();
        let idx = self.index_of(&bytes);

        if self.chain(idx).any(|e| *e.key == *bytes) {
            return Err(HashError::DuplicateKey);
        }

        let head = self.buckets[idx].take();
        self.buckets[idx] = Some(Box::new(Entry {
            key: bytes.into_owned().into_boxed_slice(),
            value,
            next: head,
        }));
        self.len += 1;
        Ok(())
    }

    pub fn get<K: TableKey + ?Sized>(&self, key: &K) -> Option<&V> {
        let bytes = key.key_bytes();
        let idx = self.index_of(&bytes);
        self.chain(idx)
            .find(|e| *e.key == *bytes)
            .map(|e| &e.value)
    }

    pub fn get_mut<K: TableKey + ?Sized>(&mut self, key: &K) -> Option<&mut V> {
        let bytes = key.key_bytes();
        let idx = self.index_of(&bytes);

        let mut node = self.buckets[idx].as_deref_mut();
        while let Some(entry) = node {
            if *entry.key == *bytes {
                return Some(&mut entry.value);
            }
            node = entry.next.as_deref_mut();
        }
        None
    }

    pub fn contains_key<K: TableKey + ?Sized>(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Unlink a key and hand its value back to the caller
    pub fn remove<K: TableKey + ?Sized>(&mut self, key: &K) -> Result<V, HashError> {
        let bytes = key.key_bytes();
        let idx = self.index_of(&bytes);

        let position = self
            .chain(idx)
            .position(|e| *e.key == *bytes)
            .ok_or(HashError::KeyNotFound)?;

        let mut link = &mut self.buckets[idx];
        for _ in 0..position {
            link = match link {
                Some(entry) => &mut entry.next,
                None => return Err(HashError::KeyNotFound),
            };
        }

        let entry = link.take().ok_or(HashError::KeyNotFound)?;
        let Entry { value, next, .. } = *entry;
        *link = next;
        self.len -= 1;
        Ok(value)
    }

    /// Walk buckets in index order, each chain newest entry first
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            node: None,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<V> Drop for HashTable<V> {
    fn drop(&mut self) {
        // Unlink chains iteratively so long chains cannot exhaust the stack
        for bucket in self.buckets.iter_mut() {
            let mut node = bucket.take();
            while let Some(mut entry) = node {
                node = entry.next.take();
            }
        }
    }
}

impl<V> fmt::Debug for HashTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("kind", &self.kind)
            .field("bucket_count", &self.buckets.len())
            .field("len", &self.len)
            .finish()
    }
}

pub struct Iter<'a, V> {
    buckets: std::slice::Iter<'a, Link<V>>,
    node: Option<&'a Entry<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.node {
                self.node = entry.next.as_deref();
                return Some((&*entry.key, &entry.value));
            }
            self.node = self.buckets.next()?.as_deref();
        }
    }
}
