use std::borrow::Borrow;
use std::hash::Hash;

use ahash::{HashMap, HashMapExt};
use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K> {
  key: K,
  next: Option<Index>,
  prev: Option<Index>,
}

/// A doubly linked recency list with O(1) touch, insert and removal.
///
/// Nodes live in an arena; the lookup map points each key at its node.
#[derive(Debug)]
pub(crate) struct LruList<K: Eq + Hash + Clone> {
  nodes: Arena<Node<K>>,
  lookup: HashMap<K, Index>,
  // Head is the most-recently-used item.
  head: Option<Index>,
  // Tail is the least-recently-used item.
  tail: Option<Index>,
}

impl<K: Eq + Hash + Clone> LruList<K> {
  pub(crate) fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::new(),
      head: None,
      tail: None,
    }
  }

  // Unlinks a node without removing it from the arena or the lookup map.
  fn unlink(&mut self, index: Index) {
    let (prev_node_idx, next_node_idx) = match self.nodes.get(index) {
      Some(node) => (node.prev, node.next),
      None => return,
    };

    if let Some(prev_idx) = prev_node_idx {
      self.nodes[prev_idx].next = next_node_idx;
    } else {
      self.head = next_node_idx;
    }

    if let Some(next_idx) = next_node_idx {
      self.nodes[next_idx].prev = prev_node_idx;
    } else {
      self.tail = prev_node_idx;
    }
  }

  // Links a node that is already in the arena in as the new head.
  fn push_front_node(&mut self, index: Index) {
    let old_head_idx = self.head;
    self.nodes[index].next = old_head_idx;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old_head) = old_head_idx {
      self.nodes[old_head].prev = Some(index);
    }

    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.lookup.len()
  }

  #[cfg(test)]
  pub(crate) fn contains<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.lookup.contains_key(key)
  }

  /// Inserts `key` as most recently used, or moves it there if already present.
  pub(crate) fn push_front(&mut self, key: K) {
    if self.lookup.contains_key(&key) {
      self.move_to_front(&key);
      return;
    }
    let index = self.nodes.insert(Node {
      key: key.clone(),
      next: None,
      prev: None,
    });
    self.lookup.insert(key, index);
    self.push_front_node(index);
  }

  pub(crate) fn move_to_front<Q>(&mut self, key: &Q)
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    if let Some(&index) = self.lookup.get(key) {
      if self.head != Some(index) {
        self.unlink(index);
        self.push_front_node(index);
      }
    }
  }

  /// Removes and returns the least recently used key.
  pub(crate) fn pop_back(&mut self) -> Option<K> {
    let tail_index = self.tail?;
    let key = self.nodes.get(tail_index)?.key.clone();
    self.remove(&key);
    Some(key)
  }

  pub(crate) fn remove<Q>(&mut self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    match self.lookup.remove(key) {
      Some(index) => {
        self.unlink(index);
        self.nodes.remove(index);
        true
      }
      None => false,
    }
  }

  pub(crate) fn clear(&mut self) {
    self.nodes.clear();
    self.lookup.clear();
    self.head = None;
    self.tail = None;
  }
}
