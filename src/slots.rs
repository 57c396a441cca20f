use smallvec::SmallVec;

/// A small container of items addressed by stable, never-reused ids.
///
/// - **SmallVec Optimization**: the common case of 0-2 items never touches the
///   heap.
/// - **Stable ids**: ids come from a monotonic counter, so an id handed out
///   once always refers to the same item (or to nothing, once removed).
pub(crate) struct IdSlots<T> {
  next_id: usize,
  items: SmallVec<[(usize, T); 2]>,
}

impl<T> Default for IdSlots<T> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<T> IdSlots<T> {
  /// Add an item and return its id.
  pub fn add(&mut self, item: T) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, item));
    id
  }

  /// Reserve the next id without adding an item.
  ///
  /// Use this with `insert()` when the item needs to know its own id.
  pub fn reserve_id(&mut self) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  /// Insert an item under an id obtained from `reserve_id()`.
  #[inline]
  pub fn insert(&mut self, id: usize, item: T) { self.items.push((id, item)); }

  /// Remove an item by id.
  pub fn remove(&mut self, id: usize) -> Option<T> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  /// `true` if `id` was ever handed out by this container.
  #[inline]
  pub fn was_issued(&self, id: usize) -> bool { id < self.next_id }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn ids(&self) -> impl Iterator<Item = usize> + '_ { self.items.iter().map(|(id, _)| *id) }

  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &T> { self.items.iter().map(|(_, item)| item) }

  /// Drain all items, in insertion order.
  pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
    self.items.drain(..).map(|(_, item)| item)
  }

  /// Removes and returns every item whose id fails `keep`.
  pub fn extract_unless(&mut self, mut keep: impl FnMut(usize) -> bool) -> Vec<(usize, T)> {
    let mut kept = SmallVec::new();
    let mut extracted = vec![];
    for (id, item) in self.items.drain(..) {
      if keep(id) {
        kept.push((id, item));
      } else {
        extracted.push((id, item));
      }
    }
    self.items = kept;
    extracted
  }
}
