//! Bounded lists of persistent impulse sources.
//!
//! A source injects velocity and temperature into the fluid at a fixed point every step.
//! Lists keep insertion order and silently drop additions once full.
use std::slice;

use fluidconfig::InputConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source list is empty")]
    Empty,
    #[error("source list is full ({capacity} sources)")]
    AtCapacity { capacity: usize },
    #[error("source index {index} out of range for {len} sources")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseSource {
    /// Centre in normalized `[-1, 1]` space, y up.
    pub position: [f32; 2],
    /// `(vx, vy, temperature)`.
    pub impulse: [f32; 3],
    pub radius: f32,
}

impl ImpulseSource {
    pub fn new(position: [f32; 2], impulse: [f32; 3], radius: f32) -> Self {
        Self {
            position,
            impulse,
            radius,
        }
    }

    pub fn distance_to(&self, point: [f32; 2]) -> f32 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        (dx * dx + dy * dy).sqrt()
    }

    pub fn contains_point(&self, point: [f32; 2]) -> bool {
        self.distance_to(point) <= self.radius
    }
}

#[derive(Debug, Clone)]
pub struct SourceList {
    sources: Vec<ImpulseSource>,
    capacity: usize,
}

impl SourceList {
    pub fn new(capacity: usize) -> Self {
        Self {
            sources: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn from_config(config: &InputConfig) -> Self {
        Self::new(config.max_sources)
    }

    /// Appends `source`, returning `false` when the list is already full.
    pub fn add(&mut self, source: ImpulseSource) -> bool {
        if self.is_full() {
            return false;
        }
        self.sources.push(source);
        true
    }

    /// Like [`SourceList::add`] but reports a full list as an error.
    pub fn try_add(&mut self, source: ImpulseSource) -> Result<(), SourceError> {
        if self.add(source) {
            Ok(())
        } else {
            Err(SourceError::AtCapacity {
                capacity: self.capacity,
            })
        }
    }

    /// Removes every source within `radius` of `point` (inclusive) and returns how many went.
    pub fn remove_in_radius(&mut self, point: [f32; 2], radius: f32) -> usize {
        let before = self.sources.len();
        self.sources
            .retain(|source| source.distance_to(point) > radius);
        before - self.sources.len()
    }

    pub fn remove_at(&mut self, index: usize) -> Result<ImpulseSource, SourceError> {
        if index >= self.sources.len() {
            return Err(SourceError::IndexOutOfRange {
                index,
                len: self.sources.len(),
            });
        }
        Ok(self.sources.remove(index))
    }

    /// Removes the most recently added source.
    pub fn pop(&mut self) -> Result<ImpulseSource, SourceError> {
        self.sources.pop().ok_or(SourceError::Empty)
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    pub fn get(&self, index: usize) -> Option<&ImpulseSource> {
        self.sources.get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, ImpulseSource> {
        self.sources.iter()
    }

    pub fn as_slice(&self) -> &[ImpulseSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sources.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<'a> IntoIterator for &'a SourceList {
    type Item = &'a ImpulseSource;
    type IntoIter = slice::Iter<'a, ImpulseSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_at(x: f32, y: f32) -> ImpulseSource {
        ImpulseSource::new([x, y], [1.0, 0.0, 0.0], 0.1)
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut list = SourceList::new(3);
        for step in 0..10 {
            list.add(source_at(step as f32 * 0.1, 0.0));
            assert!(list.len() <= list.capacity());
        }
        assert_eq!(list.len(), 3);
        assert!(list.is_full());
        assert_eq!(list.get(2).map(|s| s.position[0]), Some(0.2));
    }

    #[test]
    fn add_reports_full_list() {
        let mut list = SourceList::new(1);
        assert!(list.add(source_at(0.0, 0.0)));
        assert!(!list.add(source_at(0.5, 0.0)));
        assert_eq!(
            list.try_add(source_at(0.5, 0.0)),
            Err(SourceError::AtCapacity { capacity: 1 })
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn from_config_uses_max_sources() {
        let config = InputConfig::default();
        let list = SourceList::from_config(&config);
        assert_eq!(list.capacity(), 5);
        assert!(list.is_empty());
    }

    #[test]
    fn remove_in_radius_is_inclusive() {
        let mut list = SourceList::new(5);
        list.add(source_at(0.0, 0.0));
        list.add(source_at(0.5, 0.0));
        list.add(source_at(0.25, 0.0));
        list.add(source_at(0.0, 0.75));

        let removed = list.remove_in_radius([0.0, 0.0], 0.5);
        assert_eq!(removed, 3);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).map(|s| s.position), Some([0.0, 0.75]));
    }

    #[test]
    fn remove_in_radius_preserves_order_of_survivors() {
        let mut list = SourceList::new(5);
        list.add(source_at(-0.9, 0.0));
        list.add(source_at(0.0, 0.0));
        list.add(source_at(0.9, 0.0));
        list.remove_in_radius([0.0, 0.0], 0.1);
        let xs: Vec<f32> = list.iter().map(|s| s.position[0]).collect();
        assert_eq!(xs, vec![-0.9, 0.9]);
    }

    #[test]
    fn pop_on_empty_leaves_list_unchanged() {
        let mut list = SourceList::new(2);
        assert_eq!(list.pop(), Err(SourceError::Empty));
        assert!(list.is_empty());
        assert_eq!(list.capacity(), 2);
    }

    #[test]
    fn pop_returns_most_recent() {
        let mut list = SourceList::new(4);
        list.add(source_at(0.1, 0.0));
        list.add(source_at(0.2, 0.0));
        let popped = list.pop().expect("pop");
        assert_eq!(popped.position, [0.2, 0.0]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_at_shifts_later_indices() {
        let mut list = SourceList::new(4);
        list.add(source_at(0.1, 0.0));
        list.add(source_at(0.2, 0.0));
        list.add(source_at(0.3, 0.0));
        let removed = list.remove_at(0).expect("remove");
        assert_eq!(removed.position[0], 0.1);
        assert_eq!(list.get(0).map(|s| s.position[0]), Some(0.2));
        assert_eq!(
            list.remove_at(5),
            Err(SourceError::IndexOutOfRange { index: 5, len: 2 })
        );
    }

    #[test]
    fn clear_empties_list() {
        let mut list = SourceList::new(2);
        list.add(source_at(0.0, 0.0));
        list.clear();
        assert!(list.is_empty());
        assert!(!list.is_full());
    }

    #[test]
    fn contains_point_uses_radius() {
        let source = ImpulseSource::new([0.0, 0.0], [0.0; 3], 0.5);
        assert!(source.contains_point([0.0, 0.5]));
        assert!(source.contains_point([0.25, 0.25]));
        assert!(!source.contains_point([0.4, 0.4]));
    }
}
