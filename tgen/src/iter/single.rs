use super::{ForkIterator, LazyIterator};

/// Yields one value.
#[derive(Debug, Clone)]
pub struct SingleValueIterator<T> {
    value: T,
    has: bool,
}

impl<T> SingleValueIterator<T> {
    pub fn new(value: T) -> Self {
        SingleValueIterator { value, has: false }
    }
}

impl<T: Clone> LazyIterator<T> for SingleValueIterator<T> {
    fn init(&mut self) {
        self.has = true;
    }
    fn has_value(&self) -> bool {
        self.has
    }
    fn value(&self) -> T {
        self.value.clone()
    }
    fn next(&mut self) {
        self.has = false;
    }
}

impl<T: Clone + 'static> ForkIterator<T> for SingleValueIterator<T> {
    fn fork(&self) -> Box<dyn ForkIterator<T>> {
        Box::new(self.clone())
    }
}

/// Yields the items of a list in order.
#[derive(Debug, Clone)]
pub struct CollectionIterator<T> {
    items: Vec<T>,
    index: usize,
}

impl<T> CollectionIterator<T> {
    pub fn new(items: Vec<T>) -> Self {
        CollectionIterator { items, index: 0 }
    }
}

impl<T: Clone> LazyIterator<T> for CollectionIterator<T> {
    fn init(&mut self) {
        self.index = 0;
    }
    fn has_value(&self) -> bool {
        self.index < self.items.len()
    }
    fn value(&self) -> T {
        self.items[self.index].clone()
    }
    fn next(&mut self) {
        self.index += 1;
    }
}

impl<T: Clone + 'static> ForkIterator<T> for CollectionIterator<T> {
    fn fork(&self) -> Box<dyn ForkIterator<T>> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::drain;

    #[test]
    fn single() {
        let mut iter = SingleValueIterator::new("x");
        assert!(!iter.has_value());
        assert_eq!(drain(&mut iter), vec!["x"]);
    }

    #[test]
    fn empty_collection() {
        let mut iter = CollectionIterator::<u8>::new(vec![]);
        assert!(drain(&mut iter).is_empty());
    }
}
