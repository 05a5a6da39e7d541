use std::marker::PhantomData;
use std::str::FromStr;

use strum::{Display, EnumString};

use super::{ForkIterator, LazyIterator};
use crate::error::{Error, Result};

/// Odometer order: the last iterator varies fastest.
#[derive(Clone)]
pub struct ProductIterator<T, I> {
    iters: Vec<I>,
    has: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T, I: LazyIterator<T>> ProductIterator<T, I> {
    pub fn new(iters: Vec<I>) -> Self {
        ProductIterator {
            iters,
            has: false,
            _marker: PhantomData,
        }
    }
}

impl<T, I: LazyIterator<T>> LazyIterator<Vec<T>> for ProductIterator<T, I> {
    fn init(&mut self) {
        self.iters.iter_mut().for_each(|iter| iter.init());
        self.has = self.iters.iter().all(|iter| iter.has_value());
    }

    fn has_value(&self) -> bool {
        self.has
    }

    fn value(&self) -> Vec<T> {
        self.iters.iter().map(|iter| iter.value()).collect()
    }

    fn next(&mut self) {
        for i in (0..self.iters.len()).rev() {
            self.iters[i].next();
            if self.iters[i].has_value() {
                return;
            }
            self.iters[i].init();
        }
        self.has = false;
    }

    fn stop(&mut self) {
        self.iters.iter_mut().for_each(|iter| iter.stop());
    }
}

/// Parallel order: exhausted iterators restart until all of them have
/// finished at least once.
#[derive(Clone)]
pub struct DiagonalIterator<T, I> {
    iters: Vec<I>,
    done: Vec<bool>,
    has: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T, I: LazyIterator<T>> DiagonalIterator<T, I> {
    pub fn new(iters: Vec<I>) -> Self {
        let done = vec![false; iters.len()];
        DiagonalIterator {
            iters,
            done,
            has: false,
            _marker: PhantomData,
        }
    }
}

impl<T, I: LazyIterator<T>> LazyIterator<Vec<T>> for DiagonalIterator<T, I> {
    fn init(&mut self) {
        self.iters.iter_mut().for_each(|iter| iter.init());
        self.done.iter_mut().for_each(|done| *done = false);
        self.has = self.iters.iter().all(|iter| iter.has_value());
    }

    fn has_value(&self) -> bool {
        self.has
    }

    fn value(&self) -> Vec<T> {
        self.iters.iter().map(|iter| iter.value()).collect()
    }

    fn next(&mut self) {
        if self.iters.is_empty() {
            self.has = false;
            return;
        }
        for (iter, done) in self.iters.iter_mut().zip(self.done.iter_mut()) {
            iter.next();
            if !iter.has_value() {
                *done = true;
                iter.init();
            }
        }
        if self.done.iter().all(|done| *done) {
            self.has = false;
        }
    }

    fn stop(&mut self) {
        self.iters.iter_mut().for_each(|iter| iter.stop());
    }
}

// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum CombinatorKind {
    #[strum(serialize = "diagonal")]
    Diagonal,
    #[strum(to_string = "product", serialize = "exhaustive")]
    Product,
}

impl CombinatorKind {
    pub fn parse(name: &str) -> Result<Self> {
        Self::from_str(name).map_err(|_| Error::UnknownCombinator(name.to_string()))
    }

    pub fn build<T, I: LazyIterator<T>>(self, iters: Vec<I>) -> Combinator<T, I> {
        match self {
            CombinatorKind::Diagonal => Combinator::Diagonal(DiagonalIterator::new(iters)),
            CombinatorKind::Product => Combinator::Product(ProductIterator::new(iters)),
        }
    }
}

/// Combinator selected by name. Forkable when its sub-iterators are `Clone`.
#[derive(Clone)]
pub enum Combinator<T, I> {
    Diagonal(DiagonalIterator<T, I>),
    Product(ProductIterator<T, I>),
}

macro_rules! dispatch {
    ($self:expr, $iter:ident => $body:expr) => {
        match $self {
            Combinator::Diagonal($iter) => $body,
            Combinator::Product($iter) => $body,
        }
    };
}

impl<T, I: LazyIterator<T>> LazyIterator<Vec<T>> for Combinator<T, I> {
    fn init(&mut self) {
        dispatch!(self, iter => iter.init())
    }
    fn has_value(&self) -> bool {
        dispatch!(self, iter => iter.has_value())
    }
    fn value(&self) -> Vec<T> {
        dispatch!(self, iter => iter.value())
    }
    fn next(&mut self) {
        dispatch!(self, iter => iter.next())
    }
    fn stop(&mut self) {
        dispatch!(self, iter => iter.stop())
    }
}

impl<T, I> ForkIterator<Vec<T>> for Combinator<T, I>
where
    T: Clone + 'static,
    I: LazyIterator<T> + Clone + 'static,
{
    fn fork(&self) -> Box<dyn ForkIterator<Vec<T>>> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::{drain, CollectionIterator};

    fn lists(lens: &[usize]) -> Vec<CollectionIterator<usize>> {
        lens.iter()
            .map(|len| CollectionIterator::new((0..*len).collect()))
            .collect()
    }

    #[test]
    fn product_order() {
        let mut iter = CombinatorKind::Product.build(lists(&[2, 3]));
        let got = drain(&mut iter);
        assert_eq!(
            got,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn diagonal_restarts_shorter() {
        let mut iter = CombinatorKind::Diagonal.build(lists(&[2, 3]));
        let got = drain(&mut iter);
        assert_eq!(got, vec![vec![0, 0], vec![1, 1], vec![0, 2]]);
    }

    #[test]
    fn zero_iterators_yield_one_empty_tuple() {
        for kind in [CombinatorKind::Diagonal, CombinatorKind::Product] {
            let mut iter = kind.build(lists(&[]));
            assert_eq!(drain(&mut iter), vec![Vec::<usize>::new()]);
        }
    }

    #[test]
    fn empty_member_yields_nothing() {
        let mut iter = CombinatorKind::Product.build(lists(&[2, 0]));
        assert!(drain(&mut iter).is_empty());
    }

    #[test]
    fn names() {
        assert_eq!(CombinatorKind::parse("exhaustive").unwrap(), CombinatorKind::Product);
        assert_eq!(CombinatorKind::parse("product").unwrap(), CombinatorKind::Product);
        assert_eq!(CombinatorKind::Product.to_string(), "product");
        assert_eq!(CombinatorKind::parse("diagonal").unwrap(), CombinatorKind::Diagonal);
        assert!(matches!(
            CombinatorKind::parse("random"),
            Err(Error::UnknownCombinator(_))
        ));
    }

    #[test]
    fn fork_mid_stream() {
        let mut iter = CombinatorKind::Product.build(lists(&[2, 2]));
        iter.init();
        iter.next();
        let mut fork = iter.fork();
        assert_eq!(fork.value(), vec![0, 1]);
        fork.next();
        assert_eq!(fork.value(), vec![1, 0]);
        assert_eq!(iter.value(), vec![0, 1]);
    }
}
