//! Pull-based lazy enumeration.
//!
//! Every iterator is restartable with `init()`, and re-running `init()`
//! reproduces the same enumeration. Only [`ForkIterator`]s can be cloned in
//! the middle of a stream.

pub mod combinator;
pub mod compositor;
pub mod single;

pub use combinator::{Combinator, CombinatorKind, DiagonalIterator, ProductIterator};
pub use compositor::CompositorKind;
pub use single::{CollectionIterator, SingleValueIterator};

pub trait LazyIterator<T> {
    /// Rewinds to the first element.
    fn init(&mut self);
    fn has_value(&self) -> bool;
    /// Current element. Does not advance.
    fn value(&self) -> T;
    fn next(&mut self);
    fn stop(&mut self) {}
}

pub trait ForkIterator<T>: LazyIterator<T> {
    /// Independent cursor at the same position.
    fn fork(&self) -> Box<dyn ForkIterator<T>>;
}

impl<T, I: LazyIterator<T> + ?Sized> LazyIterator<T> for Box<I> {
    fn init(&mut self) {
        (**self).init()
    }
    fn has_value(&self) -> bool {
        (**self).has_value()
    }
    fn value(&self) -> T {
        (**self).value()
    }
    fn next(&mut self) {
        (**self).next()
    }
    fn stop(&mut self) {
        (**self).stop()
    }
}

impl<T: 'static> ForkIterator<T> for Box<dyn ForkIterator<T>> {
    fn fork(&self) -> Box<dyn ForkIterator<T>> {
        (**self).fork()
    }
}

impl<T: 'static> Clone for Box<dyn ForkIterator<T>> {
    fn clone(&self) -> Self {
        self.fork()
    }
}

/// Collects every element from the first one on.
pub fn drain<T, I: LazyIterator<T> + ?Sized>(iter: &mut I) -> Vec<T> {
    let mut out = Vec::new();
    iter.init();
    while iter.has_value() {
        out.push(iter.value());
        iter.next();
    }
    iter.stop();
    out
}

// ----------------------------------------------------------------------------

/// Applies a pure function to every element of the inner iterator.
#[derive(Clone)]
pub struct MapIterator<S, I, F> {
    inner: I,
    func: F,
    _marker: std::marker::PhantomData<fn() -> S>,
}

impl<S, I, F> MapIterator<S, I, F> {
    pub fn new(inner: I, func: F) -> Self {
        MapIterator {
            inner,
            func,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S, T, I, F> LazyIterator<T> for MapIterator<S, I, F>
where
    I: LazyIterator<S>,
    F: Fn(S) -> T,
{
    fn init(&mut self) {
        self.inner.init()
    }
    fn has_value(&self) -> bool {
        self.inner.has_value()
    }
    fn value(&self) -> T {
        (self.func)(self.inner.value())
    }
    fn next(&mut self) {
        self.inner.next()
    }
    fn stop(&mut self) {
        self.inner.stop()
    }
}

impl<S, T, I, F> ForkIterator<T> for MapIterator<S, I, F>
where
    S: Clone + 'static,
    I: LazyIterator<S> + Clone + 'static,
    F: Fn(S) -> T + Clone + 'static,
{
    fn fork(&self) -> Box<dyn ForkIterator<T>> {
        Box::new(self.clone())
    }
}

// ----------------------------------------------------------------------------

/// Stops the inner iterator after `limit` elements.
#[derive(Clone)]
pub struct TakeIterator<I> {
    inner: I,
    limit: usize,
    count: usize,
}

impl<I> TakeIterator<I> {
    pub fn new(inner: I, limit: usize) -> Self {
        TakeIterator {
            inner,
            limit,
            count: 0,
        }
    }
}

impl<T, I: LazyIterator<T>> LazyIterator<T> for TakeIterator<I> {
    fn init(&mut self) {
        self.count = 0;
        self.inner.init();
    }
    fn has_value(&self) -> bool {
        self.count < self.limit && self.inner.has_value()
    }
    fn value(&self) -> T {
        self.inner.value()
    }
    fn next(&mut self) {
        self.count += 1;
        self.inner.next();
    }
    fn stop(&mut self) {
        self.inner.stop()
    }
}

impl<T: 'static, I: LazyIterator<T> + Clone + 'static> ForkIterator<T> for TakeIterator<I> {
    fn fork(&self) -> Box<dyn ForkIterator<T>> {
        Box::new(self.clone())
    }
}
