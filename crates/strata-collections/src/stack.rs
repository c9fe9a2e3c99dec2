//! LIFO stack over a [`Vector`].

use std::slice;

use strata_alloc::{Allocator, RawAllocator};

use crate::vector::{Vector, DEFAULT_INLINE_CAPACITY};

/// A stack whose first `N` elements are stored inline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stack<T, const N: usize = DEFAULT_INLINE_CAPACITY, A: Allocator = RawAllocator> {
    elements: Vector<T, N, A>,
}

impl<T, const N: usize> Stack<T, N, RawAllocator> {
    /// Create an empty stack.
    pub const fn new() -> Self {
        Self {
            elements: Vector::new(),
        }
    }

    /// Stack holding clones of `values`, the last one on top.
    pub fn from_slice(values: &[T]) -> Self
    where
        T: Clone,
    {
        Self {
            elements: Vector::from_slice(values),
        }
    }
}

impl<T, const N: usize, A: Allocator> Stack<T, N, A> {
    /// Create an empty stack drawing heap storage from `allocator`.
    pub fn new_in(allocator: A) -> Self {
        Self {
            elements: Vector::new_in(allocator),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the stack has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Put `value` on top.
    pub fn push(&mut self, value: T) {
        self.elements.append(value);
    }

    /// Push clones of `values` in order, so the last one ends up on top.
    pub fn push_multiple(&mut self, values: &[T])
    where
        T: Clone,
    {
        self.elements.extend_from_slice(values);
    }

    /// Remove and return the top element.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty.
    pub fn pop(&mut self) -> T {
        assert!(!self.is_empty(), "pop from an empty stack");
        self.elements.pop_last()
    }

    /// The top element.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty.
    pub fn peek(&self) -> &T {
        assert!(!self.is_empty(), "peek into an empty stack");
        self.elements.last()
    }

    /// The top element, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty.
    pub fn peek_mut(&mut self) -> &mut T {
        assert!(!self.is_empty(), "peek into an empty stack");
        self.elements.last_mut()
    }

    /// Remove every element, keeping the memory.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Remove every element and release heap memory.
    pub fn clear_and_make_small(&mut self) {
        self.elements.clear_and_make_small();
    }

    /// Linear search for `value`.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.elements.contains(value)
    }

    /// Iterate from the bottom to the top.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// The elements from the bottom to the top.
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl<T, const N: usize, A: Allocator + Default> Default for Stack<T, N, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, const N: usize, A: Allocator> Extend<T> for Stack<T, N, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.elements.extend(iter);
    }
}

impl<T, const N: usize> FromIterator<T> for Stack<T, N, RawAllocator> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl<'a, T, const N: usize, A: Allocator> IntoIterator for &'a Stack<T, N, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
