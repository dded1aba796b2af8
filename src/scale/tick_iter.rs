use super::{linear, log};
use num_traits::Float;

/// A raw tick value and its nesting level (0 is the coarsest), before it is
/// positioned and labelled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark<D> {
    pub value: D,
    pub level: u8,
}

/// Iterator over the raw marks produced for one scale type.
pub struct TickIter<D> {
    inner: Box<dyn Iterator<Item = Mark<D>> + 'static>,
}

impl<D: 'static> TickIter<D> {
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Mark<D>> + 'static,
    {
        Self {
            inner: Box::new(iter),
        }
    }

    /// Creates a `TickIter` from a vector of marks, such as the keys of a
    /// manual table.
    pub fn from_vec(vec: Vec<Mark<D>>) -> Self {
        Self::new(vec.into_iter())
    }
}

impl<D: Float + 'static> TickIter<D> {
    pub(crate) fn from_linear(iter: linear::LinearTickIter<D>) -> Self {
        Self::new(iter)
    }

    pub(crate) fn from_log(iter: log::LogTickIter<D>) -> Self {
        Self::new(iter)
    }
}

impl<D> Iterator for TickIter<D> {
    type Item = Mark<D>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_preserves_order() {
        let marks = vec![
            Mark { value: 3.0, level: 0 },
            Mark { value: 1.0, level: 0 },
        ];
        let values: Vec<f64> = TickIter::from_vec(marks).map(|m| m.value).collect();
        assert_eq!(values, vec![3.0, 1.0]);
    }
}
