//! Randomness used to choose among canned responses.
//!
//! Production code picks uniformly; tests pin the choice with [`FixedPicker`].

/// Chooses an index into a non-empty candidate list.
pub trait ResponsePicker: Send {
    /// Returns an index in `0..len`. Never called with `len == 0`.
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniform choice backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformPicker;

impl ResponsePicker for UniformPicker {
    fn pick(&mut self, len: usize) -> usize {
        rand::random_range(0..len)
    }
}

/// Replays a fixed sequence of indices, wrapping around at the end.
///
/// Indices larger than the candidate list are reduced modulo its length.
#[derive(Debug, Clone)]
pub struct FixedPicker {
    sequence: Vec<usize>,
    cursor: usize,
}

impl FixedPicker {
    pub fn new(sequence: impl Into<Vec<usize>>) -> Self {
        Self {
            sequence: sequence.into(),
            cursor: 0,
        }
    }

    pub fn always(index: usize) -> Self {
        Self::new(vec![index])
    }
}

impl ResponsePicker for FixedPicker {
    fn pick(&mut self, len: usize) -> usize {
        if self.sequence.is_empty() {
            return 0;
        }
        let index = self.sequence[self.cursor % self.sequence.len()];
        self.cursor = self.cursor.wrapping_add(1);
        index % len
    }
}

impl<P: ResponsePicker + ?Sized> ResponsePicker for Box<P> {
    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }
}

/// Picks one element of `candidates`, or `None` when it is empty.
pub fn choose<'a, T>(picker: &mut dyn ResponsePicker, candidates: &'a [T]) -> Option<&'a T> {
    match candidates.len() {
        0 => None,
        1 => candidates.first(),
        len => candidates.get(picker.pick(len)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_picker_stays_in_range() {
        let mut picker = UniformPicker;
        for len in 1..20 {
            for _ in 0..50 {
                assert!(picker.pick(len) < len);
            }
        }
    }

    #[test]
    fn fixed_picker_replays_and_wraps() {
        let mut picker = FixedPicker::new(vec![2, 0, 7]);
        assert_eq!(picker.pick(5), 2);
        assert_eq!(picker.pick(5), 0);
        assert_eq!(picker.pick(5), 2);
        assert_eq!(picker.pick(5), 2);
    }

    #[test]
    fn fixed_picker_without_sequence_picks_first() {
        let mut picker = FixedPicker::new(Vec::new());
        assert_eq!(picker.pick(3), 0);
    }

    #[test]
    fn choose_handles_empty_and_single() {
        let mut picker = FixedPicker::always(4);
        let empty: [&str; 0] = [];
        assert_eq!(choose(&mut picker, &empty), None);
        assert_eq!(choose(&mut picker, &["only"]), Some(&"only"));
        assert_eq!(choose(&mut picker, &["a", "b", "c"]), Some(&"b"));
    }
}
