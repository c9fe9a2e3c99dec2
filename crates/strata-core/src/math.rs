//! Power-of-two and alignment arithmetic.
//!
//! Growth policies throughout the workspace round capacities up to powers
//! of two so that a sequence of small `reserve` calls still reallocates
//! only O(log n) times.

/// Whether `x` is a power of two. Zero is not.
#[inline]
pub fn is_power_of_two(x: usize) -> bool {
    x != 0 && x & (x - 1) == 0
}

/// Smallest power of two `>= x`, with `ceil_power_of_two(0) == 1`.
///
/// Returns `None` when the result does not fit in `usize`.
#[inline]
pub fn ceil_power_of_two(x: usize) -> Option<usize> {
    x.max(1).checked_next_power_of_two()
}

/// Round `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two. Returns `None` on overflow.
#[inline]
pub fn align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(is_power_of_two(alignment));
    let mask = alignment - 1;
    Some(value.checked_add(mask)? & !mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_not_a_power_of_two() {
        assert!(!is_power_of_two(0));
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(64));
        assert!(!is_power_of_two(96));
    }

    #[test]
    fn ceil_rounds_up() {
        assert_eq!(ceil_power_of_two(0), Some(1));
        assert_eq!(ceil_power_of_two(1), Some(1));
        assert_eq!(ceil_power_of_two(5), Some(8));
        assert_eq!(ceil_power_of_two(64), Some(64));
        assert_eq!(ceil_power_of_two(usize::MAX), None);
    }

    #[test]
    fn align_up_handles_boundaries() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(usize::MAX, 8), None);
    }

    proptest! {
        #[test]
        fn ceil_is_smallest_power_at_least_x(x in 1usize..(1 << 40)) {
            let p = ceil_power_of_two(x).unwrap();
            prop_assert!(is_power_of_two(p));
            prop_assert!(p >= x);
            prop_assert!(p / 2 < x);
        }

        #[test]
        fn align_up_is_aligned_and_minimal(value in 0usize..(1 << 40), shift in 0u32..13) {
            let alignment = 1usize << shift;
            let aligned = align_up(value, alignment).unwrap();
            prop_assert_eq!(aligned % alignment, 0);
            prop_assert!(aligned >= value);
            prop_assert!(aligned - value < alignment);
        }
    }
}
