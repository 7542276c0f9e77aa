//! Remove / remove-swap / insert on the live prefix `buffer[..*len]` of a
//! fixed buffer.
//!
//! The buffer never grows. Slots past `*len` keep whatever they held.

/// Removes `buffer[index]`, shifting the tail down by one.
///
/// Order of the remaining elements is preserved.
///
/// # Panics
///
/// Panics if `index >= *len`.
pub fn remove<T: Copy>(buffer: &mut [T], len: &mut usize, index: usize) -> T {
    assert!(index < *len, "remove index {index} out of bounds (len {})", *len);
    let removed = buffer[index];
    buffer.copy_within(index + 1..*len, index);
    *len -= 1;
    removed
}

/// Removes `buffer[index]` by moving the last live element into its slot.
///
/// O(1), does not preserve order.
///
/// # Panics
///
/// Panics if `index >= *len`.
pub fn remove_swap_end<T: Copy>(buffer: &mut [T], len: &mut usize, index: usize) -> T {
    assert!(index < *len, "remove index {index} out of bounds (len {})", *len);
    let removed = buffer[index];
    *len -= 1;
    buffer[index] = buffer[*len];
    removed
}

/// Inserts `value` at `index`, shifting the tail up by one.
///
/// Returns `false` and leaves the buffer untouched when it is full.
///
/// # Panics
///
/// Panics if `index > *len`.
#[must_use]
pub fn insert<T: Copy>(buffer: &mut [T], len: &mut usize, index: usize, value: T) -> bool {
    assert!(index <= *len, "insert index {index} out of bounds (len {})", *len);
    if *len == buffer.len() {
        return false;
    }
    buffer.copy_within(index..*len, index + 1);
    buffer[index] = value;
    *len += 1;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_preserves_order() {
        let mut buffer = [1, 2, 3, 4, 0];
        let mut len = 4;
        assert_eq!(remove(&mut buffer, &mut len, 1), 2);
        assert_eq!(&buffer[..len], &[1, 3, 4]);
    }

    #[test]
    fn test_remove_swap_end() {
        let mut buffer = [1, 2, 3, 4];
        let mut len = 4;
        assert_eq!(remove_swap_end(&mut buffer, &mut len, 0), 1);
        assert_eq!(&buffer[..len], &[4, 2, 3]);

        // Removing the last element is a plain pop.
        assert_eq!(remove_swap_end(&mut buffer, &mut len, 2), 3);
        assert_eq!(&buffer[..len], &[4, 2]);
    }

    #[test]
    fn test_insert() {
        let mut buffer = [0u8; 4];
        let mut len = 0;
        assert!(insert(&mut buffer, &mut len, 0, b'b'));
        assert!(insert(&mut buffer, &mut len, 0, b'a'));
        assert!(insert(&mut buffer, &mut len, 2, b'd'));
        assert!(insert(&mut buffer, &mut len, 2, b'c'));
        assert_eq!(&buffer[..len], b"abcd");
        assert!(!insert(&mut buffer, &mut len, 1, b'x'));
        assert_eq!(len, 4);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_remove_out_of_bounds() {
        let mut buffer = [1, 2, 3];
        let mut len = 2;
        let _ = remove(&mut buffer, &mut len, 2);
    }
}
