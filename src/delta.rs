//! Delta coding for integer lists.
//!
//! Sorted sample lists turn into runs of small gaps, which cost one or two
//! varint bytes each instead of the full index. The transform itself does not
//! require sorted input; unsorted lists produce negative gaps and still
//! invert exactly.

/// Replace each element with its difference from the previous one, in place.
///
/// `a[0]` is kept as is. Empty input is a no-op.
#[inline]
pub fn to_diffs(a: &mut [i64]) {
    if a.is_empty() {
        return;
    }
    let mut last = a[0];
    for x in a[1..].iter_mut() {
        let cur = *x;
        *x = cur.wrapping_sub(last);
        last = cur;
    }
}

/// Inverse of [`to_diffs`]: prefix-sum in place.
#[inline]
pub fn from_diffs(a: &mut [i64]) {
    for i in 1..a.len() {
        a[i] = a[i].wrapping_add(a[i - 1]);
    }
}
