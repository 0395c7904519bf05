//! Range checks and property paths used by generated check routines.
//!
//! Bounds are expressed with [`core::ops::Bound`]: `Unbounded` for a missing
//! side, `Included`/`Excluded` for inclusive and exclusive limits.

use core::ops::Bound;

/// Numeric kinds a range constraint can apply to
pub trait Bounded: Copy + PartialOrd {
    /// Closest representable value above `self`, saturating at the maximum
    fn step_up(self) -> Self;
    /// Closest representable value below `self`, saturating at the minimum
    fn step_down(self) -> Self;
}

macro_rules! impl_bounded_int {
    ($($t:ty),*) => {
        $(
            impl Bounded for $t {
                #[inline]
                fn step_up(self) -> Self {
                    self.saturating_add(1)
                }

                #[inline]
                fn step_down(self) -> Self {
                    self.saturating_sub(1)
                }
            }
        )*
    };
}

impl_bounded_int!(i8, i16, i32, i64);

impl Bounded for f32 {
    #[inline]
    fn step_up(self) -> Self {
        self.next_up()
    }

    #[inline]
    fn step_down(self) -> Self {
        self.next_down()
    }
}

impl Bounded for f64 {
    #[inline]
    fn step_up(self) -> Self {
        self.next_up()
    }

    #[inline]
    fn step_down(self) -> Self {
        self.next_down()
    }
}

fn satisfies_min<T: Bounded>(value: T, min: Bound<T>) -> bool {
    match min {
        Bound::Unbounded => true,
        Bound::Included(lo) => value >= lo,
        Bound::Excluded(lo) => value > lo,
    }
}

fn satisfies_max<T: Bounded>(value: T, max: Bound<T>) -> bool {
    match max {
        Bound::Unbounded => true,
        Bound::Included(hi) => value <= hi,
        Bound::Excluded(hi) => value < hi,
    }
}

/// Whether `value` lies within both bounds
pub fn in_range<T: Bounded>(value: T, min: Bound<T>, max: Bound<T>) -> bool {
    satisfies_min(value, min) && satisfies_max(value, max)
}

/// Move `value` to the nearest value accepted by the bounds.
///
/// An exclusive bound clamps to the last value inside it (`[0, 100)` turns
/// `150` into `99`), so the repaired value always passes [`in_range`].
pub fn clamp<T: Bounded>(value: T, min: Bound<T>, max: Bound<T>) -> T {
    if !satisfies_min(value, min) {
        match min {
            Bound::Included(lo) => lo,
            Bound::Excluded(lo) => lo.step_up(),
            Bound::Unbounded => value,
        }
    } else if !satisfies_max(value, max) {
        match max {
            Bound::Included(hi) => hi,
            Bound::Excluded(hi) => hi.step_down(),
            Bound::Unbounded => value,
        }
    } else {
        value
    }
}

/// Path of the property `name` below `path`
pub fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Path of the element at `index` below `path`
pub fn index_path(path: &str, index: impl core::fmt::Debug) -> String {
    format!("{}[{:?}]", path, index)
}
