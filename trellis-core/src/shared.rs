//! Change detection helpers for interception layers.
//!
//! A write only needs to trigger when the stored value actually changes.
//! "Changes" follows SameValue semantics: `NaN` is the same as `NaN`, but
//! `+0.0` and `-0.0` are different values.

/// Identity comparison used to decide whether a write is observable.
pub trait SameValue {
    /// Whether `self` and `other` are indistinguishable to a reader.
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, str, String, ()
);

impl SameValue for f64 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() && other.is_nan() {
            return true;
        }
        self.to_bits() == other.to_bits()
    }
}

impl SameValue for f32 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() && other.is_nan() {
            return true;
        }
        self.to_bits() == other.to_bits()
    }
}

impl<T: SameValue + ?Sized> SameValue for &T {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(*other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Returns `true` when writing `value` over `old` must notify readers.
#[inline]
pub fn has_changed<T: SameValue + ?Sized>(value: &T, old: &T) -> bool {
    !value.same_value(old)
}
