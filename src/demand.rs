//! Demand: how many values a subscriber is willing to accept.
//!
//! `Demand` is a plain `Copy` value. All arithmetic saturates at
//! [`Demand::Unlimited`] and floors at [`Demand::None`], so demand
//! bookkeeping never overflows nor goes negative.

use std::{
  cmp::Ordering,
  fmt::{Debug, Display, Formatter},
  hash::{Hash, Hasher},
  ops::{Add, AddAssign, Sub, SubAssign},
};

/// A bounded or unbounded count of items a consumer currently permits a
/// producer to send.
///
/// `Finite(0)` is treated exactly like `None`: it compares and hashes equal.
/// Prefer [`Demand::max`], which normalizes zero for you.
///
/// ```rust
/// use backpressure_rx::prelude::*;
///
/// let demand = Demand::max(2) + Demand::max(3);
/// assert_eq!(demand, Demand::max(5));
/// assert_eq!(Demand::max(1) - 5, Demand::None);
/// assert!(Demand::None < Demand::max(1));
/// assert!(Demand::max(usize::MAX) < Demand::Unlimited);
/// ```
#[derive(Clone, Copy)]
pub enum Demand {
  None,
  Finite(usize),
  Unlimited,
}

impl Demand {
  /// A finite demand of `count` items; `0` yields [`Demand::None`].
  #[inline]
  pub const fn max(count: usize) -> Self {
    if count == 0 { Demand::None } else { Demand::Finite(count) }
  }

  /// The finite count, or `None` for unlimited demand.
  #[inline]
  pub const fn max_count(self) -> Option<usize> {
    match self {
      Demand::None => Some(0),
      Demand::Finite(n) => Some(n),
      Demand::Unlimited => None,
    }
  }

  /// `true` when at least one more value may be delivered.
  #[inline]
  pub const fn is_positive(self) -> bool {
    match self {
      Demand::None => false,
      Demand::Finite(n) => n > 0,
      Demand::Unlimited => true,
    }
  }

  #[inline]
  pub const fn is_unlimited(self) -> bool { matches!(self, Demand::Unlimited) }

  /// Sum of two demands, saturating at [`Demand::Unlimited`].
  pub const fn saturating_add(self, other: Demand) -> Demand {
    match (self, other) {
      (Demand::Unlimited, _) | (_, Demand::Unlimited) => Demand::Unlimited,
      (Demand::None, rhs) => rhs.normalized(),
      (lhs, Demand::None) => lhs.normalized(),
      (Demand::Finite(a), Demand::Finite(b)) => match a.checked_add(b) {
        Some(sum) => Demand::max(sum),
        None => Demand::Unlimited,
      },
    }
  }

  /// Subtracts `count` from a finite demand, flooring at [`Demand::None`].
  /// Unlimited demand stays unlimited.
  pub const fn saturating_sub(self, count: usize) -> Demand {
    match self {
      Demand::None => Demand::None,
      Demand::Finite(n) => Demand::max(n.saturating_sub(count)),
      Demand::Unlimited => Demand::Unlimited,
    }
  }

  /// Accounts for one delivered value.
  #[inline]
  pub const fn saturating_sub_one(self) -> Demand { self.saturating_sub(1) }

  #[inline]
  const fn normalized(self) -> Demand {
    match self {
      Demand::Finite(0) => Demand::None,
      other => other,
    }
  }

  // (unlimited?, count) orders none < finite(n) < unlimited.
  #[inline]
  const fn key(self) -> (bool, usize) {
    match self {
      Demand::None => (false, 0),
      Demand::Finite(n) => (false, n),
      Demand::Unlimited => (true, 0),
    }
  }
}

impl Default for Demand {
  fn default() -> Self { Demand::None }
}

impl From<usize> for Demand {
  fn from(count: usize) -> Self { Demand::max(count) }
}

impl PartialEq for Demand {
  fn eq(&self, other: &Self) -> bool { self.key() == other.key() }
}

impl Eq for Demand {}

impl PartialOrd for Demand {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Demand {
  fn cmp(&self, other: &Self) -> Ordering { self.key().cmp(&other.key()) }
}

impl Hash for Demand {
  fn hash<H: Hasher>(&self, state: &mut H) { self.key().hash(state) }
}

impl Add for Demand {
  type Output = Demand;
  #[inline]
  fn add(self, rhs: Demand) -> Demand { self.saturating_add(rhs) }
}

impl Add<usize> for Demand {
  type Output = Demand;
  #[inline]
  fn add(self, rhs: usize) -> Demand { self.saturating_add(Demand::max(rhs)) }
}

impl AddAssign for Demand {
  #[inline]
  fn add_assign(&mut self, rhs: Demand) { *self = self.saturating_add(rhs) }
}

impl AddAssign<usize> for Demand {
  #[inline]
  fn add_assign(&mut self, rhs: usize) { *self = *self + rhs }
}

impl Sub<usize> for Demand {
  type Output = Demand;
  #[inline]
  fn sub(self, rhs: usize) -> Demand { self.saturating_sub(rhs) }
}

impl SubAssign<usize> for Demand {
  #[inline]
  fn sub_assign(&mut self, rhs: usize) { *self = self.saturating_sub(rhs) }
}

impl Display for Demand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.normalized() {
      Demand::None => write!(f, "none"),
      Demand::Finite(n) => write!(f, "max({n})"),
      Demand::Unlimited => write!(f, "unlimited"),
    }
  }
}

impl Debug for Demand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Display::fmt(self, f) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_saturates_at_unlimited() {
    assert_eq!(Demand::max(1) + Demand::Unlimited, Demand::Unlimited);
    assert_eq!(Demand::Unlimited + Demand::None, Demand::Unlimited);
    assert_eq!(Demand::max(usize::MAX) + 1, Demand::Unlimited);
    assert_eq!(Demand::None + Demand::None, Demand::None);
    assert_eq!(Demand::max(2) + 3, Demand::max(5));
  }

  #[test]
  fn sub_floors_at_none() {
    assert_eq!(Demand::None.saturating_sub_one(), Demand::None);
    assert_eq!(Demand::max(1).saturating_sub_one(), Demand::None);
    assert_eq!(Demand::max(3) - 10, Demand::None);
    assert_eq!(Demand::Unlimited - 10, Demand::Unlimited);

    let mut demand = Demand::max(2);
    demand -= 1;
    assert_eq!(demand, Demand::max(1));
  }

  #[test]
  fn ordering() {
    assert!(Demand::None < Demand::max(1));
    assert!(Demand::max(1) < Demand::max(2));
    assert!(Demand::max(usize::MAX) < Demand::Unlimited);
    assert!(!(Demand::Finite(0) > Demand::None));
    assert_eq!(Demand::Finite(0), Demand::None);
  }

  #[test]
  fn positivity() {
    assert!(!Demand::None.is_positive());
    assert!(!Demand::Finite(0).is_positive());
    assert!(Demand::max(1).is_positive());
    assert!(Demand::Unlimited.is_positive());
    assert_eq!(Demand::Unlimited.max_count(), None);
    assert_eq!(Demand::max(4).max_count(), Some(4));
  }

  #[test]
  fn display() {
    assert_eq!(Demand::None.to_string(), "none");
    assert_eq!(Demand::Finite(0).to_string(), "none");
    assert_eq!(Demand::max(3).to_string(), "max(3)");
    assert_eq!(format!("{:?}", Demand::Unlimited), "unlimited");
  }
}
