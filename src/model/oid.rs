//! Global object identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// 64-bit global object identifier
///
/// The high 32 bits carry the catalog id of the object's concrete class, the
/// low 32 bits a per-class counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Oid(i64);

impl Oid {
    pub fn new(raw: i64) -> Self {
        Oid(raw)
    }

    pub fn from_parts(class_id: i32, counter: u32) -> Self {
        Oid(((class_id as i64) << 32) | counter as i64)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Catalog id of the owning concrete class
    pub fn class_id(&self) -> i32 {
        (self.0 >> 32) as i32
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Oid {
    fn from(raw: i64) -> Self {
        Oid(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_id_in_high_bits() {
        let oid = Oid::from_parts(3, 17);
        assert_eq!(oid.as_i64(), (3i64 << 32) + 17);
        assert_eq!(oid.class_id(), 3);

        assert_eq!(Oid::new(1).class_id(), 0);
        assert_eq!(Oid::new(4294967297).class_id(), 1);
    }
}
