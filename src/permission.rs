use std::ops::{BitAnd, BitOr};

/// Bitmask of what a connection is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Permission(u8);

impl Permission {
    pub const NONE: Permission = Permission(0);
    pub const READ: Permission = Permission(1);
    pub const ADD: Permission = Permission(2);
    pub const CONTROL: Permission = Permission(4);
    pub const ADMIN: Permission = Permission(8);
    pub const ALL: Permission = Permission(1 | 2 | 4 | 8);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit of `required` is set in `self`.
    pub fn contains(self, required: Permission) -> bool {
        self & required == required
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        Permission(self.0 | rhs.0)
    }
}

impl BitAnd for Permission {
    type Output = Permission;

    fn bitand(self, rhs: Permission) -> Permission {
        Permission(self.0 & rhs.0)
    }
}
