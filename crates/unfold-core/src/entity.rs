/// Trait for entity references: typed `u32` handles minted by a builder.
pub trait EntityRef: Copy + Eq + Ord + std::hash::Hash + std::fmt::Debug {
    fn new(index: u32) -> Self;
    fn index(self) -> u32;
}

/// Define a typed entity reference (a newtype over `u32`).
///
/// ```ignore
/// define_entity!(VarId);
/// ```
#[macro_export]
macro_rules! define_entity {
    ($name:ident) => {
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(u32);

        impl $crate::entity::EntityRef for $name {
            fn new(index: u32) -> Self {
                Self(index)
            }
            fn index(self) -> u32 {
                self.0
            }
        }
    };
}

/// Hands out fresh entity references of one kind in increasing order.
///
/// Identity of IR variables and labels is the handle, never the display
/// name, so every handle that reaches the translator must come from a
/// single minter per kind.
#[derive(Debug, Clone)]
pub struct Minter<K: EntityRef> {
    next: u32,
    _phantom: std::marker::PhantomData<K>,
}

impl<K: EntityRef> Default for Minter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef> Minter<K> {
    pub fn new() -> Self {
        Self {
            next: 0,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn mint(&mut self) -> K {
        let key = K::new(self.next);
        self.next += 1;
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    define_entity!(TestId);

    #[test]
    fn minter_is_sequential() {
        let mut minter: Minter<TestId> = Minter::new();
        let a = minter.mint();
        let b = minter.mint();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert!(a < b);
        assert_eq!(minter.mint().index(), 2);
    }
}
