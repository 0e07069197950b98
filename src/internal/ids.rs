macro_rules! impl_id {
    ($name:ident, $tp:ty) => {
        /// The ID type $name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name($tp);

        impl $name {
            /// Create a new id.
            #[inline]
            pub const fn new(index: $tp) -> Self {
                $name(index)
            }

            /// Get the id as usize.
            #[inline]
            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            /// Get the raw id.
            #[allow(dead_code)]
            #[inline]
            pub fn id(&self) -> $tp {
                self.0
            }
        }

        impl<T> std::ops::Index<$name> for [T] {
            type Output = T;

            #[inline]
            fn index(&self, index: $name) -> &Self::Output {
                &self[index.0 as usize]
            }
        }

        impl<T> std::ops::IndexMut<$name> for [T] {
            #[inline]
            fn index_mut(&mut self, index: $name) -> &mut T {
                &mut self[index.0 as usize]
            }
        }

        impl<T> std::ops::Index<$name> for Vec<T> {
            type Output = T;

            #[inline]
            fn index(&self, index: $name) -> &Self::Output {
                &self[index.0 as usize]
            }
        }

        impl<T> std::ops::IndexMut<$name> for Vec<T> {
            #[inline]
            fn index_mut(&mut self, index: $name) -> &mut T {
                &mut self[index.0 as usize]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$tp> for $name {
            fn from(index: $tp) -> Self {
                $name::new(index)
            }
        }
    };
}

/// The ID type for the states of the epsilon-free NFA.
pub type StateIDBase = u32;
impl_id!(StateID, StateIDBase);

/// The ID type for NFA transitions. Transitions of both directions share one arena.
pub type TransitionIDBase = u32;
impl_id!(TransitionID, TransitionIDBase);

/// The ID type for the nodes of the epsilon NFA that is built from the parsed pattern.
pub type NodeIDBase = u32;
impl_id!(NodeID, NodeIDBase);

/// The ID type for lazily created DFA states. It is the index of the state in the arena of the
/// DFA cache and stays stable for the lifetime of the compiled automaton.
pub type DfaStateIDBase = u32;
impl_id!(DfaStateID, DfaStateIDBase);

/// The ID type for patterns. Actually the index of the pattern in the pattern list of the NFA.
/// It determines the priority of the pattern, i.e. lower indices have higher priority.
pub type PatternIDBase = u32;
impl_id!(PatternID, PatternIDBase);
