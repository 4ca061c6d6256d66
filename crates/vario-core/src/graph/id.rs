//! Identifiers and typed socket handles.
//!
//! Modules and sockets live in slot arenas inside the
//! [`ModuleGraph`](super::ModuleGraph). Their ids are assigned sequentially
//! and never reused, so a stale id simply resolves to an empty slot.

use core::fmt;
use core::marker::PhantomData;

/// Unique identifier for a module in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0)
    }
}

/// Unique identifier for a socket in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub(crate) u32);

impl SocketId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Returns a sentinel id that never refers to a socket.
    #[inline]
    pub fn sentinel() -> Self {
        Self(u32::MAX)
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SocketId({})", self.0)
    }
}

/// Whether a socket is read by its module or written by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Pulls its value from a data source.
    Input,
    /// Written by its owning module.
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("in"),
            Direction::Output => f.write_str("out"),
        }
    }
}

/// A typed handle to a socket of value type `T`.
pub trait TypedSocket<T>: Copy {
    /// The untyped id behind the handle.
    fn socket_id(self) -> SocketId;
}

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<T> {
            id: SocketId,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) fn new(id: SocketId) -> Self {
                Self {
                    id,
                    _marker: PhantomData,
                }
            }

            /// The untyped socket id.
            #[inline]
            pub fn id(self) -> SocketId {
                self.id
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id.0)
            }
        }

        impl<T> TypedSocket<T> for $name<T> {
            #[inline]
            fn socket_id(self) -> SocketId {
                self.id
            }
        }

        impl<T> From<$name<T>> for SocketId {
            fn from(handle: $name<T>) -> SocketId {
                handle.id
            }
        }
    };
}

handle!(
    /// Handle to an input socket: pulls its value from a data source
    /// (another socket or a constant) each cycle it is fetched.
    ModuleIn
);

handle!(
    /// Handle to an output socket: written by its owning module, recomputed
    /// lazily when read during a cycle.
    ModuleOut
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ModuleId(3).to_string(), "ModuleId(3)");
        assert_eq!(SocketId(7).to_string(), "SocketId(7)");
        assert_eq!(Direction::Input.to_string(), "in");
    }

    #[test]
    fn test_handles_are_copy_and_convert() {
        let h: ModuleOut<f64> = ModuleOut::new(SocketId(4));
        let copy = h;
        assert_eq!(h, copy);
        assert_eq!(SocketId::from(h), SocketId(4));
        assert_eq!(format!("{h:?}"), "ModuleOut(4)");
    }
}
