//! Composite keys for hook state.
//!
//! Every piece of retained state is addressed by a [`HookKey`] (the identity
//! of the call site) and a [`Discriminator`] (a runtime value that lets one
//! call site hold several independent instances, e.g. one per entity).
//!
//! Call-site identity is always explicit. Use a string or integer that stays
//! stable across invocations, or the [`call_site!`](crate::call_site) macro
//! which expands to the source location of the call.

use core::fmt;
use std::borrow::Cow;

/// Stable identity of a hook call site.
///
/// Keys compare by value, so the same key used from two places shares state.
///
/// # Example
///
/// ```
/// use cadence_hooks::HookKey;
///
/// let named = HookKey::from("spawn_timer");
/// let numbered = HookKey::from(7_u64);
///
/// assert_ne!(named, numbered);
/// assert_eq!(named.to_string(), "spawn_timer");
/// assert_eq!(numbered.to_string(), "#7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookKey {
    /// A textual identifier such as a source location or a hand-picked name.
    Named(Cow<'static, str>),
    /// A numeric identifier.
    Id(u64),
}

impl HookKey {
    /// Creates a named key.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// Creates a key from a source location.
    ///
    /// Used by [`call_site!`](crate::call_site); the three components are
    /// joined as `file:line:column`.
    #[must_use]
    pub fn from_location(file: &'static str, line: u32, column: u32) -> Self {
        Self::Named(Cow::Owned(format!("{file}:{line}:{column}")))
    }

    /// Returns `true` if this key carries no identity at all.
    ///
    /// An empty name is treated the same as a missing key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Named(name) if name.is_empty())
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Id(id) => write!(f, "#{id}"),
        }
    }
}

impl From<&'static str> for HookKey {
    fn from(name: &'static str) -> Self {
        Self::Named(Cow::Borrowed(name))
    }
}

impl From<String> for HookKey {
    fn from(name: String) -> Self {
        Self::Named(Cow::Owned(name))
    }
}

impl From<u64> for HookKey {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl From<u32> for HookKey {
    fn from(id: u32) -> Self {
        Self::Id(u64::from(id))
    }
}

/// Expands to a [`HookKey`] naming the current source location.
///
/// Two expansions on different lines (or columns) yield different keys, so
/// each textual hook call gets its own state.
///
/// ```
/// use cadence_hooks::call_site;
///
/// let a = call_site!();
/// let b = call_site!();
/// assert_ne!(a, b);
/// ```
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::HookKey::from_location(file!(), line!(), column!())
    };
}

/// Secondary key that splits one call site into independent instances.
///
/// When a hook is called without a discriminator, the call site's own key is
/// used ([`Discriminator::Implicit`]), giving exactly one instance per site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discriminator {
    /// The implicit singleton instance of a call site.
    Implicit(HookKey),
    /// An unsigned identifier, typically an entity id.
    Id(u64),
    /// A signed integer.
    Int(i64),
    /// A textual value.
    Text(Cow<'static, str>),
}

impl Discriminator {
    /// Resolves an optional discriminator against its hook key.
    ///
    /// An absent discriminator falls back to the key itself.
    #[must_use]
    pub fn effective(discriminator: Option<Self>, key: &HookKey) -> Self {
        discriminator.unwrap_or_else(|| Self::Implicit(key.clone()))
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implicit(key) => write!(f, "<{key}>"),
            Self::Id(id) => write!(f, "{id}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Discriminator {
                fn from(value: $ty) -> Self {
                    Self::Id(value as u64)
                }
            }
        )*
    };
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Discriminator {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_unsigned!(u8, u16, u32, u64, usize);
impl_from_signed!(i8, i16, i32, i64);

impl From<&'static str> for Discriminator {
    fn from(text: &'static str) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Discriminator {
    fn from(text: String) -> Self {
        Self::Text(Cow::Owned(text))
    }
}

/// The full address of a state cell: call site plus effective discriminator.
pub(crate) type CompositeKey = (HookKey, Discriminator);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_discriminator_falls_back_to_key() {
        let key = HookKey::from("site");
        let effective = Discriminator::effective(None, &key);
        assert_eq!(effective, Discriminator::Implicit(key));
    }

    #[test]
    fn explicit_discriminator_is_kept() {
        let key = HookKey::from("site");
        let effective = Discriminator::effective(Some(Discriminator::from(42_u32)), &key);
        assert_eq!(effective, Discriminator::Id(42));
    }

    #[test]
    fn implicit_differs_from_text_with_same_spelling() {
        let key = HookKey::from("site");
        assert_ne!(
            Discriminator::effective(None, &key),
            Discriminator::from("site")
        );
    }

    #[test]
    fn empty_name_is_empty_key() {
        assert!(HookKey::from("").is_empty());
        assert!(!HookKey::from("x").is_empty());
        assert!(!HookKey::from(0_u64).is_empty());
    }

    #[test]
    fn location_keys_are_distinct() {
        let a = HookKey::from_location("src/a.rs", 1, 1);
        let b = HookKey::from_location("src/a.rs", 1, 2);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "src/a.rs:1:1");
    }

    #[test]
    fn call_site_macro_names_this_file() {
        let key = crate::call_site!();
        assert!(key.to_string().contains("key.rs"));
    }
}
