//! Service key types for the dependency injection container.

use std::any::TypeId;

/// Identifies the abstraction a registration is resolved by.
///
/// Concrete types are keyed by `TypeId` (the name is carried for messages only);
/// trait objects are keyed by their `type_name`.
#[derive(Debug, Clone)]
pub enum Key {
    Type(TypeId, &'static str),
    Trait(&'static str),
}

impl Key {
    /// Full type name as reported by `std::any::type_name`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Trait(name) => name,
        }
    }

    /// Type name without module paths, e.g. `IPlugin` for `dyn my_app::IPlugin`.
    pub fn friendly_name(&self) -> String {
        friendly_name(self.display_name())
    }

    /// The `TypeId` of a concrete-type key.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Key::Type(id, _) => Some(*id),
            Key::Trait(_) => None,
        }
    }
}

// TypeId-only comparison for concrete types
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Trait(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

#[inline(always)]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

#[inline(always)]
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

/// Strips module paths from a `type_name`, keeping generic structure intact.
///
/// ```rust
/// use ferrous_lifestyle::key::friendly_name;
///
/// assert_eq!(friendly_name("alloc::vec::Vec<my_app::Plugin>"), "Vec<Plugin>");
/// assert_eq!(friendly_name("dyn my_app::plugins::IPlugin"), "IPlugin");
/// ```
pub fn friendly_name(type_name: &str) -> String {
    let name = type_name.strip_prefix("dyn ").unwrap_or(type_name);
    let mut out = String::with_capacity(name.len());
    let mut segment_start = 0;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = out.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_name_strips_paths() {
        assert_eq!(friendly_name("Plugin"), "Plugin");
        assert_eq!(friendly_name("my_app::Plugin"), "Plugin");
        assert_eq!(
            friendly_name("std::collections::HashMap<alloc::string::String, my::Value>"),
            "HashMap<String, Value>"
        );
        assert_eq!(friendly_name("dyn my::IPlugin"), "IPlugin");
        assert_eq!(friendly_name("&my::Thing"), "&Thing");
    }

    #[test]
    fn type_keys_compare_by_type_id_only() {
        let a = Key::Type(TypeId::of::<u32>(), "u32");
        let b = Key::Type(TypeId::of::<u32>(), "renamed");
        assert_eq!(a, b);
        assert_ne!(a, Key::Trait("u32"));
    }
}
