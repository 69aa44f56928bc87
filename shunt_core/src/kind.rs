use serde::de::{Error as DeError, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt::{Display, Formatter};
use std::ops::{BitOr, BitOrAssign};

/// A bitmask over the fixed set of message kinds recognized by the dispatch
/// runtime.
///
/// The three concrete kinds are [`ACTION`](MessageKind::ACTION) (a command
/// directed at exactly one handler), [`EVENT`](MessageKind::EVENT) (a fact
/// announced to whoever listens), and [`DOCUMENT`](MessageKind::DOCUMENT)
/// (a query or a data-carrying message). [`ALL`](MessageKind::ALL) is the
/// union of the three; [`NONE`](MessageKind::NONE) is the empty mask.
///
/// Masks combine with [`union`](MessageKind::union) (or the `|` operator) and
/// are probed with [`intersects`](MessageKind::intersects) and
/// [`contains`](MessageKind::contains).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKind(u8);

impl MessageKind {
    /// The empty kind mask.
    pub const NONE: Self = Self(0);
    /// A command directed at exactly one handler.
    pub const ACTION: Self = Self(1);
    /// A fact announced to whoever listens.
    pub const EVENT: Self = Self(1 << 1);
    /// A query or a data-carrying message.
    pub const DOCUMENT: Self = Self(1 << 2);
    /// The union of all three concrete kinds.
    pub const ALL: Self = Self(0b0000_0111);

    /// Returns the union of this mask and the given one.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns the intersection of this mask and the given one.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Reports whether this mask and the given one share at least one kind.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Reports whether this mask covers every kind of the given one.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Reports whether this mask is empty.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Exposes the raw bits of this mask.
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for MessageKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for MessageKind {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::NONE
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::NONE => return f.write_str("none"),
            Self::ALL => return f.write_str("all"),
            _ => {}
        }

        let mut first = true;
        for (mask, name) in [
            (Self::ACTION, "action"),
            (Self::EVENT, "event"),
            (Self::DOCUMENT, "document"),
        ] {
            if self.intersects(mask) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }

        Ok(())
    }
}

impl MessageKind {
    /// Parses a single kind name, case-insensitively. Recognizes `action`,
    /// `event`, `document`, `none`, and `all`.
    pub fn parse_name(name: &str) -> Option<Self> {
        let name = name.trim();

        if name.eq_ignore_ascii_case("action") {
            Some(Self::ACTION)
        } else if name.eq_ignore_ascii_case("event") {
            Some(Self::EVENT)
        } else if name.eq_ignore_ascii_case("document") {
            Some(Self::DOCUMENT)
        } else if name.eq_ignore_ascii_case("none") {
            Some(Self::NONE)
        } else if name.eq_ignore_ascii_case("all") {
            Some(Self::ALL)
        } else {
            None
        }
    }
}

const _: () = {
    impl<'de> Deserialize<'de> for MessageKind {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(MessageKindVisitor)
        }
    }

    struct MessageKindVisitor;

    impl<'de> Visitor<'de> for MessageKindVisitor {
        type Value = MessageKind;

        fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
            formatter.write_str("a message kind name or a list of message kind names")
        }

        fn visit_str<E>(self, input: &str) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            // Allow pipe-separated unions in a single string
            let mut kind = MessageKind::NONE;

            for chunk in input.split('|') {
                kind |= MessageKind::parse_name(chunk)
                    .ok_or_else(|| E::custom(format!("unrecognized message kind '{}'", chunk)))?;
            }

            Ok(kind)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut kind = MessageKind::NONE;

            while let Some(chunk) = seq.next_element::<String>()? {
                kind |= MessageKind::parse_name(&chunk).ok_or_else(|| {
                    A::Error::custom(format!("unrecognized message kind '{}'", chunk))
                })?;
            }

            Ok(kind)
        }
    }
};

/// Reports the [`MessageKind`] implied by the given type name, based on the
/// conventional suffix of its unqualified tail: `Command` maps to
/// [`ACTION`](MessageKind::ACTION), `Event` and `Notification` map to
/// [`EVENT`](MessageKind::EVENT), `Query` and `Document` map to
/// [`DOCUMENT`](MessageKind::DOCUMENT). Anything else defaults to
/// [`ACTION`](MessageKind::ACTION).
///
/// Suffixes compare case-insensitively. This is the documented escape hatch
/// for messages that arrive from a transport without declaring their kind.
pub fn kind_of_type_name(type_name: &str) -> MessageKind {
    let short = short_type_name(type_name);

    if ends_with_ignore_case(short, "Command") {
        MessageKind::ACTION
    } else if ends_with_ignore_case(short, "Event") || ends_with_ignore_case(short, "Notification")
    {
        MessageKind::EVENT
    } else if ends_with_ignore_case(short, "Query") || ends_with_ignore_case(short, "Document") {
        MessageKind::DOCUMENT
    } else {
        MessageKind::ACTION
    }
}

/// Extracts the unqualified tail of the given type path, with any generic
/// arguments stripped: `"crate::orders::PlaceOrderCommand"` becomes
/// `"PlaceOrderCommand"`.
pub fn short_type_name(type_name: &str) -> &str {
    // Strip generic arguments first, then take the last path segment
    let without_generics = match type_name.find('<') {
        Some(position) => &type_name[..position],
        None => type_name,
    };

    match without_generics.rfind("::") {
        Some(position) => &without_generics[position + 2..],
        None => without_generics,
    }
}

/// Compares the tail of `input` against `suffix`, ignoring ASCII case.
fn ends_with_ignore_case(input: &str, suffix: &str) -> bool {
    input.len() >= suffix.len() && input[input.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn union_and_intersection() {
        // Given
        let mask = MessageKind::ACTION | MessageKind::EVENT;

        // Then
        assert!(mask.intersects(MessageKind::ACTION));
        assert!(mask.intersects(MessageKind::EVENT));
        assert!(!mask.intersects(MessageKind::DOCUMENT));
        assert!(MessageKind::ALL.contains(mask));
        assert!(!mask.contains(MessageKind::ALL));
        assert_eq!(mask.intersection(MessageKind::EVENT), MessageKind::EVENT);
    }

    #[test]
    fn all_is_union_of_concrete_kinds() {
        assert_eq!(
            MessageKind::ACTION | MessageKind::EVENT | MessageKind::DOCUMENT,
            MessageKind::ALL,
        );
    }

    #[test]
    fn display() {
        assert_eq!(MessageKind::NONE.to_string(), "none");
        assert_eq!(MessageKind::ALL.to_string(), "all");
        assert_eq!(MessageKind::ACTION.to_string(), "action");
        assert_eq!(
            (MessageKind::EVENT | MessageKind::DOCUMENT).to_string(),
            "event|document",
        );
    }

    #[test]
    fn deserializes_from_string_and_list() {
        // Given
        let single = "\"Event\"";
        let piped = "\"action|document\"";
        let listed = "[\"event\", \"ACTION\"]";

        // When / Then
        assert_eq!(
            serde_json::from_str::<MessageKind>(single).unwrap(),
            MessageKind::EVENT,
        );
        assert_eq!(
            serde_json::from_str::<MessageKind>(piped).unwrap(),
            MessageKind::ACTION | MessageKind::DOCUMENT,
        );
        assert_eq!(
            serde_json::from_str::<MessageKind>(listed).unwrap(),
            MessageKind::EVENT | MessageKind::ACTION,
        );
    }

    #[test]
    fn suffix_detection() {
        assert_eq!(
            kind_of_type_name("orders::PlaceOrderCommand"),
            MessageKind::ACTION,
        );
        assert_eq!(
            kind_of_type_name("orders::OrderPlacedEvent"),
            MessageKind::EVENT,
        );
        assert_eq!(
            kind_of_type_name("orders::OrderShippedNotification"),
            MessageKind::EVENT,
        );
        assert_eq!(
            kind_of_type_name("orders::FindOrderQuery"),
            MessageKind::DOCUMENT,
        );
        assert_eq!(
            kind_of_type_name("orders::ManifestDocument"),
            MessageKind::DOCUMENT,
        );
        assert_eq!(kind_of_type_name("orders::Reconcile"), MessageKind::ACTION);
    }

    #[test]
    fn short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name("a::b::Widget"), "Widget");
        assert_eq!(short_type_name("a::b::Wrapper<a::b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Bare"), "Bare");
    }
}
