use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps customer contact details so they never show up in `{:?}` or `{}`
/// output (tracing fields included). Serialization still emits the real value,
/// API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> Masked<T> {
    /// Last `visible` characters with everything before replaced by `*`.
    /// Handy for support logs: "*******789".
    pub fn hint(&self, visible: usize) -> String {
        let raw = self.0.as_ref();
        let total = raw.chars().count();
        let keep = visible.min(total);
        let mut out = "*".repeat(total - keep);
        out.extend(raw.chars().skip(total - keep));
        out
    }
}

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_hide_value() {
        let phone = Masked(String::from("0901234789"));
        assert_eq!(format!("{:?}", phone), "********");
        assert_eq!(format!("{}", phone), "********");
    }

    #[test]
    fn test_serialize_exposes_value() {
        let phone = Masked(String::from("0901234789"));
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"0901234789\"");

        let back: Masked<String> = serde_json::from_str("\"0901234789\"").unwrap();
        assert_eq!(back, phone);
    }

    #[test]
    fn test_hint_keeps_tail() {
        let phone = Masked(String::from("0901234789"));
        assert_eq!(phone.hint(3), "*******789");
        assert_eq!(Masked(String::from("ab")).hint(5), "ab");
    }
}
