use indexmap::IndexMap;

/// The "trailer extra" key/value log recorded alongside a scan.
///
/// Values are stored as the instrument wrote them and typed on request. Labels
/// usually carry a trailing colon, e.g. `"Charge State:"`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Trailer {
    values: IndexMap<String, String>,
}

impl Trailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, label: K, value: V) -> Option<String> {
        self.values.insert(label.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.values().map(|v| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn has(&self, label: &str) -> bool {
        self.values.contains_key(label)
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.values.get(label).map(|v| v.as_str())
    }

    /// `on`, `true` and `yes` read as true, any other present value as false
    pub fn as_bool(&self, label: &str) -> Option<bool> {
        self.get(label).map(|v| {
            let v = v.trim().to_lowercase();
            matches!(v.as_str(), "on" | "true" | "yes")
        })
    }

    pub fn as_f64(&self, label: &str) -> Option<f64> {
        self.get(label).and_then(|v| v.trim().parse().ok())
    }

    pub fn as_i64(&self, label: &str) -> Option<i64> {
        self.get(label).and_then(|v| v.trim().parse().ok())
    }

    /// Read an integer value, rejecting negative numbers
    pub fn as_positive_int(&self, label: &str) -> Option<u32> {
        self.as_i64(label)
            .filter(|v| *v >= 0)
            .and_then(|v| u32::try_from(v).ok())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Trailer {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
