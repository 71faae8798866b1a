//! Query string formatting.

/// A value that can be written into a query string.
pub trait QueryValue {
    /// Formats the value as it appears on the wire, before percent-encoding.
    fn to_query_value(&self) -> String;
}

impl<T: QueryValue + ?Sized> QueryValue for &T {
    fn to_query_value(&self) -> String {
        (**self).to_query_value()
    }
}

impl QueryValue for str {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl QueryValue for String {
    fn to_query_value(&self) -> String {
        self.clone()
    }
}

impl QueryValue for bool {
    fn to_query_value(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }
}

macro_rules! integer_query_value {
    ($($ty:ty),*) => {
        $(
            impl QueryValue for $ty {
                fn to_query_value(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_query_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl QueryValue for f64 {
    fn to_query_value(&self) -> String {
        scientific(*self, format!("{:E}", self))
    }
}

impl QueryValue for f32 {
    fn to_query_value(&self) -> String {
        scientific(f64::from(*self), format!("{:E}", self))
    }
}

/// Rewrites Rust's `1.5E0` as `1.5E+00`: shortest mantissa, signed exponent
/// of at least two digits.
fn scientific(value: f64, formatted: String) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}E{sign}{:02}", exponent.abs())
        }
        None => formatted,
    }
}

/// How a list parameter is written into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFormat {
    /// One `name=value` pair per element.
    #[default]
    Multi,
    /// Comma separated.
    Csv,
    /// Space separated.
    Ssv,
    /// Tab separated.
    Tsv,
    /// Pipe separated.
    Pipes,
}

impl CollectionFormat {
    fn separator(self) -> Option<&'static str> {
        match self {
            CollectionFormat::Multi => None,
            CollectionFormat::Csv => Some(","),
            CollectionFormat::Ssv => Some(" "),
            CollectionFormat::Tsv => Some("\t"),
            CollectionFormat::Pipes => Some("|"),
        }
    }
}

/// Ordered query pairs for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<V: QueryValue + ?Sized>(&mut self, name: &str, value: &V) {
        self.pairs.push((name.to_string(), value.to_query_value()));
    }

    /// Appends a list parameter. Empty lists are omitted.
    pub fn push_list<V: QueryValue>(&mut self, name: &str, values: &[V], format: CollectionFormat) {
        if values.is_empty() {
            return;
        }
        match format.separator() {
            None => {
                for value in values {
                    self.push(name, value);
                }
            }
            Some(sep) => {
                let joined = values
                    .iter()
                    .map(QueryValue::to_query_value)
                    .collect::<Vec<_>>()
                    .join(sep);
                self.pairs.push((name.to_string(), joined));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
