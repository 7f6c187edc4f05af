/// Capacity limits for a [`Context`](crate::Context).
///
/// Every limit feeds the [memory layout](crate::Layout): the backing buffer
/// grows linearly with each field (and with the product of `max_depth` and
/// `max_record_fields` for the schema pool). Exceeding any of them while
/// reading or writing latches [`Error::Malformed`](crate::Error::Malformed).
///
/// # Examples
///
/// ```rust
/// use tagwire::{Config, size_for};
///
/// let config = Config {
///     max_depth: 4,
///     ..Config::default()
/// };
/// assert!(size_for(&config) < size_for(&Config::default()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(test, feature = "serde"), serde(default))]
pub struct Config {
    /// Maximum length in bytes of a single symbol (record field name).
    ///
    /// # Default
    ///
    /// `64`
    pub max_symbol_len: u32,

    /// Maximum number of distinct symbols in one document.
    ///
    /// # Default
    ///
    /// `256`
    pub max_num_symbols: u32,

    /// Maximum number of fields in one record, and of columns in one table.
    ///
    /// # Default
    ///
    /// `64`
    pub max_record_fields: u32,

    /// Maximum number of simultaneously open blob, array, table, and record
    /// scopes. The implicit root scope does not count.
    ///
    /// # Default
    ///
    /// `16`
    pub max_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_symbol_len: 64,
            max_num_symbols: 256,
            max_record_fields: 64,
            max_depth: 16,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_limits_take_their_defaults() {
        let config: Config = serde_json::from_str(r#"{ "max_depth": 4 }"#).unwrap();
        assert_eq!(
            config,
            Config {
                max_depth: 4,
                ..Config::default()
            }
        );
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert_eq!(
            json,
            r#"{"max_symbol_len":64,"max_num_symbols":256,"max_record_fields":64,"max_depth":16}"#
        );
    }
}
