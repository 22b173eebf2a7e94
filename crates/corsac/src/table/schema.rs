//! Column loaders and the row schema.
//!
//! A [`Schema`] is an ordered list of column loaders, resolved once when
//! the schema is declared. Each [`ColumnLoader`] is a capability that
//! converts one raw field to one typed [`Value`]; dispatch is dynamic, so
//! row arity is a runtime property and custom loaders can be injected
//! alongside the built-ins.

use crate::config::ParserConfig;
use crate::error::ConvertError;
use crate::table::value::Value;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Converts one raw field token to one typed value.
pub trait ColumnLoader: Send + Sync {
    /// Converts `raw` to a [`Value`].
    fn load(&self, raw: &[u8]) -> Result<Value, ConvertError>;
}

fn utf8<'a>(raw: &'a [u8], target: &'static str) -> Result<&'a str, ConvertError> {
    std::str::from_utf8(raw).map_err(|_| {
        ConvertError::new(
            String::from_utf8_lossy(raw).into_owned(),
            target,
            "not valid UTF-8",
        )
    })
}

/// Loader for signed 64-bit integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntLoader;

impl ColumnLoader for IntLoader {
    fn load(&self, raw: &[u8]) -> Result<Value, ConvertError> {
        let text = utf8(raw, "integer")?;
        text.parse::<i64>()
            .map(Value::Int)
            .map_err(|e| ConvertError::new(text, "integer", e.to_string()))
    }
}

/// Loader for unsigned 64-bit integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UIntLoader;

impl ColumnLoader for UIntLoader {
    fn load(&self, raw: &[u8]) -> Result<Value, ConvertError> {
        let text = utf8(raw, "unsigned integer")?;
        text.parse::<u64>()
            .map(Value::UInt)
            .map_err(|e| ConvertError::new(text, "unsigned integer", e.to_string()))
    }
}

/// Loader for 64-bit floats.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatLoader;

impl ColumnLoader for FloatLoader {
    fn load(&self, raw: &[u8]) -> Result<Value, ConvertError> {
        let text = utf8(raw, "float")?;
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|e| ConvertError::new(text, "float", e.to_string()))
    }
}

/// Loader for UTF-8 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringLoader;

impl ColumnLoader for StringLoader {
    fn load(&self, raw: &[u8]) -> Result<Value, ConvertError> {
        Ok(Value::Str(utf8(raw, "string")?.to_string()))
    }
}

/// Loader for calendar timestamps using a strftime-style pattern.
#[derive(Debug, Clone)]
pub struct DateTimeLoader {
    format: String,
}

impl DateTimeLoader {
    /// Creates a loader parsing timestamps with the given pattern.
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

impl ColumnLoader for DateTimeLoader {
    fn load(&self, raw: &[u8]) -> Result<Value, ConvertError> {
        let text = utf8(raw, "datetime")?;
        NaiveDateTime::parse_from_str(text, &self.format)
            .map(Value::DateTime)
            .map_err(|e| ConvertError::new(text, "datetime", e.to_string()))
    }
}

/// Wrapper that maps an empty field to [`Value::Null`] and delegates
/// non-empty fields to the inner loader.
pub struct OptionalLoader {
    inner: Arc<dyn ColumnLoader>,
}

impl OptionalLoader {
    /// Wraps `inner` so that an empty field becomes the absent value.
    pub fn new(inner: Arc<dyn ColumnLoader>) -> Self {
        Self { inner }
    }
}

impl ColumnLoader for OptionalLoader {
    fn load(&self, raw: &[u8]) -> Result<Value, ConvertError> {
        if raw.is_empty() {
            Ok(Value::Null)
        } else {
            self.inner.load(raw)
        }
    }
}

/// Declared type of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Signed 64-bit integer.
    Int,
    /// Unsigned 64-bit integer.
    UInt,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    Str,
    /// Calendar timestamp parsed with the configured format.
    DateTime,
    /// Optional wrapper: empty field means absent, otherwise the inner
    /// type applies.
    Optional(Box<ColumnType>),
}

impl ColumnType {
    fn loader(&self, config: &ParserConfig) -> Arc<dyn ColumnLoader> {
        match self {
            Self::Int => Arc::new(IntLoader),
            Self::UInt => Arc::new(UIntLoader),
            Self::Float => Arc::new(FloatLoader),
            Self::Str => Arc::new(StringLoader),
            Self::DateTime => Arc::new(DateTimeLoader::new(&config.datetime_format)),
            Self::Optional(inner) => Arc::new(OptionalLoader::new(inner.loader(config))),
        }
    }
}

/// Ordered list of column loaders for one row shape.
///
/// Loaders are resolved once at declaration; the schema is cheap to clone
/// and can be shared across parallel workers.
#[derive(Clone)]
pub struct Schema {
    columns: Vec<Arc<dyn ColumnLoader>>,
}

impl Schema {
    /// Builds a schema from declared column types, resolving each loader
    /// against the configuration (the timestamp format in particular).
    pub fn new(types: &[ColumnType], config: &ParserConfig) -> Self {
        Self {
            columns: types.iter().map(|t| t.loader(config)).collect(),
        }
    }

    /// Builds a schema from explicit loader capabilities.
    pub fn from_loaders(columns: Vec<Arc<dyn ColumnLoader>>) -> Self {
        Self { columns }
    }

    /// Number of declared columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when no columns are declared.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The ordered loader list.
    pub(crate) fn loaders(&self) -> &[Arc<dyn ColumnLoader>] {
        &self.columns
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("columns", &self.columns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(loader: &dyn ColumnLoader, raw: &[u8]) -> Result<Value, ConvertError> {
        loader.load(raw)
    }

    #[test]
    fn test_int_loader() {
        assert_eq!(load(&IntLoader, b"-42").unwrap(), Value::Int(-42));
        assert!(load(&IntLoader, b"abc").is_err());
        assert!(load(&IntLoader, b"").is_err());
    }

    #[test]
    fn test_uint_loader_rejects_negative() {
        assert_eq!(load(&UIntLoader, b"42").unwrap(), Value::UInt(42));
        assert!(load(&UIntLoader, b"-1").is_err());
    }

    #[test]
    fn test_float_loader() {
        assert_eq!(load(&FloatLoader, b"2.5").unwrap(), Value::Float(2.5));
        assert!(load(&FloatLoader, b"2.5.1").is_err());
    }

    #[test]
    fn test_string_loader_requires_utf8() {
        assert_eq!(
            load(&StringLoader, b"hello").unwrap(),
            Value::from("hello")
        );
        assert!(load(&StringLoader, &[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_datetime_loader_uses_format() {
        let loader = DateTimeLoader::new("%Y-%m-%d %H:%M:%S");
        let value = load(&loader, b"2024-02-29 12:34:56").unwrap();
        let dt = value.as_datetime().unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-02-29 12:34:56");
        assert!(load(&loader, b"29.02.2024").is_err());
    }

    #[test]
    fn test_optional_loader() {
        let loader = OptionalLoader::new(Arc::new(IntLoader));
        assert_eq!(load(&loader, b"").unwrap(), Value::Null);
        assert_eq!(load(&loader, b"7").unwrap(), Value::Int(7));
        assert!(load(&loader, b"x").is_err());
    }

    #[test]
    fn test_schema_resolves_nested_optional() {
        let config = ParserConfig::default();
        let schema = Schema::new(
            &[
                ColumnType::Int,
                ColumnType::Optional(Box::new(ColumnType::Float)),
            ],
            &config,
        );
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.loaders()[1].load(b"").unwrap(), Value::Null);
        assert_eq!(schema.loaders()[1].load(b"1.5").unwrap(), Value::Float(1.5));
    }
}
