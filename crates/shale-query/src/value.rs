use bson::Bson;

/// BSON type codes accepted by `$type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Double,
    String,
    Object,
    Array,
    BinData,
    ObjectId,
    Bool,
    Date,
    Null,
    Regex,
    Int,
    Timestamp,
    Long,
    Decimal,
    MinKey,
    MaxKey,
    /// Non-standard alias matching double, int and long together.
    Number,
}

impl TypeCode {
    pub fn from_code(code: i32) -> Option<TypeCode> {
        Some(match code {
            1 => TypeCode::Double,
            2 => TypeCode::String,
            3 => TypeCode::Object,
            4 => TypeCode::Array,
            5 => TypeCode::BinData,
            7 => TypeCode::ObjectId,
            8 => TypeCode::Bool,
            9 => TypeCode::Date,
            10 => TypeCode::Null,
            11 => TypeCode::Regex,
            16 => TypeCode::Int,
            17 => TypeCode::Timestamp,
            18 => TypeCode::Long,
            19 => TypeCode::Decimal,
            -1 => TypeCode::MinKey,
            127 => TypeCode::MaxKey,
            -128 => TypeCode::Number,
            _ => return None,
        })
    }

    pub fn from_alias(alias: &str) -> Option<TypeCode> {
        Some(match alias {
            "double" => TypeCode::Double,
            "string" => TypeCode::String,
            "object" => TypeCode::Object,
            "array" => TypeCode::Array,
            "binData" => TypeCode::BinData,
            "objectId" => TypeCode::ObjectId,
            "bool" => TypeCode::Bool,
            "date" => TypeCode::Date,
            "null" => TypeCode::Null,
            "regex" => TypeCode::Regex,
            "int" => TypeCode::Int,
            "timestamp" => TypeCode::Timestamp,
            "long" => TypeCode::Long,
            "decimal" => TypeCode::Decimal,
            "minKey" => TypeCode::MinKey,
            "maxKey" => TypeCode::MaxKey,
            "number" => TypeCode::Number,
            _ => return None,
        })
    }

    pub fn alias(self) -> &'static str {
        match self {
            TypeCode::Double => "double",
            TypeCode::String => "string",
            TypeCode::Object => "object",
            TypeCode::Array => "array",
            TypeCode::BinData => "binData",
            TypeCode::ObjectId => "objectId",
            TypeCode::Bool => "bool",
            TypeCode::Date => "date",
            TypeCode::Null => "null",
            TypeCode::Regex => "regex",
            TypeCode::Int => "int",
            TypeCode::Timestamp => "timestamp",
            TypeCode::Long => "long",
            TypeCode::Decimal => "decimal",
            TypeCode::MinKey => "minKey",
            TypeCode::MaxKey => "maxKey",
            TypeCode::Number => "number",
        }
    }

    /// Whether a (non-array-expanded) value has this type.
    pub fn matches(self, value: &Bson) -> bool {
        match self {
            TypeCode::Double => matches!(value, Bson::Double(_)),
            TypeCode::String => matches!(value, Bson::String(_)),
            TypeCode::Object => matches!(value, Bson::Document(_)),
            TypeCode::Array => matches!(value, Bson::Array(_)),
            TypeCode::BinData => matches!(value, Bson::Binary(_)),
            TypeCode::ObjectId => matches!(value, Bson::ObjectId(_)),
            TypeCode::Bool => matches!(value, Bson::Boolean(_)),
            TypeCode::Date => matches!(value, Bson::DateTime(_)),
            TypeCode::Null => matches!(value, Bson::Null),
            TypeCode::Regex => matches!(value, Bson::RegularExpression(_)),
            TypeCode::Int => matches!(value, Bson::Int32(_)),
            TypeCode::Timestamp => matches!(value, Bson::Timestamp(_)),
            TypeCode::Long => matches!(value, Bson::Int64(_)),
            TypeCode::Decimal => matches!(value, Bson::Decimal128(_)),
            TypeCode::MinKey => matches!(value, Bson::MinKey),
            TypeCode::MaxKey => matches!(value, Bson::MaxKey),
            TypeCode::Number => is_number(value),
        }
    }
}

/// The `$type` alias naming a value's runtime type.
pub fn type_alias(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::Binary(_) => "binData",
        Bson::Undefined => "undefined",
        Bson::ObjectId(_) => "objectId",
        Bson::Boolean(_) => "bool",
        Bson::DateTime(_) => "date",
        Bson::Null => "null",
        Bson::RegularExpression(_) => "regex",
        Bson::DbPointer(_) => "dbPointer",
        Bson::JavaScriptCode(_) => "javascript",
        Bson::Symbol(_) => "symbol",
        Bson::JavaScriptCodeWithScope(_) => "javascriptWithScope",
        Bson::Int32(_) => "int",
        Bson::Timestamp(_) => "timestamp",
        Bson::Int64(_) => "long",
        Bson::Decimal128(_) => "decimal",
        Bson::MinKey => "minKey",
        Bson::MaxKey => "maxKey",
    }
}

pub fn is_number(value: &Bson) -> bool {
    matches!(value, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_))
}

/// Why a value could not be read as a whole 64-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WholeNumberError {
    UnexpectedType,
    NotWholeNumber,
    Infinity,
    LongExceededPositive,
    LongExceededNegative,
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// Read an operator parameter that must be a whole number.
pub fn whole_number(value: &Bson) -> Result<i64, WholeNumberError> {
    match value {
        Bson::Int32(n) => Ok(i64::from(*n)),
        Bson::Int64(n) => Ok(*n),
        Bson::Double(f) => {
            if *f == f64::INFINITY {
                return Err(WholeNumberError::Infinity);
            }
            if *f >= TWO_POW_63 {
                return Err(WholeNumberError::LongExceededPositive);
            }
            if *f < -TWO_POW_63 {
                return Err(WholeNumberError::LongExceededNegative);
            }
            if f.is_nan() || f.trunc() != *f {
                return Err(WholeNumberError::NotWholeNumber);
            }
            Ok(*f as i64)
        }
        _ => Err(WholeNumberError::UnexpectedType),
    }
}

/// Numeric value widened to `f64`; `None` for non-numbers.
pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(f) => Some(*f),
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        _ => None,
    }
}

/// Render a value the way the shell prints it inside error messages.
pub fn format_value(value: &Bson) -> String {
    match value {
        Bson::Double(f) => format_double(*f),
        Bson::String(s) => format!("{s:?}"),
        Bson::Document(doc) => {
            if doc.is_empty() {
                return "{}".to_string();
            }
            let fields: Vec<String> = doc
                .iter()
                .map(|(k, v)| format!("{k}: {}", format_value(v)))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
        Bson::Array(arr) => {
            if arr.is_empty() {
                return "[]".to_string();
            }
            let items: Vec<String> = arr.iter().map(format_value).collect();
            format!("[ {} ]", items.join(", "))
        }
        Bson::Binary(bin) => {
            let bytes: String = bin.bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("BinData({}, {bytes})", u8::from(bin.subtype))
        }
        Bson::ObjectId(oid) => format!("ObjectId('{}')", oid.to_hex()),
        Bson::Boolean(b) => b.to_string(),
        Bson::DateTime(dt) => format!("new Date({})", dt.timestamp_millis()),
        Bson::Null => "null".to_string(),
        Bson::RegularExpression(re) => format!("/{}/{}", re.pattern, re.options),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Timestamp(ts) => format!("Timestamp({}, {})", ts.time, ts.increment),
        Bson::MinKey => "MinKey".to_string(),
        Bson::MaxKey => "MaxKey".to_string(),
        Bson::Undefined => "undefined".to_string(),
        other => other.to_string(),
    }
}

fn format_double(f: f64) -> String {
    if f.is_nan() {
        "nan.0".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{sign}inf.0")
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}
