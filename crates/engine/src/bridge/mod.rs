//! Conversion between host records and Lua values.
//!
//! Records cross into a script as [`Handle`] userdata that can be read and
//! written field by field. Coming back, handles are unwrapped into owned
//! records and anonymous tables are walked into plain mappings. Every decode
//! returns a typed result; nothing is cast on trust.

mod records;

use std::collections::HashMap;

use mlua::{AnyUserData, Function, IntoLua, Lua, MetaMethod, Table, UserData, UserDataMethods, Value};
use tanoshi_types::{Chapter, Credentials, FilterValue, Filters, Manga, Page};

use crate::error::ProtocolError;
use crate::session::SessionHeaders;

/// Version of the field layout exposed to scripts for every record type.
pub const SCHEMA_VERSION: i64 = 1;

/// A host record with a fixed, script-visible field layout.
pub trait RecordShape: Clone + Default + Send + 'static {
    const TYPE_NAME: &'static str;
    const FIELDS: &'static [&'static str];

    /// Read `field`; unknown names yield nil.
    fn get_field(&self, lua: &Lua, field: &str) -> mlua::Result<Value>;

    /// Write `field`; unknown names and mistyped values are script errors.
    fn set_field(&mut self, lua: &Lua, field: &str, value: Value) -> mlua::Result<()>;

    /// Short identifier used by `tostring`.
    fn label(&self) -> &str;
}

/// Opaque userdata wrapper that carries a record through a Lua state.
#[derive(Debug, Clone, Default)]
pub struct Handle<T>(pub T);

impl<T: RecordShape> UserData for Handle<T> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("to_table", |lua, this, ()| {
            let table = lua.create_table()?;
            for field in T::FIELDS {
                table.raw_set(*field, this.0.get_field(lua, field)?)?;
            }
            Ok(table)
        });
        methods.add_meta_method(MetaMethod::Index, |lua, this, field: String| {
            this.0.get_field(lua, &field)
        });
        methods.add_meta_method_mut(
            MetaMethod::NewIndex,
            |lua, this, (field, value): (String, Value)| this.0.set_field(lua, &field, value),
        );
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("{}({})", T::TYPE_NAME, this.0.label()))
        });
    }
}

pub(crate) fn unknown_field<T: RecordShape>(field: &str) -> mlua::Error {
    mlua::Error::runtime(format!(
        "{} has no field `{}` (fields: {})",
        T::TYPE_NAME,
        field,
        T::FIELDS.join(", ")
    ))
}

/// Install record constructors (`Manga{...}`, `Chapter{...}`, `Page{...}`) as globals.
pub fn register(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set(Manga::TYPE_NAME, constructor::<Manga>(lua)?)?;
    globals.set(Chapter::TYPE_NAME, constructor::<Chapter>(lua)?)?;
    globals.set(Page::TYPE_NAME, constructor::<Page>(lua)?)?;
    globals.set("TANOSHI_SCHEMA_VERSION", SCHEMA_VERSION)?;
    Ok(())
}

fn constructor<T: RecordShape>(lua: &Lua) -> mlua::Result<Function> {
    lua.create_function(|lua, init: Option<Table>| {
        let mut record = T::default();
        if let Some(init) = init {
            for pair in init.pairs::<String, Value>() {
                let (field, value) = pair?;
                record.set_field(lua, &field, value)?;
            }
        }
        lua.create_userdata(Handle(record))
    })
}

/// Wrap a record as a fresh userdata handle.
pub fn to_lua<T: RecordShape>(lua: &Lua, record: &T) -> mlua::Result<AnyUserData> {
    lua.create_userdata(Handle(record.clone()))
}

/// Unwrap a handle of type `T`, or `None` for anything else.
pub fn from_lua<T: RecordShape>(value: &Value) -> Option<T> {
    match value {
        Value::UserData(ud) => ud.borrow::<Handle<T>>().ok().map(|handle| handle.0.clone()),
        _ => None,
    }
}

/// Result of decoding a parse entry point's return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Record(T),
    Sequence { records: Vec<T>, skipped: usize },
}

impl<T> Decoded<T> {
    /// Singular results must be exactly one record.
    pub fn into_single(self, entry_point: &str) -> Result<T, ProtocolError> {
        match self {
            Decoded::Record(record) => Ok(record),
            Decoded::Sequence { .. } => Err(ProtocolError::UnexpectedValue {
                entry_point: entry_point.to_string(),
                expected: "a single record",
                found: "table",
            }),
        }
    }

    /// List results accept a bare record as a one-element list.
    pub fn into_list(self) -> Vec<T> {
        match self {
            Decoded::Record(record) => vec![record],
            Decoded::Sequence { records, .. } => records,
        }
    }
}

/// Decode a value that should be a `T` handle or a table of them.
///
/// Table elements that are not `T` handles are skipped and counted.
pub fn decode<T: RecordShape>(entry_point: &str, value: Value) -> Result<Decoded<T>, ProtocolError> {
    match value {
        Value::Table(table) => {
            let mut records = Vec::new();
            let mut skipped = 0;
            for element in ordered_values(&table) {
                match from_lua::<T>(&element) {
                    Some(record) => records.push(record),
                    None => {
                        tracing::debug!(
                            entry_point,
                            found = element.type_name(),
                            "skipping element that is not a {}",
                            T::TYPE_NAME
                        );
                        skipped += 1;
                    }
                }
            }
            Ok(Decoded::Sequence { records, skipped })
        }
        value => from_lua::<T>(&value)
            .map(Decoded::Record)
            .ok_or_else(|| ProtocolError::UnexpectedValue {
                entry_point: entry_point.to_string(),
                expected: T::TYPE_NAME,
                found: value.type_name(),
            }),
    }
}

/// Table values with integer keys first, in ascending order, then the rest.
fn ordered_values(table: &Table) -> Vec<Value> {
    let mut entries: Vec<(Value, Value)> = table
        .pairs::<Value, Value>()
        .filter_map(|pair| pair.ok())
        .collect();
    entries.sort_by_key(|(key, _)| match key {
        Value::Integer(index) => (0, *index),
        _ => (1, 0),
    });
    entries.into_iter().map(|(_, value)| value).collect()
}

/// Decode a `login` result: `{ header_name = { value, ... } }`.
///
/// Entries whose value is not a table are skipped.
pub fn decode_header_replacement(
    entry_point: &str,
    value: Value,
) -> Result<Vec<(String, Vec<String>)>, ProtocolError> {
    let Value::Table(table) = value else {
        return Err(ProtocolError::UnexpectedValue {
            entry_point: entry_point.to_string(),
            expected: "a header table",
            found: value.type_name(),
        });
    };

    let mut replacement: Vec<(String, Vec<String>)> = table
        .pairs::<Value, Value>()
        .filter_map(|pair| pair.ok())
        .filter_map(|(key, value)| {
            let name = scalar_to_string(&key)?;
            let Value::Table(values) = value else {
                return None;
            };
            let values = ordered_values(&values)
                .iter()
                .filter_map(scalar_to_string)
                .collect();
            Some((name, values))
        })
        .collect();
    replacement.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(replacement)
}

/// Strings, numbers and booleans as text; everything else is not a scalar.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(String::from(s.to_string_lossy())),
        Value::Integer(i) => Some(i.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn filters_to_lua(lua: &Lua, filters: &Filters) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    for (key, value) in filters {
        table.raw_set(key.as_str(), filter_value_to_lua(lua, value)?)?;
    }
    Ok(table)
}

fn filter_value_to_lua(lua: &Lua, value: &FilterValue) -> mlua::Result<Value> {
    match value {
        FilterValue::Bool(b) => Ok(Value::Boolean(*b)),
        FilterValue::Integer(i) => Ok(Value::Integer(*i)),
        FilterValue::Number(n) => Ok(Value::Number(*n)),
        FilterValue::Text(text) => text.as_str().into_lua(lua),
        FilterValue::List(items) => {
            let table = lua.create_table()?;
            for item in items {
                table.raw_push(filter_value_to_lua(lua, item)?)?;
            }
            Ok(Value::Table(table))
        }
    }
}

/// Response headers as `{ Name = { values } }`, looked up case-insensitively.
pub fn headers_to_lua(lua: &Lua, headers: &SessionHeaders) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    let mut lookup: HashMap<String, Vec<String>> = HashMap::new();
    for name in headers.names() {
        let values = headers.values(name);
        table.raw_set(name, values.clone())?;
        lookup.insert(name.to_string(), values);
    }

    let metatable = lua.create_table()?;
    metatable.raw_set(
        "__index",
        lua.create_function(move |_, (_, name): (Value, String)| {
            Ok(lookup.get(&name.to_ascii_lowercase()).cloned())
        })?,
    )?;
    table.set_metatable(Some(metatable));
    Ok(table)
}

pub fn credentials_to_lua(lua: &Lua, credentials: &Credentials) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.raw_set("username", credentials.username.as_str())?;
    table.raw_set("password", credentials.password.as_str())?;
    table.raw_set("two_factor", credentials.two_factor.as_str())?;
    table.raw_set(
        "remember_me",
        if credentials.remember_me { "1" } else { "0" },
    )?;
    Ok(table)
}
