use mlua::{Lua, LuaSerdeExt, SerializeOptions, Table, Value};

/// `json.encode(value)` / `json.decode(text)`, backed by serde_json.
///
/// JSON `null` decodes to `nil`.
pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;

    module.raw_set(
        "encode",
        lua.create_function(|lua, value: Value| {
            let json: serde_json::Value = lua.from_value(value)?;
            serde_json::to_string(&json).map_err(mlua::Error::external)
        })?,
    )?;

    module.raw_set(
        "decode",
        lua.create_function(|lua, text: String| {
            let json: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| mlua::Error::runtime(format!("json.decode: {e}")))?;
            let options = SerializeOptions::new()
                .serialize_none_to_null(false)
                .serialize_unit_to_null(false);
            lua.to_value_with(&json, options)
        })?,
    )?;

    Ok(module)
}
