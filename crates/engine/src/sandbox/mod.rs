//! Construction of the isolated Lua state each connector runs in.
//!
//! Scripts get the pure standard libraries only. Anything touching the host
//! (files, processes, the network) is absent; the few host services a
//! connector may use are exposed as modules reachable through `require`.
//! Only source text can be compiled: `string.dump` is removed and `load`
//! refuses precompiled chunks.

mod json;
mod log;
mod scraper;

use mlua::{ChunkMode, Function, Lua, LuaOptions, StdLib, Table, Value, Variadic};

use crate::bridge;
use crate::config::EngineConfig;

const MODULES_KEY: &str = "tanoshi.modules";

/// Create a sandboxed state for the script identified by `script`.
pub fn new_state(script: &str, config: &EngineConfig) -> mlua::Result<Lua> {
    let libs = StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE;
    let lua = Lua::new_with(libs, LuaOptions::default())?;

    if let Some(limit) = config.memory_limit {
        lua.set_memory_limit(limit)?;
    }

    let globals = lua.globals();
    for name in ["dofile", "loadfile"] {
        globals.raw_set(name, Value::Nil)?;
    }
    globals.raw_get::<Table>("string")?.raw_set("dump", Value::Nil)?;
    globals.raw_set("load", lua.create_function(load_text)?)?;

    bridge::register(&lua)?;

    let modules = lua.create_table()?;
    modules.raw_set("json", json::module(&lua)?)?;
    modules.raw_set("scraper", scraper::module(&lua)?)?;
    modules.raw_set("log", log::module(&lua, script)?)?;
    lua.set_named_registry_value(MODULES_KEY, modules)?;

    globals.raw_set("require", lua.create_function(require)?)?;
    globals.raw_set("print", log::print_function(&lua, script)?)?;

    Ok(lua)
}

/// `load` restricted to source text. Failures are returned as `nil, message`.
fn load_text(
    lua: &Lua,
    (chunk, name, _mode, env): (mlua::String, Option<String>, Value, Option<Table>),
) -> mlua::Result<(Option<Function>, Option<String>)> {
    let mut loader = lua
        .load(chunk.as_bytes().to_vec())
        .set_mode(ChunkMode::Text);
    if let Some(name) = name {
        loader = loader.set_name(name);
    }
    if let Some(env) = env {
        loader = loader.set_environment(env);
    }

    match loader.into_function() {
        Ok(function) => Ok((Some(function), None)),
        Err(e) => Ok((None, Some(e.to_string()))),
    }
}

fn require(lua: &Lua, name: String) -> mlua::Result<Table> {
    let modules: Table = lua.named_registry_value(MODULES_KEY)?;
    match modules.raw_get::<Value>(name.as_str())? {
        Value::Table(module) => Ok(module),
        _ => Err(mlua::Error::runtime(format!(
            "module '{name}' is not available to connectors"
        ))),
    }
}

/// Render values the way Lua's `tostring` would for scalars.
fn display_values(values: &Variadic<Value>) -> String {
    values
        .iter()
        .map(|value| match value {
            Value::Nil => "nil".to_string(),
            value => bridge::scalar_to_string(value).unwrap_or_else(|| value.type_name().to_string()),
        })
        .collect::<Vec<_>>()
        .join("\t")
}
