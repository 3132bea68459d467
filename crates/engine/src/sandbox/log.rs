use mlua::{Function, Lua, Table, Value, Variadic};
use tracing::event;

/// Forward script log calls to `tracing` under the `tanoshi_connector` target.
macro_rules! log_event {
    ($level:expr, $script:expr, $message:expr) => {
        event!(
            target: "tanoshi_connector",
            $level,
            script = %$script,
            message = %$message,
        )
    };
}

/// `log.trace|debug|info|warn|error(...)`.
pub fn module(lua: &Lua, script: &str) -> mlua::Result<Table> {
    let module = lua.create_table()?;

    for level in ["trace", "debug", "info", "warn", "error"] {
        let script = script.to_string();
        let function = lua.create_function(move |_, values: Variadic<Value>| {
            let message = super::display_values(&values);
            match level {
                "trace" => log_event!(tracing::Level::TRACE, script, message),
                "debug" => log_event!(tracing::Level::DEBUG, script, message),
                "info" => log_event!(tracing::Level::INFO, script, message),
                "warn" => log_event!(tracing::Level::WARN, script, message),
                _ => log_event!(tracing::Level::ERROR, script, message),
            }
            Ok(())
        })?;
        module.raw_set(level, function)?;
    }

    Ok(module)
}

/// Replacement for the global `print`, which would otherwise write to the host's stdout.
pub fn print_function(lua: &Lua, script: &str) -> mlua::Result<Function> {
    let script = script.to_string();
    lua.create_function(move |_, values: Variadic<Value>| {
        let message = super::display_values(&values);
        log_event!(tracing::Level::INFO, script, message);
        Ok(())
    })
}
