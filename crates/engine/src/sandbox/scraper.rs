use mlua::{Lua, Table};
use scraper::{ElementRef, Html, Selector};

/// HTML helpers: `scraper.select(html, css)` and `scraper.select_one(html, css)`.
///
/// Elements come back as plain tables `{ text, html, inner_html, attrs }`, so
/// no parsed document outlives the call.
pub fn module(lua: &Lua) -> mlua::Result<Table> {
    let module = lua.create_table()?;

    module.raw_set(
        "select",
        lua.create_function(|lua, (html, css): (String, String)| {
            let selector = parse_selector(&css)?;
            let document = Html::parse_document(&html);
            document
                .select(&selector)
                .map(|element| element_table(lua, element))
                .collect::<mlua::Result<Vec<_>>>()
        })?,
    )?;

    module.raw_set(
        "select_one",
        lua.create_function(|lua, (html, css): (String, String)| {
            let selector = parse_selector(&css)?;
            let document = Html::parse_document(&html);
            document
                .select(&selector)
                .next()
                .map(|element| element_table(lua, element))
                .transpose()
        })?,
    )?;

    Ok(module)
}

fn parse_selector(css: &str) -> mlua::Result<Selector> {
    Selector::parse(css).map_err(|e| mlua::Error::runtime(format!("invalid selector `{css}`: {e}")))
}

fn element_table(lua: &Lua, element: ElementRef<'_>) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.raw_set("text", element.text().collect::<String>().trim())?;
    table.raw_set("html", element.html())?;
    table.raw_set("inner_html", element.inner_html())?;

    let attrs = lua.create_table()?;
    for (name, value) in element.value().attrs() {
        attrs.raw_set(name, value)?;
    }
    table.raw_set("attrs", attrs)?;

    Ok(table)
}
