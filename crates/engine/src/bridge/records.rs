use chrono::{DateTime, NaiveDateTime};
use mlua::{IntoLua, Lua, Value};
use tanoshi_types::{Chapter, Manga, Page};

use super::{Handle, RecordShape, from_lua, unknown_field};

impl RecordShape for Manga {
    const TYPE_NAME: &'static str = "Manga";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "source",
        "title",
        "authors",
        "genres",
        "status",
        "description",
        "path",
        "cover_url",
        "last_updated",
    ];

    fn get_field(&self, lua: &Lua, field: &str) -> mlua::Result<Value> {
        match field {
            "id" => self.id.into_lua(lua),
            "source" => self.source.as_str().into_lua(lua),
            "title" => self.title.as_str().into_lua(lua),
            "authors" => self.authors.clone().into_lua(lua),
            "genres" => self.genres.clone().into_lua(lua),
            "status" => self.status.clone().into_lua(lua),
            "description" => self.description.clone().into_lua(lua),
            "path" => self.path.as_str().into_lua(lua),
            "cover_url" => self.cover_url.as_str().into_lua(lua),
            "last_updated" => timestamp(self.last_updated).into_lua(lua),
            _ => Ok(Value::Nil),
        }
    }

    fn set_field(&mut self, lua: &Lua, field: &str, value: Value) -> mlua::Result<()> {
        match field {
            "id" => self.id = lua.unpack(value)?,
            "source" => self.source = lua.unpack(value)?,
            "title" => self.title = lua.unpack(value)?,
            "authors" => self.authors = lua.unpack(value)?,
            "genres" => self.genres = lua.unpack(value)?,
            "status" => self.status = lua.unpack(value)?,
            "description" => self.description = lua.unpack(value)?,
            "path" => self.path = lua.unpack(value)?,
            "cover_url" => self.cover_url = lua.unpack(value)?,
            "last_updated" => self.last_updated = datetime(lua, value)?,
            _ => return Err(unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn label(&self) -> &str {
        &self.path
    }
}

impl RecordShape for Chapter {
    const TYPE_NAME: &'static str = "Chapter";
    const FIELDS: &'static [&'static str] = &[
        "id", "manga_id", "source", "title", "number", "language", "rank", "path", "uploaded",
        "pages",
    ];

    fn get_field(&self, lua: &Lua, field: &str) -> mlua::Result<Value> {
        match field {
            "id" => self.id.into_lua(lua),
            "manga_id" => self.manga_id.into_lua(lua),
            "source" => self.source.as_str().into_lua(lua),
            "title" => self.title.as_str().into_lua(lua),
            "number" => self.number.as_str().into_lua(lua),
            "language" => self.language.as_str().into_lua(lua),
            "rank" => self.rank.into_lua(lua),
            "path" => self.path.as_str().into_lua(lua),
            "uploaded" => timestamp(self.uploaded).into_lua(lua),
            "pages" => self
                .pages
                .iter()
                .cloned()
                .map(Handle)
                .collect::<Vec<_>>()
                .into_lua(lua),
            _ => Ok(Value::Nil),
        }
    }

    fn set_field(&mut self, lua: &Lua, field: &str, value: Value) -> mlua::Result<()> {
        match field {
            "id" => self.id = lua.unpack(value)?,
            "manga_id" => self.manga_id = lua.unpack(value)?,
            "source" => self.source = lua.unpack(value)?,
            "title" => self.title = lua.unpack(value)?,
            "number" => self.number = lua.unpack(value)?,
            "language" => self.language = lua.unpack(value)?,
            "rank" => self.rank = lua.unpack(value)?,
            "path" => self.path = lua.unpack(value)?,
            "uploaded" => self.uploaded = datetime(lua, value)?,
            "pages" => self.pages = pages(value)?,
            _ => return Err(unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn label(&self) -> &str {
        &self.path
    }
}

impl RecordShape for Page {
    const TYPE_NAME: &'static str = "Page";
    const FIELDS: &'static [&'static str] = &["id", "chapter_id", "source", "rank", "url"];

    fn get_field(&self, lua: &Lua, field: &str) -> mlua::Result<Value> {
        match field {
            "id" => self.id.into_lua(lua),
            "chapter_id" => self.chapter_id.into_lua(lua),
            "source" => self.source.as_str().into_lua(lua),
            "rank" => self.rank.into_lua(lua),
            "url" => self.url.as_str().into_lua(lua),
            _ => Ok(Value::Nil),
        }
    }

    fn set_field(&mut self, lua: &Lua, field: &str, value: Value) -> mlua::Result<()> {
        match field {
            "id" => self.id = lua.unpack(value)?,
            "chapter_id" => self.chapter_id = lua.unpack(value)?,
            "source" => self.source = lua.unpack(value)?,
            "rank" => self.rank = lua.unpack(value)?,
            "url" => self.url = lua.unpack(value)?,
            _ => return Err(unknown_field::<Self>(field)),
        }
        Ok(())
    }

    fn label(&self) -> &str {
        &self.url
    }
}

fn timestamp(value: Option<NaiveDateTime>) -> Option<i64> {
    value.map(|datetime| datetime.and_utc().timestamp())
}

/// Accepts unix seconds or an ISO-like `YYYY-MM-DD[ T]HH:MM:SS` string.
fn datetime(lua: &Lua, value: Value) -> mlua::Result<Option<NaiveDateTime>> {
    match value {
        Value::Nil => Ok(None),
        Value::String(text) => {
            let text = text.to_str()?;
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S"))
                .map(Some)
                .map_err(|e| mlua::Error::runtime(format!("invalid datetime `{}`: {e}", &*text)))
        }
        value => {
            let seconds: i64 = lua.unpack(value)?;
            DateTime::from_timestamp(seconds, 0)
                .map(|datetime| Some(datetime.naive_utc()))
                .ok_or_else(|| mlua::Error::runtime(format!("timestamp {seconds} out of range")))
        }
    }
}

fn pages(value: Value) -> mlua::Result<Vec<Page>> {
    let Value::Table(table) = value else {
        return Err(mlua::Error::runtime("Chapter.pages must be a table of Page"));
    };

    table
        .sequence_values::<Value>()
        .map(|value| {
            let value = value?;
            from_lua::<Page>(&value).ok_or_else(|| {
                mlua::Error::runtime(format!(
                    "Chapter.pages expects Page values, found {}",
                    value.type_name()
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_fields_readable<T: RecordShape>() {
        let lua = Lua::new();
        let record = T::default();
        for field in T::FIELDS {
            assert!(
                record.get_field(&lua, field).is_ok(),
                "{}.{} should be readable",
                T::TYPE_NAME,
                field
            );
        }
    }

    #[test]
    fn test_every_declared_field_is_readable() {
        assert_fields_readable::<Manga>();
        assert_fields_readable::<Chapter>();
        assert_fields_readable::<Page>();
    }

    #[test]
    fn test_datetime_accepts_string_and_seconds() {
        let lua = Lua::new();
        let from_text = datetime(&lua, "2024-03-01 12:30:00".into_lua(&lua).unwrap()).unwrap();
        let from_seconds = datetime(&lua, Value::Integer(1_709_296_200)).unwrap();

        assert_eq!(from_text, from_seconds);
        assert!(datetime(&lua, Value::Nil).unwrap().is_none());
        assert!(datetime(&lua, "yesterday".into_lua(&lua).unwrap()).is_err());
    }

    #[test]
    fn test_mistyped_value_is_error() {
        let lua = Lua::new();
        let mut manga = Manga::default();
        let table = Value::Table(lua.create_table().unwrap());

        assert!(manga.set_field(&lua, "title", table).is_err());
    }
}
