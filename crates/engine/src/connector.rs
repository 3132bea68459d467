use std::path::{Path, PathBuf};
use std::sync::Arc;

use mlua::{IntoLuaMulti, Lua, MultiValue, Value};
use tanoshi_types::{Chapter, Credentials, Filters, Manga};
use tokio::sync::Mutex;

use crate::bridge::{self, RecordShape};
use crate::config::EngineConfig;
use crate::error::{Error, ProtocolError, Result};
use crate::http::{self, HttpExecutor};
use crate::protocol::{Operation, RequestDescriptor, ResponseEnvelope};
use crate::sandbox;
use crate::session::SessionHeaders;

/// A loaded connector script bound to one content source.
///
/// The Lua state is single threaded, so every operation takes the
/// connector's lock for the whole describe → execute → parse chain. Separate
/// connectors never share a state and can run concurrently.
pub struct Connector {
    name: String,
    base_url: String,
    path: PathBuf,
    user_agent: String,
    executor: Arc<dyn HttpExecutor>,
    context: Mutex<ScriptContext>,
}

/// Everything that must only be touched by one call at a time.
struct ScriptContext {
    lua: Lua,
    session: SessionHeaders,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Connector {
    /// Read and load the script at `path`.
    pub async fn load(
        path: impl AsRef<Path>,
        executor: Arc<dyn HttpExecutor>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::load(path, format!("cannot read script: {e}")))?;
        Self::from_source(path, &source, executor, config)
    }

    /// Load a connector from script text; `path` only names the chunk.
    pub fn from_source(
        path: impl AsRef<Path>,
        source: &str,
        executor: Arc<dyn HttpExecutor>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let chunk_name = path.display().to_string();

        let lua = sandbox::new_state(&chunk_name, config).map_err(|e| Error::Load {
            path: path.clone(),
            message: "failed to create script state".to_string(),
            source: Some(e),
        })?;

        lua.load(source)
            .set_name(format!("@{chunk_name}"))
            .exec()
            .map_err(|e| Error::Load {
                path: path.clone(),
                message: "script failed to execute".to_string(),
                source: Some(e),
            })?;

        let name = identity_string(&lua, &path, "name")?;
        let base_url = identity_string(&lua, &path, "base_url")?;

        tracing::info!(connector = %name, %base_url, path = %path.display(), "loaded connector");

        Ok(Self {
            name,
            base_url,
            path,
            user_agent: config.user_agent.clone(),
            executor,
            context: Mutex::new(ScriptContext {
                lua,
                session: SessionHeaders::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the script defines both entry points of `op`.
    pub async fn supports(&self, op: Operation) -> bool {
        let context = self.context.lock().await;
        context.has_function(op.request_entry_point()) && context.has_function(op.parse_entry_point())
    }

    /// Snapshot of the current session headers.
    pub async fn session_headers(&self) -> SessionHeaders {
        self.context.lock().await.session.clone()
    }

    /// Release the script state.
    pub fn close(self) {
        tracing::debug!(connector = %self.name, "closing connector");
    }

    #[tracing::instrument(skip(self), fields(connector = %self.name))]
    pub async fn get_latest_updates(&self, page: i64) -> Result<Vec<Manga>> {
        let op = Operation::LatestUpdates;
        let context = self.context.lock().await;

        let descriptor = context.describe(op, |_| Ok(page))?;
        let response = self.execute(&context.session, descriptor).await?;
        let mut manga = context.parse_list::<Manga>(op, response.body)?;

        for m in &mut manga {
            m.source = self.name.clone();
        }
        Ok(manga)
    }

    #[tracing::instrument(skip_all, fields(connector = %self.name, id = manga.id))]
    pub async fn get_manga_details(&self, manga: &Manga) -> Result<Manga> {
        let op = Operation::MangaDetails;
        let context = self.context.lock().await;

        let descriptor = context.describe(op, |lua| bridge::to_lua(lua, manga))?;
        let response = self.execute(&context.session, descriptor).await?;
        let mut details = context.parse_single::<Manga>(op, response.body)?;

        details.source = self.name.clone();
        details.id = manga.id;
        Ok(details)
    }

    #[tracing::instrument(skip_all, fields(connector = %self.name, id = manga.id))]
    pub async fn get_chapters(&self, manga: &Manga) -> Result<Vec<Chapter>> {
        let op = Operation::Chapters;
        let context = self.context.lock().await;

        let descriptor = context.describe(op, |lua| bridge::to_lua(lua, manga))?;
        let response = self.execute(&context.session, descriptor).await?;
        let mut chapters = context.parse_list::<Chapter>(op, response.body)?;

        for chapter in &mut chapters {
            chapter.source = self.name.clone();
        }
        Ok(chapters)
    }

    /// Fetch a chapter's pages. The result carries the caller's chapter id.
    #[tracing::instrument(skip_all, fields(connector = %self.name, id = chapter.id))]
    pub async fn get_chapter(&self, chapter: &Chapter) -> Result<Chapter> {
        let op = Operation::Chapter;
        let context = self.context.lock().await;

        let descriptor = context.describe(op, |lua| bridge::to_lua(lua, chapter))?;
        let response = self.execute(&context.session, descriptor).await?;
        let mut details = context.parse_single::<Chapter>(op, response.body)?;

        details.id = chapter.id;
        for page in &mut details.pages {
            page.chapter_id = chapter.id;
        }
        Ok(details)
    }

    /// Run the login flow and replace the session headers it names.
    #[tracing::instrument(skip_all, fields(connector = %self.name, username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let op = Operation::Login;
        let mut context = self.context.lock().await;

        let descriptor = context.describe(op, |lua| bridge::credentials_to_lua(lua, credentials))?;
        let response = self.execute(&context.session, descriptor).await?;

        let entry_point = op.parse_entry_point();
        let value = context.call(entry_point, |lua| {
            Ok((bridge::headers_to_lua(lua, &response.header)?, response.body.as_str()))
        })?;
        let replacement = bridge::decode_header_replacement(entry_point, value)?;

        tracing::info!(
            headers = ?replacement.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            "updating session headers"
        );
        context.session.apply(replacement)?;
        Ok(())
    }

    /// Search the source. Records are returned as the connector built them.
    #[tracing::instrument(skip_all, fields(connector = %self.name))]
    pub async fn fetch_manga(&self, filters: &Filters) -> Result<Vec<Manga>> {
        let op = Operation::FetchManga;
        let context = self.context.lock().await;

        let descriptor = context.describe(op, |lua| bridge::filters_to_lua(lua, filters))?;
        let response = self.execute(&context.session, descriptor).await?;
        context.parse_list::<Manga>(op, response.body)
    }

    async fn execute(
        &self,
        session: &SessionHeaders,
        descriptor: RequestDescriptor,
    ) -> Result<ResponseEnvelope> {
        let request = http::build_request(descriptor, session, &self.user_agent)?;
        tracing::info!(method = %request.method, url = %request.url, "executing request");
        Ok(self.executor.execute(request).await?)
    }
}

impl ScriptContext {
    fn has_function(&self, name: &str) -> bool {
        matches!(self.lua.globals().get::<Value>(name), Ok(Value::Function(_)))
    }

    /// Call a global function in protected mode and return its first result.
    fn call<F, A>(&self, entry_point: &str, args: F) -> Result<Value>
    where
        F: FnOnce(&Lua) -> mlua::Result<A>,
        A: IntoLuaMulti,
    {
        let function = match self
            .lua
            .globals()
            .get::<Value>(entry_point)
            .map_err(|e| Error::script(entry_point, e))?
        {
            Value::Function(function) => function,
            Value::Nil => return Err(ProtocolError::MissingEntryPoint(entry_point.to_string()).into()),
            other => {
                return Err(ProtocolError::UnexpectedValue {
                    entry_point: entry_point.to_string(),
                    expected: "a function",
                    found: other.type_name(),
                }
                .into());
            }
        };

        let args = args(&self.lua).map_err(|e| Error::script(entry_point, e))?;
        function
            .call::<Value>(args)
            .map_err(|e| Error::script(entry_point, e))
    }

    fn describe<F, A>(&self, op: Operation, args: F) -> Result<RequestDescriptor>
    where
        F: FnOnce(&Lua) -> mlua::Result<A>,
        A: IntoLuaMulti,
    {
        let entry_point = op.request_entry_point();
        let value = self.call(entry_point, args)?;
        Ok(RequestDescriptor::from_lua(entry_point, value)?)
    }

    fn parse_list<T: RecordShape>(&self, op: Operation, body: String) -> Result<Vec<T>> {
        let entry_point = op.parse_entry_point();
        let value = self.call(entry_point, |_| Ok(body))?;
        Ok(bridge::decode::<T>(entry_point, value)?.into_list())
    }

    fn parse_single<T: RecordShape>(&self, op: Operation, body: String) -> Result<T> {
        let entry_point = op.parse_entry_point();
        let value = self.call(entry_point, |_| Ok(body))?;
        Ok(bridge::decode::<T>(entry_point, value)?.into_single(entry_point)?)
    }
}

/// Call an identity entry point that must return exactly one non-empty string.
fn identity_string(lua: &Lua, path: &Path, entry_point: &str) -> Result<String> {
    let function = match lua.globals().get::<Value>(entry_point) {
        Ok(Value::Function(function)) => function,
        Ok(Value::Nil) => return Err(Error::load(path, format!("`{entry_point}` is not defined"))),
        Ok(other) => {
            return Err(Error::load(
                path,
                format!("`{entry_point}` is a {}, not a function", other.type_name()),
            ));
        }
        Err(e) => {
            return Err(Error::Load {
                path: path.to_path_buf(),
                message: format!("cannot read `{entry_point}`"),
                source: Some(e),
            });
        }
    };

    let values = function.call::<MultiValue>(()).map_err(|e| Error::Load {
        path: path.to_path_buf(),
        message: format!("`{entry_point}` raised an error"),
        source: Some(e),
    })?;

    match values.len() {
        1 => {}
        n => {
            return Err(Error::load(
                path,
                format!("`{entry_point}` must return one value, returned {n}"),
            ));
        }
    }

    match values.into_iter().next() {
        Some(Value::String(value)) => {
            let value = String::from(value.to_string_lossy());
            if value.is_empty() {
                Err(Error::load(path, format!("`{entry_point}` returned an empty string")))
            } else {
                Ok(value)
            }
        }
        Some(other) => Err(Error::load(
            path,
            format!("`{entry_point}` must return a string, returned {}", other.type_name()),
        )),
        None => Err(Error::load(path, format!("`{entry_point}` returned nothing"))),
    }
}
