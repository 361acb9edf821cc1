//! HTTP-shaped request router.
//!
//! Maps method + path + JSON body onto [`Collectives`] and turns every
//! result into a status and a JSON body. Transport is left to the embedder.
//!
//! Routes, optionally prefixed with `/api/v1.0`:
//!
//! | Method | Path | |
//! |---|---|---|
//! | POST, GET | `/collectives/{id}/shares` | create, show share |
//! | PUT, DELETE | `/collectives/{id}/shares/{token}` | change tier, unshare |
//! | GET | `/p/{token}[/{title}]` | open share link |
//! | GET | `…/collectives/{id}/pages` | page list |
//! | GET, POST, PUT, DELETE | `…/collectives/{id}/pages/{pageId}` | read, create child, update, remove |
//! | GET | `…/collectives/{id}/pages/{pageId}/backlinks` | |
//! | GET | `…/collectives/{id}/pages/{pageId}/outline` | |
//! | PUT | `…/collectives/{id}/pages/{pageId}/session` | open edit session |
//! | PUT, DELETE | `…/collectives/{id}/pages/{pageId}/session/{sessionId}` | write, close |
//! | GET | `…/collectives/{id}/search?query=` | page filter |
//!
//! Paths may also start with the app prefix of share links,
//! `/index.php/apps/collectives` or `/apps/collectives`.
//!
//! `…` is empty for members and `/p` for share link visitors. Public routes
//! only look at the share token of a request, member routes only at the
//! session.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use collectives_core::{CollectiveId, PageId, ShareTier};
use collectives_perms::RequestContext;
use collectives_store::TokenStore;

use crate::collectives::{Collectives, PageUpdate};
use crate::error::{ApiError, CollectivesError};
use crate::sessions::SessionId;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// An inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path with optional query string.
    pub path: String,
    pub ctx: RequestContext,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ctx: RequestContext::anonymous(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_context(mut self, ctx: RequestContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(err: &ApiError) -> Self {
        Self {
            status: err.status(),
            body: err.to_json(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Shares(CollectiveId),
    Share(CollectiveId, String),
    SharedCollective(String),
    Pages(CollectiveId),
    Page(CollectiveId, PageId),
    Backlinks(CollectiveId, PageId),
    Outline(CollectiveId, PageId),
    Session(CollectiveId, PageId),
    SessionWrite(CollectiveId, PageId, SessionId),
    Search(CollectiveId),
}

#[derive(Debug)]
struct Target {
    route: Route,
    public: bool,
    query: HashMap<String, String>,
}

fn parse_target(path: &str) -> Option<Target> {
    let (path, query) = path.split_once('?').unwrap_or((path, ""));
    let query: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    let decoded = path
        .trim_matches('/')
        .split('/')
        .map(|s| urlencoding::decode(s).map(|c| c.into_owned()))
        .collect::<Result<Vec<String>, _>>()
        .ok()?;
    let mut segments: Vec<&str> = decoded.iter().map(String::as_str).collect();
    if segments.first() == Some(&"index.php") {
        segments.remove(0);
    }
    if segments.starts_with(&["apps", "collectives"]) {
        segments.drain(..2);
    }
    if segments.starts_with(&["api", "v1.0"]) {
        segments.drain(..2);
    }

    let (public, rest) = match segments.as_slice() {
        ["p", "collectives", rest @ ..] => (true, rest),
        // Share links carry the collective title after the token
        ["p", token, ..] => {
            return Some(Target {
                route: Route::SharedCollective(token.to_string()),
                public: true,
                query,
            })
        }
        ["collectives", rest @ ..] => (false, rest),
        _ => return None,
    };

    let route = match rest {
        [id, "shares"] if !public => Route::Shares(collective(id)?),
        [id, "shares", token] if !public => Route::Share(collective(id)?, token.to_string()),
        [id, "pages"] => Route::Pages(collective(id)?),
        [id, "pages", pid] => Route::Page(collective(id)?, page(pid)?),
        [id, "pages", pid, "backlinks"] => Route::Backlinks(collective(id)?, page(pid)?),
        [id, "pages", pid, "outline"] => Route::Outline(collective(id)?, page(pid)?),
        [id, "pages", pid, "session"] => Route::Session(collective(id)?, page(pid)?),
        [id, "pages", pid, "session", sid] => {
            Route::SessionWrite(collective(id)?, page(pid)?, SessionId::from(*sid))
        }
        [id, "search"] => Route::Search(collective(id)?),
        _ => return None,
    };

    Some(Target {
        route,
        public,
        query,
    })
}

fn collective(id: &str) -> Option<CollectiveId> {
    id.parse().ok().map(CollectiveId)
}

fn page(id: &str) -> Option<PageId> {
    id.parse().ok().map(PageId)
}

/// Why a request failed before it could be answered.
enum Failure {
    Api(ApiError),
    App(CollectivesError),
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Failure::Api(err)
    }
}

impl From<CollectivesError> for Failure {
    fn from(err: CollectivesError) -> Self {
        Failure::App(err)
    }
}

type Outcome = std::result::Result<Value, Failure>;

#[derive(Deserialize)]
struct NewPage {
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ShareUpdate {
    editable: Option<bool>,
    tier: Option<ShareTier>,
}

#[derive(Deserialize)]
struct SessionWrite {
    content: String,
}

fn body<T: DeserializeOwned>(request: &Request) -> std::result::Result<T, ApiError> {
    let value = request.body.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Outcome {
    serde_json::to_value(value).map_err(|e| {
        warn!(error = %e, "failed to serialize response");
        Failure::Api(ApiError::Internal)
    })
}

/// Handle one request.
pub async fn handle<S: TokenStore>(app: &Collectives<S>, request: Request) -> Response {
    let method = request.method;
    let path = request.path.clone();

    match dispatch(app, request).await {
        Ok(body) => {
            debug!(?method, %path, "request ok");
            Response::ok(body)
        }
        Err(Failure::Api(err)) => {
            debug!(?method, %path, status = err.status(), "request rejected");
            Response::error(&err)
        }
        Err(Failure::App(err)) => {
            let message = err.to_string();
            let api = ApiError::from(err);
            if api == ApiError::Internal {
                warn!(?method, %path, error = %message, "request failed");
            } else {
                debug!(?method, %path, error = %message, status = api.status(), "request refused");
            }
            Response::error(&api)
        }
    }
}

async fn dispatch<S: TokenStore>(app: &Collectives<S>, request: Request) -> Outcome {
    let target = parse_target(&request.path).ok_or(ApiError::NotFound)?;

    // Each surface only sees its own kind of credential
    let ctx = if target.public {
        RequestContext {
            session: None,
            share_token: request.ctx.share_token.clone(),
        }
    } else {
        RequestContext {
            session: request.ctx.session.clone(),
            share_token: None,
        }
    };

    match (request.method, target.route) {
        (Method::Post, Route::Shares(c)) => to_json(&app.create_share(&ctx, c).await?),
        (Method::Get, Route::Shares(c)) => to_json(&app.get_share(&ctx, c).await?),
        (Method::Put, Route::Share(c, token)) => {
            let update: ShareUpdate = body(&request)?;
            let tier = match (update.tier, update.editable) {
                (Some(tier), _) => tier,
                (None, Some(true)) => ShareTier::Edit,
                (None, Some(false)) => ShareTier::ReadOnly,
                (None, None) => {
                    return Err(ApiError::BadRequest("expected `tier` or `editable`".into()).into())
                }
            };
            let share = app
                .shares()
                .update_share_tier_by_token(c, &ctx, &token, tier)
                .await?;
            to_json(&share)
        }
        (Method::Delete, Route::Share(c, token)) => {
            app.shares().delete_share_by_token(c, &ctx, &token).await?;
            Ok(json!({}))
        }

        (Method::Get, Route::SharedCollective(token)) => {
            to_json(&app.shared_collective(&token).await?)
        }

        (Method::Get, Route::Pages(c)) => to_json(&app.pages_of(&ctx, c).await?),
        (Method::Get, Route::Page(c, p)) => to_json(&app.page(&ctx, c, p).await?),
        (Method::Post, Route::Page(c, parent)) => {
            let new: NewPage = body(&request)?;
            to_json(&app.create_page(&ctx, c, parent, &new.title, &new.content).await?)
        }
        (Method::Put, Route::Page(c, p)) => {
            let update: PageUpdate = body(&request)?;
            to_json(&app.update_page(&ctx, c, p, update).await?)
        }
        (Method::Delete, Route::Page(c, p)) => to_json(&app.remove_page(&ctx, c, p).await?),
        (Method::Get, Route::Backlinks(c, p)) => to_json(&app.backlinks_of(&ctx, c, p).await?),
        (Method::Get, Route::Outline(c, p)) => to_json(&app.outline_of(&ctx, c, p).await?),

        (Method::Put, Route::Session(c, p)) => to_json(&app.open_session(&ctx, c, p).await?),
        (Method::Put, Route::SessionWrite(c, p, sid)) => {
            let write: SessionWrite = body(&request)?;
            // A session id used under the wrong path is unknown there
            let session = app.session(&sid)?;
            if session.collective_id != c || session.page_id != p {
                return Err(ApiError::NotFound.into());
            }
            to_json(&app.write_session(&ctx, &sid, &write.content).await?)
        }
        (Method::Delete, Route::SessionWrite(c, p, sid)) => {
            let closed = app.close_session(&ctx, c, p, &sid).await?;
            Ok(json!({ "closed": closed }))
        }

        (Method::Get, Route::Search(c)) => {
            let query = target.query.get("query").map(String::as_str).unwrap_or("");
            let pages: Vec<_> = app.search(&ctx, c, query).await?.collect();
            to_json(&pages)
        }

        _ => Err(ApiError::MethodNotAllowed.into()),
    }
}
