use anyhow::{Context, Result};
use axum::{
    extract::{Form, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::{bearer_token, cookie_token, IdentityProvider};
use crate::core::feed;
use crate::core::BlogService;
use crate::error::{Action, BlogError, BlogResult};
use crate::models::{BlogPost, Identity, NewPost, Notice, PostUpdate};
use crate::theme::ThemeRenderer;

/// 请求处理共享的状态
#[derive(Clone)]
pub struct AppState {
    pub service: BlogService,
    pub renderer: Arc<ThemeRenderer>,
    pub identities: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        service: BlogService,
        renderer: ThemeRenderer,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            service,
            renderer: Arc::new(renderer),
            identities,
        }
    }

    /// 从 Authorization 头或 Cookie 解析调用方身份
    fn identity(&self, headers: &HeaderMap) -> Identity {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .or_else(|| {
                headers
                    .get(header::COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(cookie_token)
            });
        self.identities.resolve(token)
    }
}

/// HTTP 服务器
pub struct Server {
    /// 监听地址
    host: String,
    /// 端口
    port: u16,
    state: AppState,
}

impl Server {
    /// 创建新的服务器
    pub fn new(state: AppState, host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            state,
        }
    }

    /// 绑定监听地址，主机名会先解析
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("无法监听 {}:{}", self.host, self.port))
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let listener = self.bind().await?;
        info!("Server started at http://{}", listener.local_addr()?);

        axum::serve(listener, router(self.state)).await?;

        Ok(())
    }
}

/// 创建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/posts/:id", get(post_page))
        .route("/write", get(write_page).post(write_submit))
        .route("/admin", get(admin_page))
        .route("/admin/posts/:id/edit", get(admin_edit_page).post(admin_edit_submit))
        .route("/admin/posts/:id/toggle", post(admin_toggle))
        .route("/admin/posts/:id/delete", post(admin_delete))
        .route("/newsletter", post(newsletter))
        .route("/feed.xml", get(rss_feed))
        .route("/api/posts", get(api_public_posts).post(api_create))
        .route("/api/admin/posts", get(api_admin_posts))
        .route("/api/posts/:id", put(api_update).delete(api_delete))
        .route("/api/posts/:id/toggle", post(api_toggle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 存储调用是同步的（文件存储会写磁盘），放到阻塞线程池中执行
async fn blocking<F>(state: AppState, f: F) -> Response
where
    F: FnOnce(&AppState) -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&state)).await {
        Ok(response) => response,
        Err(e) => {
            error!("请求处理任务失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn html_response(status: StatusCode, rendered: Result<String>) -> Response {
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("页面渲染失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

// ---------- 公开页面 ----------

async fn index_page(State(state): State<AppState>) -> Response {
    blocking(state, |state| render_index(state, StatusCode::OK, None)).await
}

fn render_index(state: &AppState, status: StatusCode, notice: Option<Notice>) -> Response {
    // 读取失败时显示空列表和失败提示
    let (posts, notice) = match state.service.latest_published() {
        Ok(posts) => (posts, notice),
        Err(e) => (Vec::new(), Some(e.notice())),
    };
    html_response(status, state.renderer.render_index(&posts, notice.as_ref()))
}

async fn post_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    blocking(state, move |state| match state.service.published_post(id) {
        Ok(post) => html_response(StatusCode::OK, state.renderer.render_post(&post)),
        Err(e) => render_index(state, e.status(), Some(e.notice())),
    })
    .await
}

#[derive(Debug, Deserialize)]
struct NewsletterForm {
    email: String,
}

async fn newsletter(State(state): State<AppState>, Form(form): Form<NewsletterForm>) -> Response {
    let email = form.email.trim().to_string();
    blocking(state, move |state| {
        if email.is_empty() || !email.contains('@') {
            return render_index(
                state,
                StatusCode::BAD_REQUEST,
                Some(Notice::error("Please enter a valid email address")),
            );
        }
        info!("Subscribing: {}", email);
        render_index(
            state,
            StatusCode::OK,
            Some(Notice::success("Thanks for subscribing!")),
        )
    })
    .await
}

async fn rss_feed(State(state): State<AppState>) -> Response {
    if !state.service.config().feed.enable {
        return StatusCode::NOT_FOUND.into_response();
    }
    blocking(state, |state| match state.service.feed_posts() {
        Ok(posts) => {
            let channel = feed::rss_channel(state.service.config(), &posts);
            (
                [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
                channel.to_string(),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    })
    .await
}

// ---------- 写作页面 ----------

#[derive(Debug, Deserialize)]
struct WriteForm {
    title: String,
    #[serde(default)]
    excerpt: String,
    content: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    cover_image: String,
    /// "publish" 或 "draft"
    action: String,
}

impl WriteForm {
    fn into_parts(self) -> (bool, NewPost) {
        let publish = self.action != "draft";
        let post = NewPost {
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            category: self.category,
            cover_image: self.cover_image,
            published: publish,
        };
        (publish, post)
    }
}

async fn write_page(State(state): State<AppState>) -> Response {
    html_response(
        StatusCode::OK,
        state.renderer.render_write(&NewPost::default(), None),
    )
}

async fn write_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<WriteForm>,
) -> Response {
    let identity = state.identity(&headers);
    let (publish, post) = form.into_parts();

    blocking(state, move |state| {
        let result = if publish {
            state.service.publish(&identity, post.clone())
        } else {
            state.service.save_draft(&identity, post.clone())
        };

        match result {
            // 发布后回到首页
            Ok((_, notice)) if publish => render_index(state, StatusCode::OK, Some(notice)),
            Ok((_, notice)) => html_response(
                StatusCode::OK,
                state.renderer.render_write(&post, Some(&notice)),
            ),
            Err(e) => html_response(
                e.status(),
                state.renderer.render_write(&post, Some(&e.notice())),
            ),
        }
    })
    .await
}

// ---------- 管理后台 ----------

fn render_admin(
    state: &AppState,
    identity: &Identity,
    status: StatusCode,
    editing: Option<&BlogPost>,
    notice: Option<Notice>,
) -> Response {
    match state.service.admin_posts(identity) {
        Ok(posts) => html_response(
            status,
            state
                .renderer
                .render_admin(identity, &posts, editing, notice.as_ref()),
        ),
        Err(e) => {
            // 未登录返回 401，读取失败时仍显示空列表
            let status = match e {
                BlogError::Unauthenticated => e.status(),
                _ => status,
            };
            html_response(
                status,
                state
                    .renderer
                    .render_admin(identity, &[], None, Some(&e.notice())),
            )
        }
    }
}

/// 把一次修改操作的结果渲染为后台页面
fn admin_outcome(state: &AppState, identity: &Identity, result: BlogResult<Notice>) -> Response {
    match result {
        Ok(notice) => render_admin(state, identity, StatusCode::OK, None, Some(notice)),
        Err(e) => render_admin(state, identity, e.status(), None, Some(e.notice())),
    }
}

async fn admin_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        render_admin(state, &identity, StatusCode::OK, None, None)
    })
    .await
}

async fn admin_edit_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        if identity.is_signed_in() && !identity.is_admin {
            let e = BlogError::PermissionDenied {
                action: Action::Update,
            };
            return render_admin(state, &identity, e.status(), None, Some(e.notice()));
        }
        match state.service.admin_post(&identity, id) {
            Ok(post) => render_admin(state, &identity, StatusCode::OK, Some(&post), None),
            Err(e) => render_admin(state, &identity, e.status(), None, Some(e.notice())),
        }
    })
    .await
}

#[derive(Debug, Deserialize)]
struct EditForm {
    title: String,
    #[serde(default)]
    excerpt: String,
    content: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    cover_image_url: String,
    #[serde(default)]
    read_time: String,
}

impl From<EditForm> for PostUpdate {
    fn from(form: EditForm) -> Self {
        PostUpdate {
            title: form.title,
            excerpt: form.excerpt,
            content: form.content,
            category: form.category,
            cover_image_url: Some(form.cover_image_url),
            read_time: Some(form.read_time),
        }
    }
}

async fn admin_edit_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Form(form): Form<EditForm>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        let result = state
            .service
            .update(&identity, id, form.into())
            .map(|(_, notice)| notice);
        admin_outcome(state, &identity, result)
    })
    .await
}

async fn admin_toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        let result = state
            .service
            .toggle_publish(&identity, id)
            .map(|(_, notice)| notice);
        admin_outcome(state, &identity, result)
    })
    .await
}

async fn admin_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        let result = state.service.delete(&identity, id);
        admin_outcome(state, &identity, result)
    })
    .await
}

// ---------- JSON API ----------

/// 修改操作的响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub notice: Notice,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post: Option<BlogPost>,
}

impl MutationResponse {
    fn with_post((post, notice): (BlogPost, Notice)) -> Json<Self> {
        Json(Self {
            notice,
            post: Some(post),
        })
    }
}

async fn api_public_posts(State(state): State<AppState>) -> Response {
    blocking(state, |state| {
        state.service.latest_published().map(Json).into_response()
    })
    .await
}

async fn api_admin_posts(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        state.service.admin_posts(&identity).map(Json).into_response()
    })
    .await
}

async fn api_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(post): Json<NewPost>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        let created = if post.published {
            state.service.publish(&identity, post)
        } else {
            state.service.save_draft(&identity, post)
        };
        created
            .map(|created| (StatusCode::CREATED, MutationResponse::with_post(created)))
            .into_response()
    })
    .await
}

async fn api_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(update): Json<PostUpdate>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        state
            .service
            .update(&identity, id, update)
            .map(MutationResponse::with_post)
            .into_response()
    })
    .await
}

async fn api_toggle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        state
            .service
            .toggle_publish(&identity, id)
            .map(MutationResponse::with_post)
            .into_response()
    })
    .await
}

async fn api_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let identity = state.identity(&headers);
    blocking(state, move |state| {
        state
            .service
            .delete(&identity, id)
            .map(|notice| Json(MutationResponse { notice, post: None }))
            .map_err(|e| {
                warn!("删除文章 {} 失败: {}", id, e);
                e
            })
            .into_response()
    })
    .await
}
