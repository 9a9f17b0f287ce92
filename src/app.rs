use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::api::{ApiClient, ApiError, Credentials};
use crate::category_tree::{CategoryTree, ExpandState, name_of_in};
use crate::config::Config;
use crate::record::Record;
use crate::session::{
    AuthSession, SESSION_COOKIE, create_session, destroy_session, session_from_cookies,
};
use crate::sorting::{SortState, sort_records};

pub struct AppState {
    api: ApiClient,
}

/// Sort parameters shared by every table view.
///
/// `sort`/`dir` carry the view's current state; `toggle` carries the header
/// the user clicked, if any. The applied state is echoed back in the
/// response so the view can render its direction indicator.
#[derive(Debug, Deserialize, Default)]
pub struct SortQuery {
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub toggle: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ProductsQuery {
    /// Exact category filter from the sidebar selection.
    category: Option<i64>,
    sort: Option<String>,
    dir: Option<String>,
    toggle: Option<String>,
}

impl ProductsQuery {
    fn sort_query(&self) -> SortQuery {
        SortQuery {
            sort: self.sort.clone(),
            dir: self.dir.clone(),
            toggle: self.toggle.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct TransactionsQuery {
    /// Search by product name (admin views).
    product: Option<String>,
    /// Search by user name (admin views).
    user: Option<String>,
    sort: Option<String>,
    dir: Option<String>,
    toggle: Option<String>,
}

impl TransactionsQuery {
    fn sort_query(&self) -> SortQuery {
        SortQuery {
            sort: self.sort.clone(),
            dir: self.dir.clone(),
            toggle: self.toggle.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct TreeQuery {
    /// Comma-separated ids of currently-expanded sidebar nodes.
    expanded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RegisterForm {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct StockChange {
    product_id: i64,
    quantity: i64,
    currency: String,
}

/// Resolve the view's effective sort state from its query parameters.
///
/// The view sends its current state plus the clicked header; the transition
/// itself (flip on same column, ascending on a new one) lives in
/// [`SortState::toggle`].
pub fn sort_state_from(query: &SortQuery, default: SortState) -> SortState {
    let mut state = match &query.sort {
        Some(column) => SortState::by(column, query.dir.as_deref() != Some("desc")),
        None => default,
    };
    if let Some(column) = &query.toggle {
        state.toggle(column);
    }
    state
}

fn parse_expanded_ids(raw: Option<&str>) -> Vec<i64> {
    raw.unwrap_or("")
        .split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

fn filter_by_category(records: Vec<Record>, category: Option<i64>) -> Vec<Record> {
    match category {
        None => records,
        Some(wanted) => records
            .into_iter()
            .filter(|r| r.get("category_id").and_then(Value::as_i64) == Some(wanted))
            .collect(),
    }
}

/// Standard envelope for a sorted table view.
fn table_response(rows: Vec<Record>, state: &SortState) -> Json<Value> {
    Json(json!({
        "status": "success",
        "sort": state,
        "rows": rows,
    }))
}

/// Status a collaborator failure maps to on our side.
///
/// A 404 from the inventory API means the lookup matched nothing (the search
/// endpoints answer 404 on a miss) and is forwarded as-is so the view can
/// tell an empty search from an outage. Everything else, including transport
/// failures that never got a status, becomes 502.
fn collaborator_status(error: &ApiError) -> StatusCode {
    match error.status {
        Some(404) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// A collaborator failure, surfaced as a message for the toast.
fn collaborator_error(error: ApiError) -> Response {
    (
        collaborator_status(&error),
        Json(json!({ "status": "error", "message": error.message })),
    )
        .into_response()
}

/// A structurally unusable collection (a cycle in the category parent
/// pointers, say). The data arrived fine; we refuse to render it.
fn structural_error(message: String) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}

// Guards. Pages redirect; API endpoints answer with a status code.

fn require_user_page(jar: &CookieJar) -> Result<AuthSession, Redirect> {
    let session = session_from_cookies(jar);
    if session.is_logged_in() {
        Ok(session)
    } else {
        Err(Redirect::to("/login"))
    }
}

fn require_admin_page(jar: &CookieJar) -> Result<AuthSession, Redirect> {
    let session = require_user_page(jar)?;
    if session.is_admin() {
        Ok(session)
    } else {
        Err(Redirect::to("/"))
    }
}

fn require_user_api(jar: &CookieJar) -> Result<AuthSession, Response> {
    let session = session_from_cookies(jar);
    if session.is_logged_in() {
        Ok(session)
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "status": "error", "message": "Not logged in" })),
        )
            .into_response())
    }
}

fn require_admin_api(jar: &CookieJar) -> Result<AuthSession, Response> {
    let session = require_user_api(jar)?;
    if session.is_admin() {
        Ok(session)
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "status": "error", "message": "Admin access required" })),
        )
            .into_response())
    }
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_state = Arc::new(AppState {
        api: ApiClient::new(&config.api_base_url),
    });

    let app = Router::new()
        // Pages
        .route("/", get(serve_home))
        .route("/login", get(serve_login).post(login))
        .route("/register", get(serve_register).post(register))
        .route("/products", get(serve_products))
        .route("/categories", get(serve_categories))
        .route("/users", get(serve_users))
        .route("/transactions", get(serve_transactions))
        .route("/logs", get(serve_logs))
        // Embedded assets
        .route("/static/app.js", get(serve_app_js))
        .route("/static/style.css", get(serve_style_css))
        // Auth
        .route("/logout", post(logout))
        // View endpoints
        .route("/api/session", get(current_session))
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/tree", get(category_sidebar))
        .route("/api/users", get(list_users))
        .route("/api/transactions", get(list_transactions))
        .route("/api/logs", get(list_logs))
        // Mutations
        .route("/api/purchase", post(purchase))
        .route("/api/restock", post(restock))
        .route(
            "/api/products/:id",
            put(update_product).delete(delete_product),
        )
        .route(
            "/api/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/api/users/:id", delete(delete_user))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "listening on http://{} (inventory API at {})",
        config.bind_addr, config.api_base_url
    );
    axum::serve(listener, app).await?;

    Ok(())
}

// Page handlers. Each page is a thin static view over the JSON endpoints.

async fn serve_home(jar: CookieJar) -> Result<Html<&'static str>, Redirect> {
    require_user_page(&jar)?;
    Ok(Html(include_str!("./static/home.html")))
}

async fn serve_login(jar: CookieJar) -> Response {
    if session_from_cookies(&jar).is_logged_in() {
        return Redirect::to("/").into_response();
    }
    Html(include_str!("./static/login.html")).into_response()
}

async fn serve_register() -> Html<&'static str> {
    Html(include_str!("./static/register.html"))
}

async fn serve_products(jar: CookieJar) -> Result<Html<&'static str>, Redirect> {
    require_user_page(&jar)?;
    Ok(Html(include_str!("./static/products.html")))
}

async fn serve_categories(jar: CookieJar) -> Result<Html<&'static str>, Redirect> {
    require_user_page(&jar)?;
    Ok(Html(include_str!("./static/categories.html")))
}

async fn serve_users(jar: CookieJar) -> Result<Html<&'static str>, Redirect> {
    require_admin_page(&jar)?;
    Ok(Html(include_str!("./static/users.html")))
}

async fn serve_transactions(jar: CookieJar) -> Result<Html<&'static str>, Redirect> {
    require_user_page(&jar)?;
    Ok(Html(include_str!("./static/transactions.html")))
}

async fn serve_logs(jar: CookieJar) -> Result<Html<&'static str>, Redirect> {
    require_admin_page(&jar)?;
    Ok(Html(include_str!("./static/logs.html")))
}

async fn serve_app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        include_str!("./static/app.js"),
    )
}

async fn serve_style_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        include_str!("./static/style.css"),
    )
}

// Auth handlers.

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    let credentials = Credentials {
        username: form.username,
        email: String::new(),
        password: form.password,
    };

    match state.api.login(&credentials).await {
        Ok(user) => {
            info!("user {} logged in", user.username);
            let session_id = create_session(user);
            let cookie = Cookie::build((SESSION_COOKIE, session_id))
                .path("/")
                .http_only(true)
                .build();
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(error) => {
            let location = format!("/login?error={}", urlencoding::encode(&error.message));
            Redirect::to(&location).into_response()
        }
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    axum::Form(form): axum::Form<RegisterForm>,
) -> Redirect {
    let credentials = Credentials {
        username: form.username,
        email: form.email,
        password: form.password,
    };

    match state.api.register(&credentials).await {
        Ok(()) => Redirect::to("/login?registered=1"),
        Err(error) => {
            let location = format!("/register?error={}", urlencoding::encode(&error.message));
            Redirect::to(&location)
        }
    }
}

async fn logout(jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        destroy_session(cookie.value());
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, Redirect::to("/login")).into_response()
}

async fn current_session(jar: CookieJar) -> Json<Value> {
    let session = session_from_cookies(&jar);
    Json(json!({
        "current_user": session.current_user,
        "is_admin": session.is_admin(),
    }))
}

// Table view endpoints: fetch, derive, respond. All derivation is pure and
// recomputed per request from the freshly fetched collection.

async fn list_products(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ProductsQuery>,
) -> Response {
    if let Err(denied) = require_user_api(&jar) {
        return denied;
    }

    let products = match state.api.get_products().await {
        Ok(products) => products,
        Err(error) => return collaborator_error(error),
    };

    let sort = sort_state_from(&query.sort_query(), SortState::unsorted());
    let rows = sort_records(&filter_by_category(products, query.category), &sort);
    table_response(rows, &sort).into_response()
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<SortQuery>,
) -> Response {
    if let Err(denied) = require_user_api(&jar) {
        return denied;
    }

    let categories = match state.api.get_categories().await {
        Ok(categories) => categories,
        Err(error) => return collaborator_error(error),
    };

    // The table shows each category's parent by name; the lookup is a plain
    // scan of the same collection, absent parents render empty.
    let mut rows: Vec<Record> = categories.clone();
    for row in &mut rows {
        let parent = crate::record::parent_id(row);
        let parent_name = name_of_in(&categories, parent).to_string();
        row.insert("parent_name".to_string(), Value::String(parent_name));
    }

    let sort = sort_state_from(&query, SortState::unsorted());
    table_response(sort_records(&rows, &sort), &sort).into_response()
}

async fn category_sidebar(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TreeQuery>,
) -> Response {
    if let Err(denied) = require_user_api(&jar) {
        return denied;
    }

    let categories = match state.api.get_categories().await {
        Ok(categories) => categories,
        Err(error) => return collaborator_error(error),
    };

    let tree = match CategoryTree::build(&categories) {
        Ok(tree) => tree,
        Err(message) => return structural_error(message),
    };

    let expand = ExpandState::from_open_ids(&parse_expanded_ids(query.expanded.as_deref()));
    match tree.visible(&expand) {
        Ok(rows) => Json(json!({ "status": "success", "rows": rows })).into_response(),
        Err(message) => structural_error(message),
    }
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<SortQuery>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }

    match state.api.get_users().await {
        Ok(users) => {
            let sort = sort_state_from(&query, SortState::unsorted());
            table_response(sort_records(&users, &sort), &sort).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TransactionsQuery>,
) -> Response {
    let session = match require_user_api(&jar) {
        Ok(session) => session,
        Err(denied) => return denied,
    };

    // Admins see everything and may search; everyone else sees their own.
    let fetched = if session.is_admin() {
        match (&query.product, &query.user) {
            (Some(product), _) if !product.is_empty() => {
                state.api.get_transactions_by_product_name(product).await
            }
            (_, Some(user)) if !user.is_empty() => {
                state.api.get_transactions_by_user_name(user).await
            }
            _ => state.api.get_transactions().await,
        }
    } else {
        let username = session
            .current_user
            .as_ref()
            .map(|user| user.username.clone())
            .unwrap_or_default();
        state.api.get_transactions_by_user_name(&username).await
    };

    match fetched {
        Ok(transactions) => {
            let sort = sort_state_from(&query.sort_query(), SortState::by("id", false));
            table_response(sort_records(&transactions, &sort), &sort).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn list_logs(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<SortQuery>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }

    match state.api.get_logs().await {
        Ok(logs) => {
            let sort = sort_state_from(&query, SortState::by("id", false));
            table_response(sort_records(&logs, &sort), &sort).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

// Mutation endpoints: one fire-and-forget request each, results surfaced as
// a message. The optimistic quantity patch after purchase/restock happens in
// the calling view on success.

async fn stock_transaction(
    state: &AppState,
    session: &AuthSession,
    change: StockChange,
    transaction_type: &str,
) -> Response {
    let user_id = session.current_user.as_ref().map(|u| u.id).unwrap_or(0);
    let transaction = json!({
        "product_id": change.product_id,
        "user_id": user_id,
        "currency": change.currency,
        "quantity": change.quantity,
        "transaction_type": transaction_type,
    });

    match state.api.create_transaction(&transaction).await {
        Ok(()) => Json(json!({
            "status": "success",
            "message": "Transaction created successfully",
        }))
        .into_response(),
        Err(error) => collaborator_error(error),
    }
}

async fn purchase(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(change): Json<StockChange>,
) -> Response {
    match require_user_api(&jar) {
        Ok(session) => stock_transaction(&state, &session, change, "purchase").await,
        Err(denied) => denied,
    }
}

async fn restock(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(change): Json<StockChange>,
) -> Response {
    match require_user_api(&jar) {
        Ok(session) => stock_transaction(&state, &session, change, "restock").await,
        Err(denied) => denied,
    }
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(product): Json<Value>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }
    match state.api.create_product(&product).await {
        Ok(()) => {
            Json(json!({ "status": "success", "message": "Product created" })).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Json(product): Json<Value>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }
    match state.api.update_product(id, &product).await {
        Ok(()) => {
            Json(json!({ "status": "success", "message": "Product updated" })).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }
    match state.api.delete_product(id).await {
        Ok(()) => {
            Json(json!({ "status": "success", "message": "Product deleted" })).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(category): Json<Value>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }
    match state.api.create_category(&category).await {
        Ok(()) => {
            Json(json!({ "status": "success", "message": "Category created" })).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
    Json(category): Json<Value>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }
    match state.api.update_category(id, &category).await {
        Ok(()) => {
            Json(json!({ "status": "success", "message": "Category updated" })).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }
    match state.api.delete_category(id).await {
        Ok(()) => {
            Json(json!({ "status": "success", "message": "Category deleted" })).into_response()
        }
        Err(error) => collaborator_error(error),
    }
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    if let Err(denied) = require_admin_api(&jar) {
        return denied;
    }
    match state.api.delete_user(id).await {
        Ok(()) => Json(json!({ "status": "success", "message": "User deleted" })).into_response(),
        Err(error) => collaborator_error(error),
    }
}
