use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use ecoes_bff::{BACKEND_UNAVAILABLE, SessionUser};

use super::routes::{PageRoute, PageView};
use crate::error::{AppError, ErrorFormat, ErrorResponse};
use crate::session::CurrentSession;
use crate::state::AppState;

/// Values every page template receives
struct PageContext<'a> {
    title: &'a str,
    user: Option<&'a SessionUser>,
    proxy_prefix: &'a str,
    websocket_url: &'a str,
    images_service_base_url: &'a str,
}

impl<'a> PageContext<'a> {
    fn new(state: &'a AppState, page: &'a PageRoute, session: Option<&'a CurrentSession>) -> Self {
        Self {
            title: page.title,
            user: session.and_then(CurrentSession::user),
            proxy_prefix: &state.settings.proxy_prefix,
            websocket_url: &state.settings.websocket_url,
            images_service_base_url: &state.settings.images_service_base_url,
        }
    }
}

#[derive(Template)]
#[template(path = "index.j2")]
struct LandingTemplate<'a> {
    ctx: PageContext<'a>,
}

#[derive(Template)]
#[template(path = "login.j2")]
struct LoginTemplate<'a> {
    ctx: PageContext<'a>,
    error_message: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "dashboard.j2")]
struct DashboardTemplate<'a> {
    ctx: PageContext<'a>,
    area: &'a str,
}

#[derive(Template)]
#[template(path = "section.j2")]
struct SectionTemplate<'a> {
    ctx: PageContext<'a>,
    area: &'a str,
    resource: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginQuery {
    error: Option<String>,
}

fn login_error_message(error: &str) -> &'static str {
    match error {
        BACKEND_UNAVAILABLE => "No se pudo conectar con el servidor. Intente nuevamente más tarde.",
        _ => "Su sesión no es válida. Inicie sesión nuevamente.",
    }
}

fn html<T: Template>(template: T) -> Result<Response, ErrorResponse> {
    let html = template.render().map_err(|e| {
        AppError::Internal(format!("template rendering failed: {e}")).with_format(ErrorFormat::Html)
    })?;
    Ok(Html(html).into_response())
}

pub(super) async fn login_page(
    State(state): State<AppState>,
    session: Option<CurrentSession>,
    Query(query): Query<LoginQuery>,
    page: &'static PageRoute,
) -> Result<Response, ErrorResponse> {
    if let Some(role) = session.as_ref().and_then(CurrentSession::role) {
        tracing::debug!("Already logged in as {}, redirecting home", role);
        return Ok(Redirect::to(role.home_path()).into_response());
    }

    html(LoginTemplate {
        ctx: PageContext::new(&state, page, None),
        error_message: query.error.as_deref().map(login_error_message),
    })
}

pub(super) async fn render_page(
    State(state): State<AppState>,
    session: Option<CurrentSession>,
    page: &'static PageRoute,
) -> Result<Response, ErrorResponse> {
    let ctx = PageContext::new(&state, page, session.as_ref());
    let area = page.area().map(|role| role.as_str()).unwrap_or_default();

    match page.view {
        PageView::Landing => html(LandingTemplate { ctx }),
        PageView::Dashboard => html(DashboardTemplate { ctx, area }),
        PageView::Section(resource) => html(SectionTemplate {
            ctx,
            area,
            resource,
        }),
        PageView::Login => html(LoginTemplate {
            ctx,
            error_message: None,
        }),
    }
}
