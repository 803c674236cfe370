use axum::{
    Router,
    extract::{Query, Request, State},
    middleware::{Next, from_fn_with_state},
    routing::{MethodRouter, get},
};

use ecoes_bff::{AccessRule, Role};

use super::handlers::{LoginQuery, login_page, render_page};
use crate::middleware::{backend_precheck, require_roles};
use crate::session::CurrentSession;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageView {
    Landing,
    Login,
    Dashboard,
    /// Management page of one resource, named by its backend collection
    Section(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct PageRoute {
    pub path: &'static str,
    pub title: &'static str,
    pub view: PageView,
    /// `None` for public pages
    pub rule: Option<AccessRule>,
    /// Health-check the backend before rendering
    pub backend_check: bool,
}

const fn public(path: &'static str, title: &'static str, view: PageView) -> PageRoute {
    PageRoute {
        path,
        title,
        view,
        rule: None,
        backend_check: false,
    }
}

const fn admin(path: &'static str, title: &'static str, view: PageView) -> PageRoute {
    PageRoute {
        path,
        title,
        view,
        rule: Some(AccessRule::SUPER_ADMIN),
        backend_check: true,
    }
}

const fn empresa(path: &'static str, title: &'static str, view: PageView) -> PageRoute {
    PageRoute {
        path,
        title,
        view,
        rule: Some(AccessRule::EMPRESA),
        backend_check: true,
    }
}

pub const PAGE_ROUTES: &[PageRoute] = &[
    public("/", "Inicio", PageView::Landing),
    public("/login", "Iniciar sesión", PageView::Login),
    admin("/admin", "Panel de administración", PageView::Dashboard),
    admin("/admin/empresas", "Empresas", PageView::Section("empresas")),
    admin("/admin/hardware", "Hardware", PageView::Section("hardware")),
    admin("/admin/usuarios", "Usuarios", PageView::Section("usuarios")),
    admin("/admin/alertas", "Alertas", PageView::Section("alertas")),
    admin(
        "/admin/tipos-empresa",
        "Tipos de empresa",
        PageView::Section("tipos-empresa"),
    ),
    admin("/admin/multimedia", "Multimedia", PageView::Section("multimedia")),
    empresa("/empresa", "Panel de empresa", PageView::Dashboard),
    empresa("/empresa/hardware", "Hardware", PageView::Section("hardware")),
    empresa("/empresa/usuarios", "Usuarios", PageView::Section("usuarios")),
    empresa("/empresa/alertas", "Alertas", PageView::Section("alertas")),
];

impl PageRoute {
    /// Role whose area this page belongs to
    pub fn area(&self) -> Option<Role> {
        match self.rule {
            Some(rule) => rule.roles.first().copied(),
            None => None,
        }
    }

    fn method_router(&'static self, state: &AppState) -> MethodRouter<AppState> {
        let mut route = match self.view {
            PageView::Login => get(
                move |state: State<AppState>,
                      session: Option<CurrentSession>,
                      query: Query<LoginQuery>| login_page(state, session, query, self),
            ),
            _ => get(
                move |state: State<AppState>, session: Option<CurrentSession>| {
                    render_page(state, session, self)
                },
            ),
        };

        // The last layer added runs first: backend check, then role guard
        if let Some(rule) = self.rule {
            let guard = move |s: State<AppState>, req: Request, next: Next| {
                require_roles(s, rule, req, next)
            };
            route = route.layer(from_fn_with_state(state.clone(), guard));
        }
        if self.backend_check {
            route = route.layer(from_fn_with_state(state.clone(), backend_precheck));
        }
        route
    }
}

pub(crate) fn router(state: &AppState) -> Router<AppState> {
    PAGE_ROUTES.iter().fold(Router::new(), |router, page| {
        router.route(page.path, page.method_router(state))
    })
}
