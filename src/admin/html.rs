//! Embedded HTML UI Module

/// Single-page admin UI served at `/`
pub fn ui_html() -> &'static str {
    include_str!("../../web/admin-ui.html")
}
