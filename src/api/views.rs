//! Minimal server-rendered pages. All dynamic values pass through
//! `html_escape` before they reach the markup.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Dashboard,
    Analytics,
    Settings,
}

impl Nav {
    const ALL: [Self; 3] = [Self::Dashboard, Self::Analytics, Self::Settings];

    const fn href(self) -> &'static str {
        match self {
            Self::Dashboard => "/",
            Self::Analytics => "/analytics",
            Self::Settings => "/settings",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Analytics => "Analytics",
            Self::Settings => "Settings",
        }
    }
}

pub struct DashboardView<'a> {
    pub user: &'a str,
    pub api_key: &'a str,
    pub owned_server: Option<&'a str>,
    pub premium_user: bool,
}

pub struct AnalyticsView<'a> {
    pub user: &'a str,
    pub percent_using: u32,
    pub number_using: i32,
    pub percent_quota: u32,
}

pub struct SettingsView<'a> {
    pub user: &'a str,
    pub api_key: &'a str,
    pub owned_server: Option<&'a str>,
}

fn layout(title: &str, active: Nav, user: &str, body: &str, extra_scripts: &str) -> String {
    let nav: String = Nav::ALL
        .iter()
        .map(|item| {
            let class = if *item == active {
                "nav__link nav__link--active"
            } else {
                "nav__link"
            };
            format!(
                r#"<a class="{class}" href="{}">{}</a>"#,
                item.href(),
                item.label()
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title} · ModernAuth</title>
  <link rel="stylesheet" href="/static/css/dashboard.css">
</head>
<body>
  <header class="topbar">
    <nav class="nav">{nav}</nav>
    <span class="topbar__user">{user} · <a href="/logout">Log out</a></span>
  </header>
  <main class="content">
{body}
  </main>
  <div id="modal-overlay" class="modal-overlay hidden">
    <div class="modal">
      <button id="modal-close" class="modal__close" type="button">&times;</button>
      <h2 id="modal-title"></h2>
      <div id="modal-body"></div>
      <div class="modal-actions"></div>
    </div>
  </div>
{extra_scripts}  <script src="/static/js/dashboard.js"></script>
</body>
</html>
"#,
        title = text(title),
        user = text(user),
    )
}

#[must_use]
pub fn dashboard(view: &DashboardView<'_>) -> String {
    let badge = if view.premium_user {
        r#"<span class="badge badge--premium">Premium</span>"#
    } else {
        r#"<span class="badge">Free</span>"#
    };

    let server = match view.owned_server {
        Some(server) => format!(
            r#"<section class="card">
      <h2>Your server</h2>
      <p class="server-id">{}</p>
      <button id="removeServerBtn" class="btn btn--danger" type="button">Remove server</button>
    </section>"#,
            text(server)
        ),
        None => r#"<section class="card">
      <h2>Create a server</h2>
      <form id="createForm" data-url="/api/create_server">
        <input type="text" name="server_id" placeholder="my-server" required>
        <button class="btn btn--primary" type="submit">Create</button>
      </form>
    </section>"#
            .to_string(),
    };

    let body = format!(
        r#"    <h1>Welcome, {user} {badge}</h1>
    {server}
    <section class="card">
      <h2>API key</h2>
      <input type="text" readonly value="{api_key}">
    </section>"#,
        user = text(view.user),
        api_key = attr(view.api_key),
    );

    layout("Dashboard", Nav::Dashboard, view.user, &body, "")
}

#[must_use]
pub fn analytics(view: &AnalyticsView<'_>) -> String {
    let body = format!(
        r#"    <h1>Analytics</h1>
    <section class="stats">
      <div class="stat"><span class="stat__value">{percent_using}%</span><span class="stat__label">players on ModernAuth</span></div>
      <div class="stat"><span class="stat__value">{number_using}</span><span class="stat__label">ModernAuth players</span></div>
      <div class="stat"><span class="stat__value">{percent_quota}%</span><span class="stat__label">of quota used</span></div>
    </section>
    <section class="card">
      <canvas id="myChart"></canvas>
    </section>"#,
        percent_using = view.percent_using,
        number_using = view.number_using,
        percent_quota = view.percent_quota,
    );

    layout(
        "Analytics",
        Nav::Analytics,
        view.user,
        &body,
        "  <script src=\"https://cdn.jsdelivr.net/npm/chart.js\"></script>\n",
    )
}

#[must_use]
pub fn settings(view: &SettingsView<'_>) -> String {
    let server = match view.owned_server {
        Some(server) => format!(
            r#"<section class="card">
      <h2>Server access code</h2>
      <p>Issue a new access code for <strong>{}</strong>. The old code stops working immediately.</p>
      <button id="resetServerCodeBtn" class="btn btn--primary" type="button">Reset server code</button>
    </section>"#,
            text(server)
        ),
        None => String::new(),
    };

    let body = format!(
        r#"    <h1>Settings</h1>
    <section class="card">
      <h2>Dashboard access code</h2>
      <input type="text" readonly value="{api_key}">
      <button id="resetAccessCodeBtn" class="btn" type="button">Reset access code</button>
      <p id="accessCodeMsg"></p>
    </section>
    {server}"#,
        api_key = attr(view.api_key),
    );

    layout("Settings", Nav::Settings, view.user, &body, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_escapes_user_values() {
        let html = dashboard(&DashboardView {
            user: "<script>alert(1)</script>",
            api_key: "\"><b>",
            owned_server: Some("my-server"),
            premium_user: true,
        });

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("\"><b>"));
        assert!(html.contains("removeServerBtn"));
        assert!(html.contains("Premium"));
    }

    #[test]
    fn test_dashboard_without_server_shows_create_form() {
        let html = dashboard(&DashboardView {
            user: "alice",
            api_key: "k",
            owned_server: None,
            premium_user: false,
        });

        assert!(html.contains("createForm"));
        assert!(!html.contains("removeServerBtn"));
    }

    #[test]
    fn test_active_nav_item() {
        let html = settings(&SettingsView {
            user: "alice",
            api_key: "k",
            owned_server: None,
        });

        assert!(html.contains(r#"<a class="nav__link nav__link--active" href="/settings">"#));
        assert!(!html.contains("resetServerCodeBtn"));
    }
}
