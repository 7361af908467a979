use crate::company::{CompanyVehicleBoard, VehicleSource};
use crate::models::{Company, Record};
use crate::navigation::Section;
use crate::routes::RouteBoard;
use crate::stats::{BucketTable, UNSPECIFIED};
use crate::views::{DriverBoard, VehicleBoard, ViewState};
use std::fmt::Write;

pub fn render_home(companies: &[Company], selected: Option<&str>, warning: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str(
        "<header><h1>Streamline Your Fleet Operations with FleetX</h1>\
         <p class=\"subtitle\">Real-time drivers, vehicles, routes and dispatch, grouped by company.</p></header>",
    );
    if let Some(warning) = warning {
        let _ = write!(body, "<p class=\"warning\" role=\"alert\">{}</p>", escape(warning));
    }
    body.push_str("<form class=\"card\" method=\"get\" action=\"/navigate\">");
    body.push_str("<label for=\"company\">Select Company:</label> <select id=\"company\" name=\"company\">");
    body.push_str("<option value=\"\">-- Select a Company --</option>");
    for company in companies {
        let chosen = if selected == Some(company.id.as_str()) { " selected" } else { "" };
        let _ = write!(
            body,
            "<option value=\"{}\"{chosen}>{}</option>",
            escape(&company.id),
            escape(company.display_name())
        );
    }
    body.push_str("</select><div class=\"sections\">");
    for section in Section::ALL {
        let _ = write!(
            body,
            "<button type=\"submit\" name=\"section\" value=\"{}\">{}</button>",
            section.slug(),
            section.title()
        );
    }
    body.push_str("</div></form>");
    page("FleetX", &body)
}

pub fn render_drivers(state: &ViewState<DriverBoard>) -> String {
    let mut body = String::from("<h1>Driver Dashboard</h1>");
    if let Some(notice) = status_notice(state, state.data.drivers.is_empty(), "No drivers found.") {
        body.push_str(&notice);
        return page("Driver Dashboard", &body);
    }
    let board = &state.data;
    let _ = write!(
        body,
        "<section class=\"card\"><h2>Driver Statistics</h2>\
         <p><strong>Total Drivers:</strong> {}</p>\
         <p><strong>Available Drivers:</strong> {}</p>\
         <p><strong>Unavailable Drivers:</strong> {}</p></section>",
        board.stats.total, board.stats.available, board.stats.unavailable
    );
    body.push_str(&chart("Driver Availability", &board.availability));
    body.push_str(&chart("Drivers by Name Initial", &board.initials));
    body.push_str("<section class=\"card\"><h2>Drivers List</h2><ul>");
    for driver in &board.drivers {
        let available = driver.flag("isAvailable");
        body.push_str("<li>");
        if let Some(image) = driver.text("imagePath") {
            let _ = write!(
                body,
                "<img src=\"{}\" alt=\"Driver {}\" width=\"60\" height=\"60\">",
                escape(&image),
                escape(&text_or(driver, "name", ""))
            );
        }
        let _ = write!(
            body,
            "<p><strong>Name:</strong> {}</p><p><strong>Contact:</strong> {}</p>\
             <p><strong>License:</strong> {}</p><p class=\"{}\"><strong>Status:</strong> {}</p></li>",
            escape(&text_or(driver, "name", "N/A")),
            escape(&text_or(driver, "contactNumber", "N/A")),
            escape(&text_or(driver, "licenseNumber", "N/A")),
            if available { "ok" } else { "off" },
            if available { "Available" } else { "Unavailable" }
        );
    }
    body.push_str("</ul></section>");
    page("Driver Dashboard", &body)
}

pub fn render_vehicles(state: &ViewState<VehicleBoard>) -> String {
    let mut body = String::from("<h1>Vehicle Dashboard</h1>");
    if let Some(notice) = status_notice(state, state.data.vehicles.is_empty(), "No vehicles found.") {
        body.push_str(&notice);
        return page("Vehicle Dashboard", &body);
    }
    let board = &state.data;
    let _ = write!(
        body,
        "<section class=\"card\"><h2>Vehicle Statistics</h2>\
         <p><strong>Total Vehicles:</strong> {}</p>\
         <p><strong>Vehicle Types:</strong> {}</p>\
         <p><strong>Users with Vehicles:</strong> {}</p></section>",
        board.stats.total, board.stats.type_count, board.stats.owner_count
    );
    body.push_str(&chart("Vehicle Types", &board.types));
    body.push_str(&chart("Vehicles by User", &board.owners));
    body.push_str(&vehicle_list(&board.vehicles, true));
    page("Vehicle Dashboard", &body)
}

pub fn render_company_vehicles(state: &ViewState<CompanyVehicleBoard>) -> String {
    let board = &state.data;
    let heading = match &board.company {
        Some(company) => format!("{} Vehicle Dashboard", company.display_name()),
        None => "Company Vehicle Dashboard".to_string(),
    };
    let mut body = format!("<h1>{}</h1>", escape(&heading));
    let empty = "No vehicles found for this company.";
    if let Some(notice) = status_notice(state, board.vehicles.is_empty(), empty) {
        body.push_str(&notice);
        return page(&heading, &body);
    }
    let company_name = board
        .company
        .as_ref()
        .map_or("Unknown", |company| company.name.as_deref().unwrap_or("N/A"));
    let source = match board.source {
        VehicleSource::Direct => "company path",
        VehicleSource::Fallback => "fleet-wide scan",
        VehicleSource::None => "none",
    };
    let _ = write!(
        body,
        "<section class=\"card\"><h2>Vehicle Statistics</h2>\
         <p><strong>Company ID:</strong> {}</p>\
         <p><strong>Company Name:</strong> {}</p>\
         <p><strong>Total Vehicles:</strong> {}</p>\
         <p><strong>Vehicle Types:</strong> {}</p>\
         <p class=\"muted\">Source: {source}</p></section>",
        escape(&board.company_id),
        escape(company_name),
        board.stats.total,
        board.stats.type_count
    );
    body.push_str(&chart("Vehicle Types", &board.types));
    body.push_str(&vehicle_list(&board.vehicles, false));
    page(&heading, &body)
}

pub fn render_routes(title: &str, state: &ViewState<RouteBoard>) -> String {
    let mut body = format!("<h1>{}</h1>", escape(title));
    if let Some(notice) = status_notice(state, state.data.routes.is_empty(), "No routes found.") {
        body.push_str(&notice);
        return page(title, &body);
    }
    body.push_str("<ul>");
    for route in &state.data.routes {
        let _ = write!(
            body,
            "<li class=\"card route\"><h2>{}</h2><span class=\"tag\">FleetX</span>\
             <p>Vehicle: <strong>{}</strong></p><ol>",
            escape(route.route_name.as_deref().unwrap_or("Unnamed route")),
            escape(route.vehicle_id.as_deref().unwrap_or("N/A"))
        );
        for node in &route.nodes {
            let _ = write!(
                body,
                "<li><p>{} ({})</p><p class=\"muted\">Lat: {}, Lng: {}</p></li>",
                escape(node.nature.as_deref().unwrap_or("stop")),
                escape(node.kind.as_deref().unwrap_or(UNSPECIFIED)),
                node.latitude.map_or_else(|| "?".to_string(), |lat| lat.to_string()),
                node.longitude.map_or_else(|| "?".to_string(), |lng| lng.to_string())
            );
        }
        body.push_str("</ol></li>");
    }
    body.push_str("</ul>");
    page(title, &body)
}

fn status_notice<T>(state: &ViewState<T>, empty: bool, empty_message: &str) -> Option<String> {
    if state.loading {
        return Some("<p class=\"muted\">Loading dashboard data...</p>".to_string());
    }
    if let Some(error) = &state.error {
        return Some(format!("<p class=\"warning\" role=\"alert\">{}</p>", escape(error)));
    }
    empty.then(|| format!("<p>{}</p>", escape(empty_message)))
}

fn vehicle_list(vehicles: &[Record], show_owner: bool) -> String {
    let mut html = String::from("<section class=\"card\"><h2>Vehicles List</h2><ul>");
    for vehicle in vehicles {
        let _ = write!(
            html,
            "<li><p><strong>Name:</strong> {}</p><p><strong>Number:</strong> {}</p>\
             <p><strong>Type:</strong> {}</p>",
            escape(&text_or(vehicle, "name", "N/A")),
            escape(&text_or(vehicle, "number", "N/A")),
            escape(&text_or(vehicle, "type", UNSPECIFIED))
        );
        if let Some(driver) = vehicle.text("driverName") {
            let _ = write!(html, "<p><strong>Driver:</strong> {}</p>", escape(&driver));
        }
        if let Some(status) = vehicle.text("status") {
            let _ = write!(html, "<p><strong>Status:</strong> {}</p>", escape(&status));
        }
        if show_owner {
            if let Some(owner) = &vehicle.owner_id {
                let _ = write!(html, "<p class=\"muted\">User ID: {}</p>", escape(owner));
            }
        }
        html.push_str("</li>");
    }
    html.push_str("</ul></section>");
    html
}

fn chart(title: &str, table: &BucketTable) -> String {
    let mut html = format!("<section class=\"card\"><h2>{}</h2>", escape(title));
    let total = table.total();
    if total == 0 {
        html.push_str("<p class=\"muted\">No data available</p></section>");
        return html;
    }
    let peak = table.iter().map(|bucket| bucket.count).max().unwrap_or(1).max(1);
    for bucket in table.iter() {
        let width = bucket.count * 100 / peak;
        let share = (bucket.count as f64 / total as f64 * 100.0).round();
        let _ = write!(
            html,
            "<div class=\"bar\"><span>{}</span><div style=\"width:{width}%\"></div><em>{} ({share}%)</em></div>",
            escape(&bucket.label),
            bucket.count
        );
    }
    html.push_str("</section>");
    html
}

fn text_or(record: &Record, field: &str, fallback: &str) -> String {
    record.text(field).unwrap_or_else(|| fallback.to_string())
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{BODY}}", body)
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg: #111827;
      --ink: #e5e7eb;
      --muted: #9ca3af;
      --accent: #60a5fa;
      --ok: #4ade80;
      --off: #f87171;
      --card: rgba(31, 41, 55, 0.85);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    main {
      width: min(960px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 20px;
    }

    nav a {
      color: var(--accent);
      text-decoration: none;
    }

    .card {
      background: var(--card);
      border: 1px solid #374151;
      border-radius: 14px;
      padding: 18px 22px;
    }

    .sections {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 12px;
      margin-top: 16px;
    }

    button {
      background: #1f2937;
      color: var(--ink);
      border: 1px solid #374151;
      border-radius: 10px;
      padding: 14px;
      font-size: 1rem;
      cursor: pointer;
    }

    button:hover {
      border-color: var(--accent);
    }

    ul, ol {
      list-style: none;
      padding: 0;
      display: grid;
      gap: 10px;
    }

    .bar {
      display: grid;
      grid-template-columns: 120px 1fr 110px;
      align-items: center;
      gap: 10px;
      margin: 6px 0;
    }

    .bar div {
      height: 14px;
      border-radius: 7px;
      background: var(--accent);
    }

    .tag {
      font-size: 0.8rem;
      color: var(--muted);
    }

    .muted {
      color: var(--muted);
    }

    .ok {
      color: var(--ok);
    }

    .off {
      color: var(--off);
    }

    .warning {
      background: #78350f;
      border-radius: 10px;
      padding: 12px 16px;
    }
  </style>
</head>
<body>
  <main>
    <nav><a href="/">FleetX</a></nav>
    {{BODY}}
  </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escape_covers_markup() {
        assert_eq!(escape("<a href=\"x\">&'</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn home_lists_companies_and_warning() {
        let companies = vec![Company {
            id: "c1".to_string(),
            name: Some("Acme <Freight>".to_string()),
        }];
        let html = render_home(&companies, Some("c1"), Some("pick one"));
        assert!(html.contains("<option value=\"c1\" selected>Acme &lt;Freight&gt;</option>"));
        assert!(html.contains("pick one"));
        assert!(html.contains("value=\"dispatch-management\""));
    }

    #[test]
    fn driver_page_shows_loading_then_list() {
        let loading = ViewState::loading(DriverBoard::default());
        assert!(render_drivers(&loading).contains("Loading dashboard data..."));

        let snapshot = json!({ "L1": { "name": "Ada", "isAvailable": true } });
        let ready = ViewState::ready(DriverBoard::from_snapshot(Some(&snapshot)));
        let html = render_drivers(&ready);
        assert!(html.contains("<strong>Total Drivers:</strong> 1"));
        assert!(html.contains("Ada"));
    }

    #[test]
    fn failed_view_renders_error() {
        let mut state = ViewState::ready(RouteBoard::empty("c1"));
        state.fail("Failed to fetch routes.");
        assert!(render_routes("Active Routes", &state).contains("Failed to fetch routes."));
    }
}
