use crate::model::{Hardware, Metric, Reading};
use crate::report::ReportSummary;

const STYLE: &str = "\
body { margin: 0; font-family: system-ui, sans-serif; background: #f4f6f8; color: #1c2733; }\n\
nav { background: #1c2733; padding: 0.75rem 1.5rem; }\n\
nav a { color: #cfd8e0; text-decoration: none; margin-right: 1.25rem; font-weight: 600; }\n\
nav a:hover { color: #ffffff; }\n\
main { max-width: 960px; margin: 0 auto; padding: 1.5rem; }\n\
h1 { font-size: 1.4rem; }\n\
table { width: 100%; border-collapse: collapse; background: #ffffff; }\n\
th, td { text-align: left; padding: 0.5rem 0.75rem; border-bottom: 1px solid #e3e8ee; }\n\
th { background: #eef2f6; }\n\
.cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1rem; }\n\
.card { background: #ffffff; border-radius: 8px; padding: 1rem; box-shadow: 0 1px 3px rgba(28,39,51,0.1); }\n\
.card h2 { margin: 0; font-size: 0.85rem; text-transform: uppercase; color: #5b6b7b; }\n\
.card .value { font-size: 2rem; margin: 0.25rem 0 0; font-weight: 700; }\n\
.card .unit { margin: 0; color: #8795a5; }\n\
.muted { color: #8795a5; }\n\
.pager { margin-top: 1rem; }\n\
.pager a { color: #0b61c4; text-decoration: none; }\n\
.button { display: inline-block; background: #0b61c4; color: #ffffff; padding: 0.6rem 1.2rem; border-radius: 6px; text-decoration: none; }\n";

const DASHBOARD_SCRIPT: &str = "\
const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';\n\
const ws = new WebSocket(scheme + location.host + '/ws');\n\
ws.onmessage = (msg) => {\n\
  const frame = JSON.parse(msg.data);\n\
  if (frame.event !== 'update_sensor_data' || !frame.data) return;\n\
  const reading = frame.data;\n\
  const sensors = reading.sensors || {};\n\
  for (const key of ['co2', 'pm25', 'temp', 'hum']) {\n\
    const el = document.getElementById(key);\n\
    if (el) el.textContent = sensors[key] == null ? '\\u2013' : sensors[key];\n\
  }\n\
  const actuators = reading.actuators || {};\n\
  document.getElementById('ventilation').textContent = actuators.ventilation || '\\u2013';\n\
  const analysis = reading.analysis || {};\n\
  document.getElementById('prediction').textContent = analysis.prediction || '\\u2013';\n\
  document.getElementById('last-update').textContent = reading.timestamp;\n\
};\n";

const REPORTS_BODY: &str = "\
<p>The summary report covers the trailing 24 hours: per-metric minimum, maximum\n\
and average, ventilation activations, pollution incidents and the derived\n\
health score.</p>\n\
<p><a class=\"button\" href=\"/generate_report\">Download PDF report</a></p>\n\
<p class=\"muted\">The download answers 404 while the window holds no readings.</p>\n";

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn frame(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} &middot; Air Monitor</title>\n<style>{style}</style>\n</head>\n\
         <body>\n<nav><a href=\"/\">Dashboard</a><a href=\"/hardware\">Hardware</a>\
         <a href=\"/logs\">Logs</a><a href=\"/reports\">Reports</a></nav>\n\
         <main>\n<h1>{title}</h1>\n{body}</main>\n</body>\n</html>\n",
        title = escape(title),
        style = STYLE,
        body = body,
    )
}

pub fn index() -> String {
    // Card ids double as the document keys the live-update script writes to.
    let mut cards = String::from("<section class=\"cards\">\n");
    for metric in Metric::ALL {
        cards.push_str(&format!(
            "<div class=\"card\"><h2>{name}</h2><p class=\"value\" id=\"{id}\">&ndash;</p>\
             <p class=\"unit\">{unit}</p></div>\n",
            name = metric_name(metric),
            id = metric.as_str(),
            unit = metric_unit(metric),
        ));
    }
    cards.push_str(
        "<div class=\"card\"><h2>Ventilation</h2><p class=\"value\" id=\"ventilation\">&ndash;</p></div>\n\
         <div class=\"card\"><h2>Air quality</h2><p class=\"value\" id=\"prediction\">&ndash;</p></div>\n\
         </section>\n",
    );

    let body = format!(
        "{cards}<p class=\"muted\">Last update: <span id=\"last-update\">never</span></p>\n\
         <script>{script}</script>\n",
        cards = cards,
        script = DASHBOARD_SCRIPT,
    );
    frame("Dashboard", &body)
}

pub fn hardware(hardwares: &[Hardware]) -> String {
    if hardwares.is_empty() {
        return frame("Hardware", "<p class=\"muted\">No hardware registered.</p>\n");
    }

    let mut rows = String::new();
    for hw in hardwares {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            hw.id,
            escape(hw.doc.name.as_deref().unwrap_or("–")),
            escape(hw.doc.kind.as_deref().unwrap_or("–")),
            escape(hw.doc.location.as_deref().unwrap_or("–")),
            escape(hw.doc.status.as_deref().unwrap_or("–")),
        ));
    }

    let body = format!(
        "<table>\n<thead><tr><th>#</th><th>Name</th><th>Type</th>\
         <th>Location</th><th>Status</th></tr></thead>\n<tbody>\n{rows}</tbody>\n</table>\n",
        rows = rows,
    );
    frame("Hardware", &body)
}

pub fn logs(readings: &[Reading], page: u32, total: i64, per_page: u32) -> String {
    let mut rows = String::new();
    for r in readings {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            fmt_value(r.sensor(Metric::Co2)),
            fmt_value(r.sensor(Metric::Pm25)),
            fmt_value(r.sensor(Metric::Temp)),
            fmt_value(r.sensor(Metric::Hum)),
            escape(r.ventilation_state().unwrap_or("–")),
            escape(r.prediction().unwrap_or("–")),
        ));
    }

    let last_page = if total == 0 {
        1
    } else {
        ((total + per_page as i64 - 1) / per_page as i64) as u32
    };

    let mut pager = String::new();
    if page > 1 {
        pager.push_str(&format!(
            "<a href=\"/logs?page={}\">&laquo; Newer</a> &nbsp; ",
            page - 1
        ));
    }
    pager.push_str(&format!(
        "Page {} of {} &mdash; {} readings",
        page, last_page, total
    ));
    if page < last_page {
        pager.push_str(&format!(
            " &nbsp; <a href=\"/logs?page={}\">Older &raquo;</a>",
            page + 1
        ));
    }

    let table = if readings.is_empty() {
        "<p class=\"muted\">No readings on this page.</p>\n".to_string()
    } else {
        format!(
            "<table>\n<thead><tr><th>Time (UTC)</th><th>CO2</th><th>PM2.5</th>\
             <th>Temp</th><th>Hum</th><th>Ventilation</th><th>Prediction</th></tr></thead>\n\
             <tbody>\n{rows}</tbody>\n</table>\n",
            rows = rows,
        )
    };

    let body = format!("{table}<p class=\"pager\">{pager}</p>\n", table = table, pager = pager);
    frame("Logs", &body)
}

pub fn reports() -> String {
    frame("Reports", REPORTS_BODY)
}

/// Self-contained document fed to the PDF converter; no nav, inline styles
/// only, so the converter needs nothing but this string.
pub fn report_document(summary: &ReportSummary) -> String {
    let mut stats_rows = String::new();
    for metric in Metric::ALL {
        let stats = summary.stats(metric);
        stats_rows.push_str(&format!(
            "<tr><td>{} ({})</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            metric_name(metric),
            metric_unit(metric),
            stats.min,
            stats.max,
            stats.avg,
        ));
    }

    let incidents_section = if summary.incidents.is_empty() {
        "<p>No pollution incidents in the window.</p>\n".to_string()
    } else {
        let mut rows = String::new();
        for incident in &summary.incidents {
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                incident.timestamp.format("%Y-%m-%d %H:%M:%S"),
                fmt_value(incident.sensor(Metric::Co2)),
                fmt_value(incident.sensor(Metric::Pm25)),
            ));
        }
        format!(
            "<table>\n<thead><tr><th>Time (UTC)</th><th>CO2 (ppm)</th>\
             <th>PM2.5 (&micro;g/m&sup3;)</th></tr></thead>\n<tbody>\n{rows}</tbody>\n</table>\n",
            rows = rows,
        )
    };

    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Air Quality Report</title>\n<style>{style}</style>\n</head>\n<body>\n\
         <h1>Air Quality Report</h1>\n\
         <p>Generated at {generated} &mdash; trailing 24 hours</p>\n\
         <h2>Health score: {score} / 100</h2>\n\
         <h2>Sensor statistics</h2>\n\
         <table>\n<thead><tr><th>Metric</th><th>Min</th><th>Max</th><th>Average</th></tr></thead>\n\
         <tbody>\n{stats_rows}</tbody>\n</table>\n\
         <p>Ventilation activations: {ventilation}</p>\n\
         <h2>Pollution incidents ({incidents_count})</h2>\n\
         {incidents}\
         </body>\n</html>\n",
        style = REPORT_STYLE,
        generated = summary.generated_at.format("%Y-%m-%d %H:%M:%S"),
        score = summary.health_score,
        stats_rows = stats_rows,
        ventilation = summary.ventilation_count,
        incidents_count = summary.incidents_count,
        incidents = incidents_section,
    )
}

const REPORT_STYLE: &str = "\
body { font-family: sans-serif; color: #1c2733; margin: 2rem; }\n\
h1 { font-size: 1.5rem; }\n\
h2 { font-size: 1.1rem; margin-top: 1.5rem; }\n\
table { width: 100%; border-collapse: collapse; margin-top: 0.5rem; }\n\
th, td { text-align: left; padding: 0.4rem 0.6rem; border: 1px solid #c6cdd5; }\n\
th { background: #eef2f6; }\n";

fn metric_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Co2 => "CO2",
        Metric::Pm25 => "PM2.5",
        Metric::Temp => "Temperature",
        Metric::Hum => "Humidity",
    }
}

fn metric_unit(metric: Metric) -> &'static str {
    match metric {
        Metric::Co2 => "ppm",
        Metric::Pm25 => "\u{b5}g/m\u{b3}",
        Metric::Temp => "\u{b0}C",
        Metric::Hum => "%",
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "–".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Analysis, HardwareDoc, Sensors};
    use crate::report::summarize;
    use crate::serialize::EVENT_SENSOR_UPDATE;
    use chrono::Utc;

    fn co2_reading(value: f64) -> Reading {
        Reading {
            id: 1,
            timestamp: Utc::now(),
            sensors: Some(Sensors {
                co2: Some(value),
                ..Default::default()
            }),
            actuators: None,
            analysis: Some(Analysis {
                prediction: Some("Polluted".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn dashboard_script_listens_for_the_update_event() {
        assert!(index().contains(EVENT_SENSOR_UPDATE));
        assert!(index().contains("/ws"));
    }

    #[test]
    fn dashboard_has_a_card_per_metric() {
        let html = index();
        for metric in Metric::ALL {
            assert!(html.contains(&format!("id=\"{}\"", metric.as_str())));
        }
    }

    #[test]
    fn logs_page_shows_paging_metadata() {
        let html = logs(&[co2_reading(640.0)], 3, 45, 20);
        assert!(html.contains("Page 3 of 3"));
        assert!(html.contains("45 readings"));
        assert!(html.contains("/logs?page=2"));
        assert!(!html.contains("/logs?page=4"));
    }

    #[test]
    fn empty_logs_page_renders_without_rows() {
        let html = logs(&[], 99, 45, 20);
        assert!(html.contains("No readings on this page."));
    }

    #[test]
    fn report_document_carries_score_and_incidents() {
        let readings = vec![co2_reading(900.0), co2_reading(1100.0)];
        let summary = summarize(&readings, Utc::now()).unwrap();
        let html = report_document(&summary);
        assert!(html.contains("Health score: 96 / 100"));
        assert!(html.contains("Pollution incidents (2)"));
        assert!(html.contains("900"));
    }

    #[test]
    fn hardware_rows_are_escaped() {
        let hardwares = vec![Hardware {
            id: 7,
            doc: HardwareDoc {
                name: Some("CO2 <sensor> & friends".to_string()),
                ..Default::default()
            },
        }];
        let html = hardware(&hardwares);
        assert!(html.contains("CO2 &lt;sensor&gt; &amp; friends"));
        assert!(!html.contains("<sensor>"));
    }
}
