//! Roster renderers
//!
//! Both renderers consume [`RosterPage`] rows: the HTML table for the admin
//! screen and CSV for the export.

use serde::Serialize;
use std::fmt::Write;
use wct_common::db::TalkSummary;
use wct_common::roster::{Applicant, RosterPage, StatusFacet};

use crate::pagination::calculate_pagination;

/// Listing parameters carried through facet and pagination links
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderby: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paged: Option<i64>,
}

impl ListingParams {
    fn href(&self) -> String {
        let query = serde_urlencoded::to_string(self).unwrap_or_default();
        if query.is_empty() {
            "/admin/applicants".to_string()
        } else {
            format!("/admin/applicants?{}", query)
        }
    }

    fn with_page(&self, page: i64) -> Self {
        Self {
            paged: Some(page),
            ..self.clone()
        }
    }

    fn with_facet(&self, facet: StatusFacet) -> Self {
        Self {
            status: Some(facet.as_str().to_string()),
            paged: None,
            ..self.clone()
        }
    }
}

const COLUMNS: [&str; 4] = ["Username", "Name", "Email", "Talk proposals"];

const FACETS: [(StatusFacet, &str); 4] = [
    (StatusFacet::All, "All"),
    (StatusFacet::MissingBio, "Missing biography"),
    (StatusFacet::Selected, "Selected"),
    (StatusFacet::NotSelected, "Not selected"),
];

/// Admin applicants screen
#[derive(Debug, Clone)]
pub struct HtmlTableRenderer {
    pub params: ListingParams,
    pub facet: StatusFacet,
    /// Present when the viewer may export
    pub export_href: Option<String>,
}

impl HtmlTableRenderer {
    pub fn render(&self, page: &RosterPage) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Applicants</title></head><body>\n");
        html.push_str("<div class=\"wrap\"><h1>Applicants</h1>\n");

        self.render_facets(&mut html);
        self.render_search(&mut html);
        self.render_tablenav(&mut html, page);

        html.push_str("<table class=\"widefat striped applicants\">\n<thead><tr>");
        for column in COLUMNS {
            let _ = write!(html, "<th scope=\"col\">{}</th>", column);
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        if page.applicants.is_empty() {
            let _ = writeln!(
                html,
                "<tr class=\"no-items\"><td colspan=\"{}\">No applicants found.</td></tr>",
                COLUMNS.len()
            );
        }
        for applicant in &page.applicants {
            render_row(&mut html, applicant);
        }
        html.push_str("</tbody>\n</table>\n");

        if let Some(href) = &self.export_href {
            let _ = writeln!(
                html,
                "<p><a class=\"button\" href=\"{}\">Export as CSV</a></p>",
                escape_html(href)
            );
        }

        html.push_str("</div>\n</body></html>\n");
        html
    }

    fn render_facets(&self, html: &mut String) {
        html.push_str("<ul class=\"subsubsub\">");
        for (facet, label) in FACETS {
            let class = if facet == self.facet { " class=\"current\"" } else { "" };
            let _ = write!(
                html,
                "<li><a href=\"{}\"{}>{}</a></li>",
                escape_html(&self.params.with_facet(facet).href()),
                class,
                label
            );
        }
        html.push_str("</ul>\n");
    }

    fn render_search(&self, html: &mut String) {
        let _ = writeln!(
            html,
            "<form method=\"get\" action=\"/admin/applicants\"><input type=\"hidden\" name=\"status\" value=\"{}\">\
             <input type=\"search\" name=\"s\" value=\"{}\"><button type=\"submit\">Search Applicants</button></form>",
            self.facet.as_str(),
            escape_html(self.params.s.as_deref().unwrap_or_default())
        );
    }

    fn render_tablenav(&self, html: &mut String, page: &RosterPage) {
        let p = calculate_pagination(page.total, page.page, page.page_size);

        html.push_str("<div class=\"tablenav\">");
        let _ = write!(
            html,
            "<span class=\"displaying-num\">{} {}</span>",
            page.total,
            if page.total == 1 { "item" } else { "items" }
        );
        if p.first_item > 0 {
            let _ = write!(
                html,
                " <span class=\"displaying-range\">{}&ndash;{}</span>",
                p.first_item, p.last_item
            );
        }
        if p.has_previous() {
            let _ = write!(
                html,
                " <a class=\"prev-page\" href=\"{}\">&lsaquo;</a>",
                escape_html(&self.params.with_page(p.page - 1).href())
            );
        }
        if p.total_pages > 0 {
            let _ = write!(
                html,
                " <span class=\"paging-input\">{} of {}</span>",
                p.page, p.total_pages
            );
        }
        if p.has_next() {
            let _ = write!(
                html,
                " <a class=\"next-page\" href=\"{}\">&rsaquo;</a>",
                escape_html(&self.params.with_page(p.page + 1).href())
            );
        }
        html.push_str("</div>\n");
    }
}

fn render_row(html: &mut String, applicant: &Applicant) {
    let email = escape_html(&applicant.email);
    let _ = write!(
        html,
        "<tr><td class=\"username\"><strong>{}</strong></td><td class=\"name\">{}</td>\
         <td class=\"email\"><a href=\"mailto:{}\">{}</a></td><td class=\"talks\">",
        escape_html(&applicant.login),
        escape_html(&applicant.display_name),
        email,
        email
    );
    if applicant.proposal_count > 0 {
        let _ = write!(
            html,
            "<a href=\"/api/talks?author={}\" class=\"edit\"><span aria-hidden=\"true\">{}</span>\
             <span class=\"screen-reader-text\">{} by this applicant</span></a>",
            applicant.id,
            applicant.proposal_count,
            proposal_label(applicant.proposal_count)
        );
    } else {
        html.push('0');
    }
    html.push_str("</td></tr>\n");
}

fn proposal_label(count: i64) -> String {
    if count == 1 {
        "1 talk proposal".to_string()
    } else {
        format!("{} talk proposals", count)
    }
}

/// CSV export of roster rows
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl CsvRenderer {
    pub fn header(&self) -> String {
        csv_line(&COLUMNS)
    }

    pub fn rows(&self, applicants: &[Applicant]) -> String {
        applicants
            .iter()
            .map(|a| {
                let count = a.proposal_count.to_string();
                csv_line(&[a.login.as_str(), a.display_name.as_str(), a.email.as_str(), count.as_str()])
            })
            .collect()
    }
}

const TALK_COLUMNS: [&str; 4] = ["Title", "Author", "Status", "Average rating"];

/// CSV export of the talk list
#[derive(Debug, Clone, Copy, Default)]
pub struct TalkCsvRenderer;

impl TalkCsvRenderer {
    pub fn header(&self) -> String {
        csv_line(&TALK_COLUMNS)
    }

    pub fn rows(&self, talks: &[TalkSummary]) -> String {
        talks
            .iter()
            .map(|t| {
                csv_line(&[
                    t.title.as_str(),
                    t.author_name.as_str(),
                    t.status_label(),
                    t.average_rate.as_deref().unwrap_or("0"),
                ])
            })
            .collect()
    }
}

fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|field| escape_csv(field))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// Quote a CSV field; values starting with a formula trigger get a leading `'`
pub fn escape_csv(field: &str) -> String {
    let neutralized = if field.starts_with(['=', '+', '-', '@']) {
        format!("'{}", field)
    } else {
        field.to_string()
    };
    format!("\"{}\"", neutralized.replace('"', "\"\""))
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
