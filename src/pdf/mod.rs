// Certificate and schedule PDF generation.
// Uses genpdf - requires Liberation or similar fonts in standard paths.
use std::path::Path;

use chrono::Utc;
use genpdf::Element;

use crate::db::models::certificate::CertificateType;
use crate::db::models::session::ScheduleEntry;

fn load_font_family() -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, String> {
    let font_paths = [
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/System/Library/Fonts/Supplemental",
        "/Library/Fonts",
    ];

    font_paths
        .iter()
        .find(|p| Path::new(p).exists())
        .and_then(|path| {
            ["LiberationSans", "DejaVuSans", "Arial"]
                .iter()
                .find_map(|name| genpdf::fonts::from_files(*path, name, None).ok())
        })
        .ok_or_else(|| "No suitable fonts found. Install: apt install fonts-liberation".to_string())
}

fn certificate_line(certificate_type: CertificateType, conference_title: &str) -> String {
    match certificate_type {
        CertificateType::Author => {
            format!("presented an accepted paper at {conference_title}")
        }
        CertificateType::Participant => {
            format!("attended {conference_title} as a registered participant")
        }
        CertificateType::Reviewer => {
            format!("served on the review committee of {conference_title}")
        }
    }
}

pub fn generate_certificate(
    recipient_name: &str,
    conference_title: &str,
    certificate_type: CertificateType,
    output_path: &Path,
) -> Result<(), String> {
    let font_family = load_font_family()?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title("Certificate");

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let title_style = genpdf::style::Style::new().with_font_size(24);
    doc.push(genpdf::elements::Paragraph::new("Certificate").styled(title_style));
    doc.push(genpdf::elements::Break::new(0.5));

    doc.push(genpdf::elements::Paragraph::new(
        "This is to certify that",
    ));
    let name_style = genpdf::style::Style::new().with_font_size(18);
    doc.push(genpdf::elements::Paragraph::new(recipient_name).styled(name_style));
    doc.push(genpdf::elements::Paragraph::new(certificate_line(
        certificate_type,
        conference_title,
    )));
    doc.push(genpdf::elements::Break::new(0.5));

    let date = Utc::now().format("%B %d, %Y").to_string();
    let id = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    doc.push(genpdf::elements::Paragraph::new(format!("Date: {}", date)));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Certificate ID: {}",
        id
    )));

    doc.render_to_file(output_path).map_err(|e| e.to_string())
}

/// Renders the conference program from the flattened schedule rows,
/// one block per session followed by its assigned papers.
pub fn generate_schedule(
    conference_title: &str,
    entries: &[ScheduleEntry],
    output_path: &Path,
) -> Result<(), String> {
    let font_family = load_font_family()?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title("Conference Schedule");

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let title_style = genpdf::style::Style::new().with_font_size(24);
    doc.push(
        genpdf::elements::Paragraph::new(format!("{conference_title} - Schedule"))
            .styled(title_style),
    );
    doc.push(genpdf::elements::Break::new(1.0));

    let session_style = genpdf::style::Style::new().with_font_size(16);
    let mut current_session: Option<i64> = None;
    for entry in entries {
        if current_session != Some(entry.session_id) {
            current_session = Some(entry.session_id);
            doc.push(genpdf::elements::Break::new(0.5));
            doc.push(
                genpdf::elements::Paragraph::new(&entry.session_name).styled(session_style),
            );
            let when = entry
                .schedule_time
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "Time TBD".to_string());
            let mut detail = when;
            if let Some(location) = &entry.location {
                detail.push_str(&format!(" | {location}"));
            }
            if let Some(track) = &entry.track_name {
                detail.push_str(&format!(" | Track: {track}"));
            }
            doc.push(genpdf::elements::Paragraph::new(detail));
            if let Some(chair) = &entry.chair_name {
                doc.push(genpdf::elements::Paragraph::new(format!("Chair: {chair}")));
            }
        }

        if let Some(title) = &entry.paper_title {
            let presenter = entry.presenter_name.as_deref().unwrap_or("TBD");
            doc.push(genpdf::elements::Paragraph::new(format!(
                "  - {title} (presented by {presenter})"
            )));
        }
    }

    if entries.is_empty() {
        doc.push(genpdf::elements::Paragraph::new(
            "No sessions have been scheduled yet.",
        ));
    }

    doc.render_to_file(output_path).map_err(|e| e.to_string())
}
