//! Turns a parsed reply into markdown, a styled [`Html`] page and a
//! [`Document`].

use crate::{
    docx::Document,
    html::{self, Html},
    idea::{AppIdea, Object, Palette},
    theme::Theme,
    whois::DomainStatus,
};

/// Separator between features in markdown.
pub const FEATURE_SEPARATOR: &str = " 🌟 ";

/// Section headings shared by the markdown and the document, in order.
const SECTIONS: [&str; 7] = [
    "Description 📄",
    "Problem 🛠️",
    "Solution 💡",
    "Features 🌟",
    "Business Model 💼",
    "Competition 🏆",
    "Competitive Advantage 🎯",
];

fn section_bodies(idea: &AppIdea) -> [String; 7] {
    [
        idea.description.clone(),
        idea.problem.clone(),
        idea.solution.clone(),
        idea.features.join(FEATURE_SEPARATOR),
        idea.business_model.clone(),
        idea.competition.clone(),
        idea.competitive_advantage.clone(),
    ]
}

/// Markdown for an idea.
pub fn markdown(idea: &AppIdea, status: DomainStatus) -> String {
    let mut out = format!(
        "# {} {}\n\n**{}**\n\n{}\n",
        idea.name, idea.emoji, idea.tagline, status
    );
    for (heading, body) in SECTIONS.iter().zip(section_bodies(idea)) {
        out.push_str(&format!("\n### {heading}\n{body}\n"));
    }
    out
}

/// Document for an idea. Features get one paragraph each.
pub fn document(idea: &AppIdea, status: DomainStatus) -> Document {
    let mut doc = Document::new();
    doc.heading(idea.name.as_str(), 0)
        .paragraph(idea.tagline.as_str())
        .paragraph(status.to_string());

    for (heading, body) in SECTIONS.iter().zip(section_bodies(idea)) {
        doc.heading(*heading, 1);
        if *heading == SECTIONS[3] {
            for feature in &idea.features {
                doc.paragraph(format!("• {feature}"));
            }
        } else {
            doc.paragraph(body);
        }
    }
    doc
}

/// Download name for an idea's document.
pub fn filename(idea: &AppIdea) -> String {
    format!("{}.docx", idea.name)
}

/// Styled page for an idea, with the download `link` below the content.
pub fn idea_page(idea: &AppIdea, markdown: &str, link: Option<&str>) -> Html {
    let mut body = Html::from_markdown(markdown);
    if let Some(link) = link {
        body.push_raw("<p>");
        body.push_raw(link);
        body.push_raw("</p>\n");
    }
    html::page(&idea.name, &idea.background_color, &body)
}

/// Success line followed by the reply as pretty JSON.
pub fn palette_summary(palette: &Palette, raw: &Object) -> String {
    let json = serde_json::to_string_pretty(raw)
        .unwrap_or_else(|_| format!("{:?}", raw));
    format!(
        "Primary color updated to: {}\n\n{}\n",
        palette.primary_color, json
    )
}

/// Styled page for a palette reply using the written `theme`.
pub fn palette_page(palette: &Palette, raw: &Object, theme: &Theme) -> Html {
    let title = raw
        .get("Name")
        .and_then(|name| name.as_str())
        .unwrap_or("Generated palette");
    let json = serde_json::to_string_pretty(raw)
        .unwrap_or_else(|_| format!("{:?}", raw));
    let body = Html::from_markdown(&format!(
        "Primary color updated to: `{}`\n\n```json\n{}\n```\n",
        palette.primary_color, json
    ));
    let background = theme
        .background_color
        .as_deref()
        .unwrap_or(&palette.primary_color);
    html::page(title, background, &body)
}
