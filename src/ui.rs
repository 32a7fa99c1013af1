use colored::*;

use ndertimi::models::{
    account::{Identity, Role},
    project::{MediaItem, Project, Status, WeeklyUpdate},
};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the glyph for a project's construction phase
pub fn get_status_glyph(project: &Project) -> ColoredString {
    if project.is_archived {
        return "▪".dimmed();
    }
    match project.status {
        Status::Planning => "○".normal(),
        Status::Foundation | Status::Structure => "◐".yellow(),
        Status::Finishing => "◕".blue(),
        Status::Completed => "●".green(),
    }
}

/// Render a single project line with id, glyph, name and right-aligned location
pub fn render_project_line(project: &Project) {
    let terminal_width = get_terminal_width();

    let left_section = format!("  {}  {}", get_status_glyph(project), project.name);
    let styled_left = if project.is_archived {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    let right_section = format!("{}  ·  {}", project.location, project.status);
    let left_visible_len = project.name.chars().count() + 5;
    let total_content = left_visible_len + right_section.chars().count();

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!(
            "{}{}{}",
            styled_left,
            " ".repeat(padding),
            right_section.dimmed()
        );
    } else {
        println!("{}", styled_left);
    }
    println!("     {}", format!("id {}", project.id).dimmed());
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let project_word = if count == 1 { "project" } else { "projects" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, project_word);
}

/// Render a section header (e.g., "Week 3")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

pub fn render_project_details(project: &Project) {
    println!("\n  {} {}", get_status_glyph(project), project.name.cyan().bold());
    println!("  {}  ·  {}", project.location, project.status);
    if project.is_archived {
        println!("  {}", "Archived".red());
    }
    if !project.description.is_empty() {
        println!("\n  {}", project.description);
    }
    println!("\n  {} {}", "Thumbnail:".dimmed(), format_media_url(&project.thumbnail));

    if project.updates.is_empty() {
        println!("\n  {}", "No weekly updates yet".dimmed());
        return;
    }

    for update in &project.updates {
        render_update(update);
    }
}

fn render_update(update: &WeeklyUpdate) {
    render_section_header(&format!("Week {} · {}", update.week_number, update.date));
    println!("  {}", format!("id {}", update.id).dimmed());
    if !update.description.is_empty() {
        println!("  {}", update.description);
    }
    for item in &update.media {
        render_media_line(item);
    }
}

fn render_media_line(item: &MediaItem) {
    println!(
        "    {} {} {}",
        format!("[{}]", item.kind).blue(),
        item.title.bold(),
        format_media_url(&item.url).dimmed()
    );
}

/// Embedded data is summarized instead of dumped to the terminal
pub fn format_media_url(url: &str) -> String {
    match url.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((header, payload)) => {
            let mime = header.split(';').next().unwrap_or("data");
            format!("<embedded {}, {} bytes>", mime, payload.len() * 3 / 4)
        }
        None => url.to_string(),
    }
}

pub fn render_identity(identity: &Identity) {
    let role = match identity.role {
        Role::Admin => identity.role.to_string().red().bold(),
        Role::Client => identity.role.to_string().green(),
    };
    println!("{} {} ({})", "Signed in as".dimmed(), identity.identifier.bold(), role);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_media_url_summarizes_data_urls() {
        assert_eq!(
            format_media_url("data:image/png;base64,AAAA"),
            "<embedded image/png, 3 bytes>"
        );
        assert_eq!(format_media_url("https://x.io/a.jpg"), "https://x.io/a.jpg");
    }
}
