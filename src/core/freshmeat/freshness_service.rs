// Freshmeat - lists the members who joined a guild recently.
//
// The Discord layer snapshots the member list; everything here is pure filtering and formatting.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub const DEFAULT_HOURS: i64 = 24;
pub const MIN_HOURS: i64 = 1;
pub const MAX_HOURS: i64 = 300;

/// Maximum characters in one embed page.
pub const PAGE_LENGTH: usize = 1000;

/// Rejections shown to the caller verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FreshnessError {
    #[error("Consider putting hours above 0. Since that helps with searching for members. ;)")]
    WindowTooSmall,
    #[error("Please use something less then 300 hours.")]
    WindowTooLarge,
}

/// Member snapshot, independent of serenity types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildMember {
    pub display_name: String,
    pub user_id: u64,
    pub joined_at: DateTime<Utc>,
}

/// Check the requested hour window and turn it into a duration.
pub fn validate_hours(hours: i64) -> Result<Duration, FreshnessError> {
    if hours < MIN_HOURS {
        return Err(FreshnessError::WindowTooSmall);
    }
    if hours > MAX_HOURS {
        return Err(FreshnessError::WindowTooLarge);
    }
    Ok(Duration::hours(hours))
}

/// Members who joined within `hours` of `now`, newest first.
pub fn fresh_members(
    members: impl IntoIterator<Item = GuildMember>,
    now: DateTime<Utc>,
    hours: i64,
) -> Result<Vec<GuildMember>, FreshnessError> {
    let cutoff = now - validate_hours(hours)?;

    let mut fresh: Vec<GuildMember> = members
        .into_iter()
        .filter(|member| member.joined_at > cutoff)
        .collect();
    fresh.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
    Ok(fresh)
}

/// Render members as `name (id)` lines packed into pages of at most `PAGE_LENGTH` chars.
pub fn render_pages(members: &[GuildMember]) -> Vec<String> {
    let lines = members
        .iter()
        .map(|m| format!("{} ({})", escape_markdown(&m.display_name), m.user_id));
    paginate_lines(lines, PAGE_LENGTH)
}

/// Pack lines into pages without splitting a line unless it alone exceeds the limit.
pub fn paginate_lines(lines: impl IntoIterator<Item = String>, page_length: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in lines {
        let mut line = line;
        let mut line_len = line.chars().count();

        // Oversized lines get hard-cut into their own pages
        while line_len > page_length {
            if !current.is_empty() {
                pages.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let head: String = line.chars().take(page_length).collect();
            line = line.chars().skip(page_length).collect();
            line_len -= page_length;
            pages.push(head);
        }

        let needed = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + needed > page_length {
            pages.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        pages.push(current);
    }
    pages
}

/// Escape Discord markdown so display names render literally.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '~' | '`' | '|' | '>') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
