// Card layout for GitHub issues, kept free of serenity types so it can be unit tested.
// The Discord layer turns `IssueCard` into a `CreateEmbed`.

use reqwest::Url;

use super::cards_models::{FetchedIssue, IssueData, IssueKind, IssueState, SearchData};

/// Cards posted directly in the channel; the rest overflow.
pub const INLINE_CARDS: usize = 1;
/// Cards shown by the "See all linked issues" button.
pub const OVERFLOW_BUTTON_CARDS: usize = 8;
/// Discord limit for select menu options.
pub const MAX_SELECT_OPTIONS: usize = 25;
/// Search hits rendered in one embed.
pub const SEARCH_RESULTS_SHOWN: usize = 10;

const BODY_PREVIEW_CHARS: usize = 300;
const OPTION_DESCRIPTION_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
}

/// Everything needed to render one issue embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCard {
    pub author_name: String,
    pub author_url: String,
    pub author_icon_url: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub colour: u32,
    pub footer: String,
    pub fields: Vec<CardField>,
}

pub fn format_issue(issue: &IssueData) -> IssueCard {
    let mut fields = Vec::new();

    let open_pull_request =
        issue.kind == IssueKind::PullRequest && issue.state == IssueState::Open;
    if let (Some(mergeable), true) = (&issue.mergeable_state, open_pull_request) {
        let value = if issue.is_draft == Some(true) {
            "Drafted".to_string()
        } else {
            capitalize(mergeable)
        };
        fields.push(CardField {
            name: "Merge Status".to_string(),
            value,
        });
    }

    if !issue.labels.is_empty() {
        fields.push(CardField {
            name: format!("Labels [{}]", issue.labels.len()),
            value: issue.labels.join(", "),
        });
    }

    if let Some(milestone) = issue.milestone.as_ref().filter(|m| !m.is_empty()) {
        fields.push(CardField {
            name: "Milestone".to_string(),
            value: milestone.clone(),
        });
    }

    IssueCard {
        author_name: issue.author_name.clone(),
        author_url: issue.author_url.clone(),
        author_icon_url: issue.author_avatar_url.clone(),
        title: format!("{} #{}", issue.title, issue.number),
        url: issue.url.clone(),
        description: issue.body_text.chars().take(BODY_PREVIEW_CHARS).collect(),
        colour: issue.state.colour(),
        footer: format!(
            "{} • Created on {}",
            issue.name_with_owner,
            issue.created_at.format("%d %b %Y, %H:%M")
        ),
        fields,
    }
}

/// A card that did not make it inline.
#[derive(Debug, Clone)]
pub struct OverflowEntry {
    pub link: String,
    pub option_label: String,
    pub option_description: String,
    pub card: IssueCard,
}

/// How a batch of fetched issues is split across the reply.
#[derive(Debug, Clone, Default)]
pub struct CardLayout {
    pub inline: Vec<IssueCard>,
    pub overflow: Vec<OverflowEntry>,
}

impl CardLayout {
    pub fn plan(fetched: &[FetchedIssue]) -> Self {
        let mut layout = CardLayout::default();

        for (index, fetched) in fetched.iter().enumerate() {
            let card = format_issue(&fetched.issue);
            if index < INLINE_CARDS {
                layout.inline.push(card);
                continue;
            }

            let issue = &fetched.issue;
            layout.overflow.push(OverflowEntry {
                link: overflow_link(issue),
                option_label: format!("{}#{}", fetched.prefix, issue.number),
                option_description: truncate_title(&issue.title),
                card,
            });
        }

        layout
    }

    /// Links to every overflowed issue, joined for a single embed.
    pub fn overflow_summary(&self) -> Option<String> {
        if self.overflow.is_empty() {
            return None;
        }
        Some(
            self.overflow
                .iter()
                .map(|entry| entry.link.as_str())
                .collect::<Vec<_>>()
                .join(" • "),
        )
    }
}

/// Split overflowed cards for the ephemeral "see all" reply: full cards first, links for the rest.
pub fn overflow_reply(entries: &[OverflowEntry]) -> (Vec<IssueCard>, Option<String>) {
    let cards = entries
        .iter()
        .take(OVERFLOW_BUTTON_CARDS)
        .map(|entry| entry.card.clone())
        .collect();

    let rest: Vec<&str> = entries
        .iter()
        .skip(OVERFLOW_BUTTON_CARDS)
        .map(|entry| entry.link.as_str())
        .collect();

    let links = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" • "))
    };
    (cards, links)
}

fn overflow_link(issue: &IssueData) -> String {
    format!("[{}#{}]({})", issue.name_with_owner, issue.number, issue.url)
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > OPTION_DESCRIPTION_CHARS {
        let head: String = title.chars().take(OPTION_DESCRIPTION_CHARS - 1).collect();
        format!("{head}\u{2026}")
    } else {
        title.to_string()
    }
}

fn capitalize(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rendered search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCard {
    pub description: String,
    pub footer: Option<String>,
}

pub fn format_search(search: &SearchData) -> SearchCard {
    if search.results.is_empty() {
        return SearchCard {
            description: "Nothing found.".to_string(),
            footer: None,
        };
    }

    let mut body = String::new();
    for entry in search.results.iter().take(SEARCH_RESULTS_SHOWN) {
        let mut state = match entry.state {
            IssueState::Open => "\u{1F7E2}",
            IssueState::Closed => "\u{1F534}",
            IssueState::Merged => "\u{1F7E3}",
        };
        if entry.state == IssueState::Open {
            if entry.is_draft == Some(true) {
                state = "\u{270F}\u{FE0F}";
            } else if entry.mergeable.as_deref() == Some("CONFLICTING") {
                state = "\u{26A0}\u{FE0F}";
            } else if entry.mergeable.as_deref() == Some("UNKNOWN") {
                state = "\u{2754}";
            }
        }

        body.push_str(&format!(
            "\n{state} - **{}** - **[#{}]({})**\n{}",
            entry.kind.label(),
            entry.number,
            entry.url,
            entry.title
        ));
    }

    let mut footer = None;
    if search.total > SEARCH_RESULTS_SHOWN as u64 {
        footer = Some(format!(
            "Showing the first {SEARCH_RESULTS_SHOWN} results, {} results in total.",
            search.total
        ));
        body.push_str(&format!(
            "\n\n[Click here for all the results]({})",
            search_url(&search.query)
        ));
    }

    SearchCard {
        description: body,
        footer,
    }
}

/// Link to the full search on github.com; the query is form-encoded.
pub fn search_url(query: &str) -> String {
    match Url::parse_with_params(
        "https://github.com/search",
        &[("type", "Issues"), ("q", query)],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => "https://github.com/search?type=Issues".to_string(),
    }
}
