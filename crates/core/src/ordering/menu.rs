use crate::domain::menu::MenuItem;
use crate::ordering::pricing::format_amount;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MenuResolution {
    Resolved(MenuItem),
    Ambiguous { query: String, candidates: Vec<String> },
    NotFound { query: String },
}

impl MenuResolution {
    /// Clarifying text for the customer when the query did not pin down one item.
    pub fn clarification(&self) -> Option<String> {
        match self {
            Self::Resolved(_) => None,
            Self::Ambiguous { query, candidates } => Some(format!(
                "Multiple items found matching '{query}'. Please be more specific: {}",
                candidates.join(", ")
            )),
            Self::NotFound { query } => Some(format!("Item '{query}' not found on the menu.")),
        }
    }
}

/// Resolves free text against a menu: exact name first, then a unique
/// substring. Both comparisons ignore case. Several substring hits are
/// reported back instead of guessing. Unavailable items never match.
pub fn resolve(menu: &[MenuItem], query: &str) -> MenuResolution {
    let query = query.trim();
    if query.is_empty() {
        return MenuResolution::NotFound { query: String::new() };
    }

    let needle = query.to_lowercase();
    let available = || menu.iter().filter(|item| item.available);

    if let Some(exact) = available().find(|item| item.name.to_lowercase() == needle) {
        return MenuResolution::Resolved(exact.clone());
    }

    let mut matches: Vec<&MenuItem> =
        available().filter(|item| item.name.to_lowercase().contains(&needle)).collect();

    match matches.len() {
        0 => MenuResolution::NotFound { query: query.to_string() },
        1 => MenuResolution::Resolved(matches.remove(0).clone()),
        _ => MenuResolution::Ambiguous {
            query: query.to_string(),
            candidates: matches.iter().map(|item| item.name.clone()).collect(),
        },
    }
}

pub fn render_menu(menu: &[MenuItem]) -> String {
    let mut lines = menu.iter().filter(|item| item.available).peekable();
    if lines.peek().is_none() {
        return "The menu is currently empty.".to_string();
    }

    let mut rendered = String::from("Welcome to our menu!\n\n");
    for item in lines {
        rendered.push_str(&format!("- {}: {}", item.name, format_amount(item.price)));
        if let Some(description) = item.description.as_deref().filter(|d| !d.trim().is_empty()) {
            rendered.push_str(&format!(" ({description})"));
        }
        rendered.push('\n');
    }
    rendered
}
