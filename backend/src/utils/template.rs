//! Message template personalization.

/// Substitute the `{firstName}`, `{lastName}` and `{city}` tokens.
pub fn render(template: &str, first_name: &str, last_name: &str, city: &str) -> String {
    template
        .replace("{firstName}", first_name)
        .replace("{lastName}", last_name)
        .replace("{city}", city)
}

/// Append the opt-out footer on its own line.
pub fn with_footer(body: &str, footer: &str) -> String {
    format!("{}\n{}", body, footer)
}
