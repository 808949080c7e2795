/// Text processing utilities
pub mod text {
    /// Collapse every run of whitespace (newlines included) to one space and trim.
    pub fn clean_title(title: &str) -> String {
        title.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Escape the five HTML special characters.
    pub fn html_escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#x27;"),
                _ => escaped.push(c),
            }
        }
        escaped
    }

    /// Cut `text` to at most `max_bytes` UTF-8 bytes without splitting a character.
    pub fn truncate_bytes(text: &str, max_bytes: usize) -> &str {
        if text.len() <= max_bytes {
            return text;
        }
        let mut end = max_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Whether `url_str` parses and uses http or https.
    pub fn is_http_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, FixedOffset, Offset, Utc};

    const BEIJING_OFFSET_SECONDS: i32 = 8 * 3600;

    pub fn beijing_offset() -> FixedOffset {
        // 8h is always within the valid offset range
        FixedOffset::east_opt(BEIJING_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
    }

    /// Current wall-clock time in Beijing.
    pub fn beijing_now() -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&beijing_offset())
    }

    /// Day folder label, e.g. `2025-10-08`.
    pub fn day_label(at: &DateTime<FixedOffset>) -> String {
        at.format("%Y-%m-%d").to_string()
    }

    /// Round identifier, e.g. `13-45`. Sorts chronologically within a day.
    pub fn round_label(at: &DateTime<FixedOffset>) -> String {
        at.format("%H-%M").to_string()
    }

    pub fn timestamp_label(at: &DateTime<FixedOffset>) -> String {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// `first` when both ends are equal, `first ~ last` otherwise, empty when unknown.
    pub fn time_display(first_seen: &str, last_seen: &str) -> String {
        match (first_seen.is_empty(), last_seen.is_empty()) {
            (false, false) if first_seen == last_seen => first_seen.to_string(),
            (false, false) => format!("{first_seen} ~ {last_seen}"),
            _ => String::new(),
        }
    }
}
