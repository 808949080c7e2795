use crate::traits::RoundLog;
use crate::types::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use trend_core::{RoundEntry, RoundHeadlines, RoundSnapshot};

const FAILED_MARKER: &str = "==== failed ids ====";

/// One plain-text file per round under `{output_dir}/{day}/txt/{round_id}.txt`.
pub struct TextRoundLog {
    output_dir: PathBuf,
}

impl TextRoundLog {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn day_dir(&self, day: &str) -> PathBuf {
        self.output_dir.join(day).join("txt")
    }

    pub fn round_path(&self, day: &str, round_id: &str) -> PathBuf {
        self.day_dir(day).join(format!("{round_id}.txt"))
    }

    async fn read_round(path: &Path) -> RoundSnapshot {
        let round_id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        match tokio::fs::read_to_string(path).await {
            Ok(contents) => parse_round(&round_id, &contents),
            Err(e) => {
                warn!("Cannot read round file {}: {}", path.display(), e);
                RoundSnapshot::new(round_id)
            }
        }
    }
}

#[async_trait]
impl RoundLog for TextRoundLog {
    async fn append(&self, day: &str, snapshot: &RoundSnapshot) -> Result<()> {
        let dir = self.day_dir(day);
        tokio::fs::create_dir_all(&dir).await?;

        let path = self.round_path(day, &snapshot.round_id);
        tokio::fs::write(&path, format_round(snapshot)).await?;

        info!(
            "Saved round {} ({} titles) to {}",
            snapshot.round_id,
            snapshot.title_count(),
            path.display()
        );
        Ok(())
    }

    async fn load_day(&self, day: &str) -> Result<Vec<RoundSnapshot>> {
        let dir = self.day_dir(day);
        if !tokio::fs::try_exists(&dir).await? {
            debug!("No rounds recorded for {}", day);
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "txt") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut rounds = Vec::with_capacity(paths.len());
        for path in &paths {
            rounds.push(Self::read_round(path).await);
        }
        debug!("Loaded {} rounds for {}", rounds.len(), day);
        Ok(rounds)
    }

    fn backend(&self) -> &'static str {
        "text"
    }
}

/// Serialize a round. A title listed at several ranks gets one line per rank.
pub fn format_round(snapshot: &RoundSnapshot) -> String {
    let mut out = String::new();

    for (platform_id, titles) in snapshot.headlines.iter() {
        match snapshot.names.get(platform_id) {
            Some(name) if name != platform_id => out.push_str(&format!("{platform_id} | {name}\n")),
            _ => out.push_str(&format!("{platform_id}\n")),
        }

        let mut lines: Vec<(u32, &str, &RoundEntry)> = titles
            .iter()
            .flat_map(|(title, entry)| {
                let ranks = if entry.ranks.is_empty() { vec![1] } else { entry.ranks.clone() };
                ranks.into_iter().map(move |rank| (rank, title, entry))
            })
            .collect();
        lines.sort_by_key(|(rank, _, _)| *rank);

        for (rank, title, entry) in lines {
            out.push_str(&format!("{rank}. {title}"));
            if !entry.url.is_empty() {
                out.push_str(&format!(" [URL:{}]", entry.url));
            }
            if !entry.mobile_url.is_empty() {
                out.push_str(&format!(" [MOBILE:{}]", entry.mobile_url));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !snapshot.failed.is_empty() {
        out.push_str(FAILED_MARKER);
        out.push('\n');
        for id in &snapshot.failed {
            out.push_str(id);
            out.push('\n');
        }
    }

    out
}

/// Parse a round file. Malformed lines are skipped; a line without a rank
/// prefix is taken as rank 1.
pub fn parse_round(round_id: &str, contents: &str) -> RoundSnapshot {
    let mut snapshot = RoundSnapshot::new(round_id);
    let normalized = contents.replace("\r\n", "\n");

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().map(str::trim).filter(|line| !line.is_empty());
        let Some(header) = lines.next() else {
            continue;
        };

        if header == FAILED_MARKER {
            snapshot.failed.extend(lines.map(str::to_string));
            continue;
        }

        let (platform_id, name) = match header.split_once(" | ") {
            Some((id, name)) => (id.trim(), name.trim()),
            None => (header, header),
        };
        snapshot.names.insert(platform_id.to_string(), name.to_string());

        let titles = snapshot
            .headlines
            .get_or_insert_with(platform_id, RoundHeadlines::new);
        for line in lines {
            match parse_line(line) {
                Some((title, entry)) => match titles.get_mut(&title) {
                    Some(existing) => existing.ranks.extend(entry.ranks),
                    None => {
                        titles.insert(title, entry);
                    }
                },
                None => warn!("Skipping malformed line in round {}: {}", round_id, line),
            }
        }
    }

    snapshot
}

fn parse_line(line: &str) -> Option<(String, RoundEntry)> {
    let (rank, rest) = match line.split_once(". ") {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) => {
            (prefix.parse().ok()?, rest)
        }
        _ => (1, line),
    };

    let (rest, mobile_url) = split_tag(rest, " [MOBILE:");
    let (title, url) = split_tag(rest, " [URL:");
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    Some((title.to_string(), RoundEntry::ranked(rank).with_urls(url, mobile_url)))
}

/// Split a trailing ` [TAG:value]` off `text`.
fn split_tag<'a>(text: &'a str, tag: &str) -> (&'a str, &'a str) {
    if let Some(body) = text.strip_suffix(']') {
        if let Some((head, value)) = body.rsplit_once(tag) {
            return (head, value);
        }
    }
    (text, "")
}
