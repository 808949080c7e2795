use crate::defs::RuleGroup;

/// Keyword rules with every term lowercased once up front.
///
/// Matching is case-insensitive substring search. Filter terms reject a
/// title outright; otherwise the first group whose required terms are all
/// present and whose normal terms have at least one hit wins.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    groups: Vec<CompiledGroup>,
    filters: Vec<String>,
}

#[derive(Debug, Clone)]
struct CompiledGroup {
    source: RuleGroup,
    required: Vec<String>,
    normal: Vec<String>,
}

impl CompiledGroup {
    fn accepts(&self, title_lower: &str) -> bool {
        if self.required.is_empty() && self.normal.is_empty() {
            return false;
        }
        let required_ok = self.required.iter().all(|term| title_lower.contains(term.as_str()));
        let normal_ok =
            self.normal.is_empty() || self.normal.iter().any(|term| title_lower.contains(term.as_str()));
        required_ok && normal_ok
    }
}

impl KeywordMatcher {
    pub fn new(groups: &[RuleGroup], filters: &[String]) -> Self {
        let groups = groups
            .iter()
            .map(|group| CompiledGroup {
                source: group.clone(),
                required: lowercase_terms(&group.required),
                normal: lowercase_terms(&group.normal),
            })
            .collect();

        Self {
            groups,
            filters: lowercase_terms(filters),
        }
    }

    /// Matcher that accepts every title and ignores filters.
    pub fn show_all() -> Self {
        Self {
            groups: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn is_show_all(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches(&self, title: &str) -> bool {
        if self.is_show_all() {
            return true;
        }
        self.matching_group(title).is_some()
    }

    /// The first rule group that accepts `title`, if any.
    ///
    /// Always `None` in show-all mode; use [`KeywordMatcher::matches`] there.
    pub fn matching_group(&self, title: &str) -> Option<&RuleGroup> {
        let title_lower = title.to_lowercase();

        if self.filters.iter().any(|term| title_lower.contains(term.as_str())) {
            return None;
        }

        self.groups
            .iter()
            .find(|group| group.accepts(&title_lower))
            .map(|group| &group.source)
    }
}

/// Whether `title` matches the rule set. An empty group list matches everything.
pub fn matches(title: &str, groups: &[RuleGroup], filters: &[String]) -> bool {
    if groups.is_empty() {
        return true;
    }
    KeywordMatcher::new(groups, filters).matches(title)
}

fn lowercase_terms(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .filter(|term| !term.trim().is_empty())
        .map(|term| term.to_lowercase())
        .collect()
}
