use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static JW_SETUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:var\s+)?jwSetup\s*=\s*\{([^}]+)\}").unwrap());
static SETUP_TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?:title|heading)\s*:\s*["']([^"']+)["']"#).unwrap());
static SETUP_DESCRIPTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"description\s*:\s*["']([^"']+)["']"#).unwrap());

static TITLE_REGEXES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r#""title"\s*:\s*"([^"]+)""#).unwrap(),
        Regex::new(r"'title'\s*:\s*'([^']+)'").unwrap(),
        Regex::new(r#"\btitle\s*:\s*["']([^"']+)["']"#).unwrap(),
    ]
});
static DESCRIPTION_REGEXES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r#""description"\s*:\s*"([^"]+)""#).unwrap(),
        Regex::new(r"'description'\s*:\s*'([^']+)'").unwrap(),
        Regex::new(r#"\bdescription\s*:\s*["']([^"']+)["']"#).unwrap(),
    ]
});

/// Title and description a player page announces for its video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl VideoInfo {
    /// Reads the `jwSetup` object first. Pages without one, or whose setup has no title, fall
    /// back to the first `title`/`description` key anywhere in the text.
    pub fn parse(text: &str) -> Self {
        let mut info = Self::default();

        if let Some(setup) = JW_SETUP_REGEX.captures(text).and_then(|c| c.get(1)) {
            info.title = first_capture(&SETUP_TITLE_REGEX, setup.as_str());
            info.description = first_capture(&SETUP_DESCRIPTION_REGEX, setup.as_str());
        }

        if info.title.is_none() {
            info.title = TITLE_REGEXES.iter().find_map(|re| first_capture(re, text));
            if info.description.is_none() {
                info.description = DESCRIPTION_REGEXES
                    .iter()
                    .find_map(|re| first_capture(re, text));
            }
        }

        info
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// `"title - description"` when both are known and differ, the title alone otherwise, and
    /// `fallback` when the page had no title.
    pub fn display_title(&self, fallback: &str) -> String {
        match (&self.title, &self.description) {
            (Some(title), Some(description)) if title != description => {
                format!("{title} - {description}")
            }
            (Some(title), _) => title.clone(),
            (None, _) => fallback.to_string(),
        }
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jw_setup_fields() {
        let text = r#"<script>var jwSetup = { heading: "Kuruluş Osman", description: '3. Sezon 12. Bölüm', file: "/x" };</script>"#;
        let info = VideoInfo::parse(text);
        assert_eq!(info.title.as_deref(), Some("Kuruluş Osman"));
        assert_eq!(info.description.as_deref(), Some("3. Sezon 12. Bölüm"));
        assert_eq!(
            info.display_title("Bölüm 1"),
            "Kuruluş Osman - 3. Sezon 12. Bölüm"
        );
    }

    #[test]
    fn test_fallback_patterns() {
        let info = VideoInfo::parse(r#"{"title": "Yalı Çapkını", "description": "Yalı Çapkını"}"#);
        assert_eq!(info.title.as_deref(), Some("Yalı Çapkını"));
        assert_eq!(info.display_title("x"), "Yalı Çapkını");

        let single = VideoInfo::parse("player.setup({title: 'Ezel'})");
        assert_eq!(single.title.as_deref(), Some("Ezel"));
        assert_eq!(single.description, None);
    }

    #[test]
    fn test_setup_without_title_uses_page_title() {
        let text = r#"jwSetup = { description: "Final" }; var meta = {"title": "Avrupa Yakası"};"#;
        let info = VideoInfo::parse(text);
        assert_eq!(info.title.as_deref(), Some("Avrupa Yakası"));
        assert_eq!(info.description.as_deref(), Some("Final"));
    }

    #[test]
    fn test_missing_title_uses_fallback() {
        let info = VideoInfo::parse("<html><title>ignored</title></html>");
        assert!(info.is_empty());
        assert_eq!(info.display_title("Bölüm 4"), "Bölüm 4");
    }
}
