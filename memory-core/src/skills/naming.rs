//! Skill name generation.

const BREAK_PATTERNS: &[&str] = &[". ", ", ", " - ", ": "];

/// Generates a skill name from an execution trace, trying in order:
/// 1. The first 50 chars of `task_summary`, truncated at the nearest
///    break point (`. `, `, `, ` - `, `: `).
/// 2. `tag1_tag2_tag3_skill` from the first three `tags`.
/// 3. The first five words of `user_input`, joined by `_`, `_skill`-suffixed.
/// 4. `skill_<unix_seconds>`.
#[must_use]
pub fn generate_skill_name(task_summary: &str, user_input: &str, tags: &[String]) -> String {
    if let Some(name) = from_task_summary(task_summary) {
        return name;
    }
    if let Some(name) = from_tags(tags) {
        return name;
    }
    if let Some(name) = from_user_input(user_input) {
        return name;
    }
    format!("skill_{}", chrono::Utc::now().timestamp())
}

fn from_task_summary(task_summary: &str) -> Option<String> {
    let truncated: String = task_summary.chars().take(50).collect();
    if truncated.trim().is_empty() {
        return None;
    }

    let mut best_break: Option<usize> = None;
    for pattern in BREAK_PATTERNS {
        if let Some(pos) = truncated.rfind(pattern) {
            best_break = Some(best_break.map_or(pos, |b: usize| b.max(pos)));
        }
    }

    let name = match best_break {
        Some(pos) => truncated[..pos].to_string(),
        None => truncated,
    };
    let name = name.trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn from_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    let chosen: Vec<&str> = tags.iter().take(3).map(String::as_str).collect();
    Some(format!("{}_skill", chosen.join("_")))
}

fn from_user_input(user_input: &str) -> Option<String> {
    let words: Vec<&str> = user_input.split_whitespace().take(5).collect();
    if words.is_empty() {
        return None;
    }
    Some(format!("{}_skill", words.join("_")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_task_summary_at_nearest_break() {
        let summary = "Validate all user input before processing, then persist to the database";
        let name = generate_skill_name(summary, "ignored", &[]);
        assert_eq!(name, "Validate all user input before processing");
    }

    #[test]
    fn falls_back_to_tags_when_no_summary() {
        let tags = vec!["auth".to_string(), "security".to_string(), "input".to_string()];
        let name = generate_skill_name("", "ignored", &tags);
        assert_eq!(name, "auth_security_input_skill");
    }

    #[test]
    fn falls_back_to_user_input_words() {
        let name = generate_skill_name("", "fix the login bug quickly today please", &[]);
        assert_eq!(name, "fix_the_login_bug_quickly_skill");
    }

    #[test]
    fn falls_back_to_timestamp_when_everything_empty() {
        let name = generate_skill_name("", "", &[]);
        assert!(name.starts_with("skill_"));
        assert!(name["skill_".len()..].parse::<i64>().is_ok());
    }

    #[test]
    fn summary_without_break_point_uses_full_truncation() {
        let summary = "abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyz";
        let name = generate_skill_name(summary, "ignored", &[]);
        assert_eq!(name.chars().count(), 50);
    }
}
